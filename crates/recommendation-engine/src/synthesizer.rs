//! Recommendation Synthesizer
//!
//! Weighted factor score → action via policy thresholds → timeframe via the
//! decision table, plus strategy picks and considerations.

use chrono::NaiveDate;
use equity_core::dates::months_between;
use equity_core::{EquityResult, Grant};
use scenario_evaluator::Strategy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::considerations::{self, Consideration, ConsiderationContext};
use crate::factors::{DecisionFactors, FactorContribution, FactorWeights};
use crate::policy::{RecommendationPolicy, RecommendedAction, Timeframe};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub grant_id: String,
    pub as_of: NaiveDate,
    pub action: RecommendedAction,
    /// Weighted factor score in [0, 1]
    pub total_score: f64,
    pub factor_breakdown: Vec<FactorContribution>,
    /// Strategy with the highest net proceeds
    pub optimal_strategy: Option<String>,
    /// Strategy with the lowest effective tax rate among those with a gain
    pub best_tax_strategy: Option<String>,
    pub timeframe: Timeframe,
    pub timeframe_label: String,
    pub considerations: Vec<Consideration>,
}

/// Highest net proceeds; the earlier strategy wins a tie
fn highest_net_proceeds(scenarios: &[Strategy]) -> Option<&Strategy> {
    scenarios.iter().fold(None, |best: Option<&Strategy>, s| match best {
        Some(b) if b.net_proceeds >= s.net_proceeds => Some(b),
        _ => Some(s),
    })
}

/// Lowest effective rate among strategies that realise a gain; the earlier
/// strategy wins a tie
fn lowest_effective_rate(scenarios: &[Strategy]) -> Option<&Strategy> {
    scenarios
        .iter()
        .filter(|s| s.tax.total_gain > 0.0)
        .fold(None, |best: Option<&Strategy>, s| match best {
            Some(b) if b.tax.effective_rate <= s.tax.effective_rate => Some(b),
            _ => Some(s),
        })
}

/// Produces a recommendation from decision factors and evaluated strategies
#[derive(Debug, Clone, Default)]
pub struct RecommendationSynthesizer {
    weights: FactorWeights,
    policy: RecommendationPolicy,
}

impl RecommendationSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: FactorWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_policy(mut self, policy: RecommendationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn weights(&self) -> &FactorWeights {
        &self.weights
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    pub fn recommend(
        &self,
        factors: &DecisionFactors,
        scenarios: &[Strategy],
        grant: &Grant,
        as_of: NaiveDate,
    ) -> EquityResult<Recommendation> {
        self.weights.validate()?;
        self.policy.validate()?;
        factors.validate()?;
        grant.validate()?;

        let factor_breakdown = self.weights.breakdown(factors);
        let total_score: f64 = factor_breakdown.iter().map(|c| c.contribution).sum();
        let action = self.policy.action_for(total_score);

        let months_to_expiration = grant
            .expiration_date
            .map(|expiration| months_between(as_of, expiration));
        let timeframe = self.policy.timeframe_for(action, months_to_expiration);

        let optimal = highest_net_proceeds(scenarios);
        let best_tax = lowest_effective_rate(scenarios);

        let considerations = considerations::collect(&ConsiderationContext {
            factors,
            grant,
            action,
            timeframe,
            optimal,
            best_tax,
        });

        info!(
            grant_id = %grant.id,
            total_score,
            action = %action,
            timeframe = ?timeframe,
            considerations = considerations.len(),
            "Synthesized recommendation"
        );

        Ok(Recommendation {
            grant_id: grant.id.clone(),
            as_of,
            action,
            total_score,
            factor_breakdown,
            optimal_strategy: optimal.map(|s| s.id.clone()),
            best_tax_strategy: best_tax.map(|s| s.id.clone()),
            timeframe,
            timeframe_label: timeframe.label().to_string(),
            considerations,
        })
    }
}
