//! Plan file and pipeline.
//!
//! A plan bundles everything one run needs: the grant, the caller's tax
//! profile, the expected exit and the decision factors.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use equity_core::{EquityResult, ExitScenario, Grant, GrantType, TaxSettings};
use recommendation_engine::{DecisionFactors, Recommendation, RecommendationSynthesizer};
use scenario_evaluator::{standard_candidates, Evaluation, ScenarioEvaluator, StrategyCandidate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use vesting_calculator::{
    AccelerationEvent, AccelerationOutcome, IsoLimitSplit, VestingCalculator, VestingSnapshot,
};

use crate::config::PlannerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct EquityPlan {
    pub as_of: NaiveDate,
    pub grant: Grant,
    #[serde(default)]
    pub tax_settings: TaxSettings,
    pub exit: ExitScenario,
    pub factors: DecisionFactors,
    /// Defaults to the standard set for the exit type
    #[serde(default)]
    pub candidates: Option<Vec<StrategyCandidate>>,
    /// Change-of-control event to apply on the as-of date
    #[serde(default)]
    pub acceleration: Option<AccelerationEvent>,
}

impl EquityPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid plan file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub vesting: VestingSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_split: Option<IsoLimitSplit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<AccelerationOutcome>,
    pub evaluation: Evaluation,
    pub recommendation: Recommendation,
}

/// Snapshot → ISO split → acceleration → evaluation → recommendation
pub struct Planner {
    vesting: VestingCalculator,
    evaluator: ScenarioEvaluator,
    synthesizer: RecommendationSynthesizer,
}

impl Planner {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            vesting: VestingCalculator::new(),
            evaluator: ScenarioEvaluator::new().with_sensitivity(config.sensitivity.clone()),
            synthesizer: RecommendationSynthesizer::new().with_policy(config.policy),
        }
    }

    pub fn run(&self, plan: &EquityPlan) -> EquityResult<PlanReport> {
        let grant = &plan.grant;

        let vesting = self.vesting.snapshot(grant, plan.as_of)?;

        let iso_split = match grant.grant_type {
            GrantType::Iso => Some(self.vesting.iso_limit_split(grant)?),
            _ => None,
        };

        let acceleration = plan
            .acceleration
            .as_ref()
            .map(|event| self.vesting.apply_acceleration(grant, plan.as_of, event))
            .transpose()?;

        let candidates = plan
            .candidates
            .clone()
            .unwrap_or_else(|| standard_candidates(&plan.exit));
        let evaluation =
            self.evaluator
                .evaluate(grant, &plan.exit, &candidates, &plan.tax_settings, plan.as_of)?;

        let recommendation =
            self.synthesizer
                .recommend(&plan.factors, &evaluation.strategies, grant, plan.as_of)?;

        info!(
            grant_id = %grant.id,
            vested_shares = vesting.vested_shares,
            optimal = %evaluation.optimal,
            action = %recommendation.action,
            "Plan complete"
        );

        Ok(PlanReport {
            vesting,
            iso_split,
            acceleration,
            evaluation,
            recommendation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../plans/sample.json");

    fn config() -> PlannerConfig {
        PlannerConfig::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn test_sample_plan_runs() {
        let plan = EquityPlan::parse(SAMPLE).unwrap();
        let report = Planner::from_config(&config()).run(&plan).unwrap();

        assert_eq!(report.vesting.grant_id, "iso-2022");
        assert!(report.vesting.cliff_passed);
        let split = report.iso_split.as_ref().unwrap();
        assert!((split.iso_shares + split.nso_shares - 10_000.0).abs() < 1e-6);
        assert!(report.acceleration.is_none());

        assert_eq!(report.evaluation.strategies.len(), 4);
        assert_eq!(report.evaluation.sensitivity.len(), 30);
        assert_eq!(
            report.recommendation.optimal_strategy.as_deref(),
            Some(report.evaluation.optimal.as_str())
        );

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("iso_split").is_some());
        assert!(json.get("acceleration").is_none());
    }

    #[test]
    fn test_explicit_candidates_and_acceleration() {
        let mut plan = EquityPlan::parse(SAMPLE).unwrap();
        plan.grant.accelerated_vesting = true;
        plan.acceleration = Some(AccelerationEvent::SingleTrigger);
        plan.candidates = Some(vec![StrategyCandidate::new(
            "now",
            "Exercise now",
            scenario_evaluator::StrategyKind::ExerciseNow,
        )]);

        let report = Planner::from_config(&config()).run(&plan).unwrap();
        assert_eq!(report.evaluation.strategies.len(), 1);
        assert_eq!(report.evaluation.optimal, "now");
        let outcome = report.acceleration.unwrap();
        assert!((outcome.vested_shares - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_plan_rejected() {
        assert!(EquityPlan::parse("{\"as_of\": \"2025-01-01\"}").is_err());
    }
}
