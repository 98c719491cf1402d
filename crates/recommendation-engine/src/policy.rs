//! Recommendation Policy
//!
//! Score thresholds and the timeframe decision table.

use equity_core::{EquityError, EquityResult};
use serde::{Deserialize, Serialize};

/// Score cut-offs and expiration urgency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    pub full_exercise_threshold: f64,
    pub partial_exercise_threshold: f64,
    pub minimum_exercise_threshold: f64,
    /// Months to expiration at or under which action is immediate
    pub expiration_urgency_months: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            full_exercise_threshold: 0.75,
            partial_exercise_threshold: 0.60,
            minimum_exercise_threshold: 0.45,
            expiration_urgency_months: 6.0,
        }
    }
}

impl RecommendationPolicy {
    pub fn validate(&self) -> EquityResult<()> {
        let thresholds = [
            self.full_exercise_threshold,
            self.partial_exercise_threshold,
            self.minimum_exercise_threshold,
        ];
        if thresholds.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return Err(EquityError::Configuration(format!(
                "recommendation thresholds must lie in [0, 1], got {:?}",
                thresholds
            )));
        }
        if !(self.full_exercise_threshold > self.partial_exercise_threshold
            && self.partial_exercise_threshold > self.minimum_exercise_threshold)
        {
            return Err(EquityError::Configuration(format!(
                "recommendation thresholds must be strictly descending, got {:?}",
                thresholds
            )));
        }
        if !self.expiration_urgency_months.is_finite() || self.expiration_urgency_months < 0.0 {
            return Err(EquityError::Configuration(format!(
                "expiration urgency must be non-negative, got {}",
                self.expiration_urgency_months
            )));
        }
        Ok(())
    }

    /// Action for a total score
    pub fn action_for(&self, score: f64) -> RecommendedAction {
        if score >= self.full_exercise_threshold {
            RecommendedAction::FullExercise
        } else if score >= self.partial_exercise_threshold {
            RecommendedAction::PartialExercise
        } else if score >= self.minimum_exercise_threshold {
            RecommendedAction::MinimumExercise
        } else {
            RecommendedAction::Wait
        }
    }

    /// Timeframe from expiration proximity, then from the action.
    /// `months_to_expiration` is negative once the grant has expired.
    pub fn timeframe_for(
        &self,
        action: RecommendedAction,
        months_to_expiration: Option<f64>,
    ) -> Timeframe {
        match months_to_expiration {
            Some(months) if months < 0.0 => Timeframe::Expired,
            Some(months) if months <= self.expiration_urgency_months => Timeframe::Immediate,
            _ => match action {
                RecommendedAction::FullExercise => Timeframe::WithinOneMonth,
                RecommendedAction::PartialExercise => Timeframe::WithinThreeMonths,
                RecommendedAction::MinimumExercise => Timeframe::WithinSixMonths,
                RecommendedAction::Wait => Timeframe::Reassess,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    FullExercise,
    PartialExercise,
    MinimumExercise,
    Wait,
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendedAction::FullExercise => write!(f, "Full exercise"),
            RecommendedAction::PartialExercise => write!(f, "Partial exercise"),
            RecommendedAction::MinimumExercise => write!(f, "Minimum exercise"),
            RecommendedAction::Wait => write!(f, "Wait"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Expired,
    Immediate,
    WithinOneMonth,
    WithinThreeMonths,
    WithinSixMonths,
    Reassess,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Expired => "Expired: the exercise window has closed",
            Timeframe::Immediate => "Immediately, before the options expire",
            Timeframe::WithinOneMonth => "Within the next month",
            Timeframe::WithinThreeMonths => "Within the next 3 months",
            Timeframe::WithinSixMonths => "Within the next 6 months",
            Timeframe::Reassess => "Reassess in 6-12 months",
        }
    }
}
