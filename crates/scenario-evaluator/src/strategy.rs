//! Strategy Candidates
//!
//! What the caller asks to be evaluated, and what comes back.

use chrono::NaiveDate;
use equity_core::{ExitScenario, ExitType};
use serde::{Deserialize, Serialize};
use tax_engine::TaxResult;

/// How and when the shares are exercised
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Exercise everything exercisable today
    ExerciseNow,
    /// Exercise on the exit date
    ExerciseAtExit,
    /// Equal exercises spread between today and the exit
    Staggered { tranches: u32 },
    /// Exercise after a delay, no later than the exit
    WaitAndExercise { months: f64 },
    /// Acquisition paid entirely in cash
    CashDeal,
    /// Acquisition paid entirely in acquirer stock
    StockDeal,
    /// Acquisition paid in the scenario's cash/stock mix
    MixedDeal,
}

impl StrategyKind {
    /// Deal variants only make sense for acquisitions
    pub fn is_deal(&self) -> bool {
        matches!(
            self,
            StrategyKind::CashDeal | StrategyKind::StockDeal | StrategyKind::MixedDeal
        )
    }

    pub fn risk(&self) -> RiskLevel {
        match self {
            StrategyKind::ExerciseNow | StrategyKind::StockDeal => RiskLevel::High,
            StrategyKind::Staggered { .. }
            | StrategyKind::WaitAndExercise { .. }
            | StrategyKind::MixedDeal => RiskLevel::Medium,
            StrategyKind::ExerciseAtExit | StrategyKind::CashDeal => RiskLevel::Low,
        }
    }
}

/// Capital-at-risk tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

fn full_fraction() -> f64 {
    1.0
}

/// A named strategy to evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyCandidate {
    pub id: String,
    pub label: String,
    pub kind: StrategyKind,
    /// Fraction of exercisable shares the strategy uses (0-1)
    #[serde(default = "full_fraction")]
    pub share_fraction: f64,
}

impl StrategyCandidate {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: StrategyKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            share_fraction: 1.0,
        }
    }

    pub fn with_share_fraction(mut self, fraction: f64) -> Self {
        self.share_fraction = fraction;
        self
    }
}

/// Default candidate set for an exit type
pub fn standard_candidates(exit: &ExitScenario) -> Vec<StrategyCandidate> {
    let mut candidates = vec![
        StrategyCandidate::new("exercise_now", "Exercise now", StrategyKind::ExerciseNow),
        StrategyCandidate::new(
            "exercise_at_exit",
            "Exercise at exit",
            StrategyKind::ExerciseAtExit,
        ),
        StrategyCandidate::new(
            "staggered",
            "Staggered exercise",
            StrategyKind::Staggered { tranches: 4 },
        ),
        StrategyCandidate::new(
            "wait_and_exercise",
            "Wait 12 months, then exercise",
            StrategyKind::WaitAndExercise { months: 12.0 },
        ),
    ];

    if let ExitType::Acquisition { .. } = exit.exit_type {
        candidates.extend([
            StrategyCandidate::new("cash_deal", "All-cash deal", StrategyKind::CashDeal),
            StrategyCandidate::new("stock_deal", "All-stock deal", StrategyKind::StockDeal),
            StrategyCandidate::new("mixed_deal", "Cash and stock deal", StrategyKind::MixedDeal),
        ]);
    }

    candidates
}

/// An evaluated strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub label: String,
    pub kind: StrategyKind,
    pub shares_exercised: f64,
    /// First exercise date
    pub exercise_date: NaiveDate,
    /// Last sale date
    pub sale_date: NaiveDate,
    pub exercise_cost: f64,
    pub gross_proceeds: f64,
    pub tax: TaxResult,
    /// gross - cost - total tax
    pub net_proceeds: f64,
    /// net / cost, 0 when nothing was paid to exercise
    pub roi: f64,
    pub risk: RiskLevel,
}
