//! Scenario Evaluator
//!
//! Runs candidate exercise strategies against an exit scenario, ranks them
//! by net proceeds and sweeps a sensitivity grid around the winner.

pub mod evaluator;
pub mod sensitivity;
pub mod strategy;

pub use evaluator::{rank, Evaluation, RankedStrategies, ScenarioEvaluator};
pub use sensitivity::{SensitivityCell, SensitivityConfig};
pub use strategy::{standard_candidates, RiskLevel, Strategy, StrategyCandidate, StrategyKind};
