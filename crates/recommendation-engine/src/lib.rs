//! Recommendation Engine
//!
//! Reduces evaluated strategies and a weighted decision-factor score to one
//! recommended action, a timeframe and a list of considerations.

pub mod considerations;
pub mod factors;
pub mod policy;
pub mod synthesizer;

pub use considerations::{Consideration, ConsiderationKind};
pub use factors::{DecisionFactors, Factor, FactorContribution, FactorWeights};
pub use policy::{RecommendationPolicy, RecommendedAction, Timeframe};
pub use synthesizer::{Recommendation, RecommendationSynthesizer};
