//! Tax Engine
//!
//! Ordinary income, AMT, capital gains, state tax and NIIT for a single
//! exercise-and-sale transaction. Marginal rates are inputs; no bracket
//! tables are applied.

pub mod engine;
pub mod holding;
pub mod rules;
pub mod state;

pub use engine::{Exercise, SaleLot, TaxEngine, TaxResult, Transaction};
pub use holding::{Disposition, HoldingPeriod, HoldingTerms};
pub use rules::TaxRules;
