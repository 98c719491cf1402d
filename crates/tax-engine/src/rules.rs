//! Tax Rules
//!
//! Statutory constants used by the engine. Rates that change with the
//! taxpayer (marginal federal/state rates, AMT rate) live in `TaxSettings`.

use serde::{Deserialize, Serialize};

/// Statutory rules applied to every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRules {
    /// Days after exercise to qualify for long-term treatment
    pub long_term_threshold_days: i64,
    /// Days after grant an ISO sale must be to qualify
    pub iso_grant_threshold_days: i64,
    /// Net investment income tax rate
    pub niit_rate: f64,
    /// Floor on the effective-rate denominator
    pub effective_rate_epsilon: f64,
}

impl TaxRules {
    /// US federal rules
    pub fn us() -> Self {
        Self {
            long_term_threshold_days: 365,
            iso_grant_threshold_days: 730,
            niit_rate: 0.038,
            effective_rate_epsilon: 1e-9,
        }
    }
}

impl Default for TaxRules {
    fn default() -> Self {
        Self::us()
    }
}
