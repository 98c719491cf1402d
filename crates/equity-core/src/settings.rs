//! Tax Settings
//!
//! Caller-supplied tax profile. Every recognised option is a named field with
//! a default; enabling a tax type without the data it needs is rejected.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_unit_interval, EquityError, EquityResult};

/// Federal filing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    Single,
    MarriedJointly,
    MarriedSeparately,
    HeadOfHousehold,
}

impl FilingStatus {
    /// Modified AGI above which NIIT applies
    pub fn niit_threshold(&self) -> f64 {
        match self {
            FilingStatus::Single => 200_000.0,
            FilingStatus::MarriedJointly => 250_000.0,
            FilingStatus::MarriedSeparately => 125_000.0,
            FilingStatus::HeadOfHousehold => 200_000.0,
        }
    }
}

impl std::fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilingStatus::Single => write!(f, "Single"),
            FilingStatus::MarriedJointly => write!(f, "Married filing jointly"),
            FilingStatus::MarriedSeparately => write!(f, "Married filing separately"),
            FilingStatus::HeadOfHousehold => write!(f, "Head of household"),
        }
    }
}

/// Share of income attributed to one state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAllocation {
    /// State code
    pub state: String,
    /// Percentage of income allocated here (0-100)
    pub percentage: f64,
    /// Marginal rate in that state
    pub rate: f64,
}

/// Tax profile used by the tax engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxSettings {
    pub filing_status: FilingStatus,
    /// Federal marginal rate on ordinary income
    pub federal_rate: f64,
    /// State marginal rate (single-state path)
    pub state_rate: f64,
    pub state_of_residence: String,
    /// Federal long-term capital gains rate
    pub long_term_capital_gains_rate: f64,
    /// AMT rate, required when `include_amt` is set
    pub amt_rate: Option<f64>,
    /// Other ordinary income for the year (wages etc.)
    pub other_income: f64,
    /// AMT credit carried forward from prior years
    pub prior_amt_credits: f64,
    pub include_amt: bool,
    pub include_niit: bool,
    pub include_multi_state: bool,
    /// Allocation map for the multi-state path, percentages summing to 100
    pub state_allocations: Vec<StateAllocation>,
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            filing_status: FilingStatus::Single,
            federal_rate: 0.37,
            state_rate: 0.0,
            state_of_residence: String::new(),
            long_term_capital_gains_rate: 0.20,
            amt_rate: None,
            other_income: 0.0,
            prior_amt_credits: 0.0,
            include_amt: false,
            include_niit: false,
            include_multi_state: false,
            state_allocations: Vec::new(),
        }
    }
}

impl TaxSettings {
    /// Settings with the two marginal rates set and everything else default
    pub fn with_rates(federal_rate: f64, state_rate: f64) -> Self {
        Self {
            federal_rate,
            state_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EquityResult<()> {
        ensure_unit_interval("federal rate", self.federal_rate)?;
        ensure_unit_interval("state rate", self.state_rate)?;
        ensure_unit_interval("long-term capital gains rate", self.long_term_capital_gains_rate)?;
        ensure_non_negative("other income", self.other_income)?;
        ensure_non_negative("prior AMT credits", self.prior_amt_credits)?;

        if self.include_amt {
            match self.amt_rate {
                Some(rate) => ensure_unit_interval("AMT rate", rate)?,
                None => {
                    return Err(EquityError::Configuration(
                        "include_amt is set but no amt_rate was supplied".to_string(),
                    ))
                }
            }
        }

        if self.include_multi_state {
            if self.state_allocations.is_empty() {
                return Err(EquityError::Configuration(
                    "multi-state allocation enabled without an allocation map".to_string(),
                ));
            }
            let mut total = 0.0;
            for allocation in &self.state_allocations {
                ensure_non_negative("state allocation percentage", allocation.percentage)?;
                ensure_unit_interval("state allocation rate", allocation.rate)?;
                total += allocation.percentage;
            }
            if (total - 100.0).abs() > 1e-6 {
                return Err(EquityError::Configuration(format!(
                    "state allocations must sum to 100%, got {}%",
                    total
                )));
            }
        }

        Ok(())
    }

    /// Copy of these settings with carryforward credits scaled by `fraction`,
    /// used when one exercise is split into independently taxed tranches.
    pub fn apportioned(&self, fraction: f64) -> Self {
        Self {
            prior_amt_credits: self.prior_amt_credits * fraction.clamp(0.0, 1.0),
            ..self.clone()
        }
    }
}
