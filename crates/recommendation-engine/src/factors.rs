//! Decision Factors
//!
//! Caller-scored inputs in [0, 1] and the weights that combine them.

use equity_core::{ensure_unit_interval, EquityError, EquityResult};
use serde::{Deserialize, Serialize};

/// Caller-supplied scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionFactors {
    /// Ability to fund the exercise and absorb a loss
    pub financial_capacity: f64,
    /// Confidence in the company's prospects
    pub company_outlook: f64,
    /// How favourable the tax position is
    pub tax_efficiency: f64,
    /// Market and personal timing
    pub timing: f64,
}

impl DecisionFactors {
    pub fn validate(&self) -> EquityResult<()> {
        ensure_unit_interval("financial capacity", self.financial_capacity)?;
        ensure_unit_interval("company outlook", self.company_outlook)?;
        ensure_unit_interval("tax efficiency", self.tax_efficiency)?;
        ensure_unit_interval("timing", self.timing)?;
        Ok(())
    }

    pub fn value(&self, factor: Factor) -> f64 {
        match factor {
            Factor::FinancialCapacity => self.financial_capacity,
            Factor::CompanyOutlook => self.company_outlook,
            Factor::TaxEfficiency => self.tax_efficiency,
            Factor::Timing => self.timing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    FinancialCapacity,
    CompanyOutlook,
    TaxEfficiency,
    Timing,
}

impl Factor {
    pub const ALL: [Factor; 4] = [
        Factor::FinancialCapacity,
        Factor::CompanyOutlook,
        Factor::TaxEfficiency,
        Factor::Timing,
    ];
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Factor::FinancialCapacity => write!(f, "Financial capacity"),
            Factor::CompanyOutlook => write!(f, "Company outlook"),
            Factor::TaxEfficiency => write!(f, "Tax efficiency"),
            Factor::Timing => write!(f, "Timing"),
        }
    }
}

/// Factor weights in whole percentage points. Integer points keep the
/// sum-to-100 check exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub financial_capacity: u32,
    pub company_outlook: u32,
    pub tax_efficiency: u32,
    pub timing: u32,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            financial_capacity: 35,
            company_outlook: 30,
            tax_efficiency: 25,
            timing: 10,
        }
    }
}

impl FactorWeights {
    pub fn validate(&self) -> EquityResult<()> {
        let total = self.financial_capacity + self.company_outlook + self.tax_efficiency + self.timing;
        if total != 100 {
            return Err(EquityError::Configuration(format!(
                "factor weights must sum to 100, got {}",
                total
            )));
        }
        Ok(())
    }

    pub fn points(&self, factor: Factor) -> u32 {
        match factor {
            Factor::FinancialCapacity => self.financial_capacity,
            Factor::CompanyOutlook => self.company_outlook,
            Factor::TaxEfficiency => self.tax_efficiency,
            Factor::Timing => self.timing,
        }
    }

    /// Weight as a fraction of 1
    pub fn weight(&self, factor: Factor) -> f64 {
        self.points(factor) as f64 / 100.0
    }

    /// Per-factor contributions in `Factor::ALL` order
    pub fn breakdown(&self, factors: &DecisionFactors) -> Vec<FactorContribution> {
        Factor::ALL
            .iter()
            .map(|&factor| {
                let value = factors.value(factor);
                let weight = self.weight(factor);
                FactorContribution {
                    factor,
                    value,
                    weight,
                    contribution: value * weight,
                }
            })
            .collect()
    }
}

/// One factor's share of the total score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: Factor,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = FactorWeights::default();
        assert!(weights.validate().is_ok());
        let total: f64 = Factor::ALL.iter().map(|&f| weights.weight(f)).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_off_by_one_rejected() {
        let weights = FactorWeights {
            timing: 11,
            ..FactorWeights::default()
        };
        assert!(weights.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_factor_out_of_range_rejected() {
        let factors = DecisionFactors {
            financial_capacity: 1.2,
            company_outlook: 0.5,
            tax_efficiency: 0.5,
            timing: 0.5,
        };
        assert!(factors.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_breakdown() {
        let factors = DecisionFactors {
            financial_capacity: 1.0,
            company_outlook: 0.5,
            tax_efficiency: 0.0,
            timing: 1.0,
        };
        let breakdown = FactorWeights::default().breakdown(&factors);
        assert_eq!(breakdown.len(), 4);
        assert_eq!(breakdown[0].factor, Factor::FinancialCapacity);
        assert_relative_eq!(breakdown[0].contribution, 0.35);
        assert_relative_eq!(breakdown[1].contribution, 0.15);
        assert_eq!(breakdown[2].contribution, 0.0);
        let total: f64 = breakdown.iter().map(|c| c.contribution).sum();
        assert_relative_eq!(total, 0.60, epsilon = 1e-12);
    }
}
