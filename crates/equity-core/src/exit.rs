//! Exit Scenarios
//!
//! How and when the caller expects the shares to become liquid.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::add_months_approx;
use crate::error::{ensure_non_negative, EquityError, EquityResult};
use crate::types::Grant;

/// Deferred portion of acquisition consideration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earnout {
    /// Percentage of total consideration paid as earnout (0-100)
    pub percentage: f64,
    /// Days after closing the earnout is received
    pub delay_days: i64,
}

/// Exit type with its type-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitType {
    Ipo {
        /// No sale permitted before IPO date + lockup
        lockup_days: i64,
    },
    Acquisition {
        /// Cash share of consideration (0-100)
        cash_percentage: f64,
        /// Acquirer-stock share of consideration (0-100)
        stock_percentage: f64,
        #[serde(default)]
        earnout: Option<Earnout>,
        /// Days the acquirer stock is held before it is sold
        #[serde(default)]
        stock_hold_days: i64,
    },
    Secondary {
        /// Discount to the quoted exit price (0-100)
        discount_percentage: f64,
    },
}

impl ExitType {
    pub fn name(&self) -> &'static str {
        match self {
            ExitType::Ipo { .. } => "IPO",
            ExitType::Acquisition { .. } => "Acquisition",
            ExitType::Secondary { .. } => "Secondary",
        }
    }
}

/// Expected timing bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTiming {
    WithinOneYear,
    OneToTwoYears,
    TwoToFiveYears,
    FivePlusYears,
}

impl ExitTiming {
    /// Representative horizon for the bucket, in months
    pub fn horizon_months(&self) -> f64 {
        match self {
            ExitTiming::WithinOneYear => 6.0,
            ExitTiming::OneToTwoYears => 18.0,
            ExitTiming::TwoToFiveYears => 42.0,
            ExitTiming::FivePlusYears => 72.0,
        }
    }
}

/// Exit valuation, relative to current FMV or absolute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitValuation {
    Multiple(f64),
    Price(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitScenario {
    pub exit_type: ExitType,
    pub timing: ExitTiming,
    pub valuation: ExitValuation,
    /// Explicit exit date overriding the timing bucket
    #[serde(default)]
    pub exit_date: Option<NaiveDate>,
}

impl ExitScenario {
    pub fn new(exit_type: ExitType, timing: ExitTiming, valuation: ExitValuation) -> Self {
        Self {
            exit_type,
            timing,
            valuation,
            exit_date: None,
        }
    }

    pub fn on(mut self, exit_date: NaiveDate) -> Self {
        self.exit_date = Some(exit_date);
        self
    }

    /// Exit date: explicit, or the timing bucket's horizon from `as_of`
    pub fn exit_date(&self, as_of: NaiveDate) -> EquityResult<NaiveDate> {
        match self.exit_date {
            Some(date) => Ok(date),
            None => add_months_approx(as_of, self.timing.horizon_months()),
        }
    }

    /// Quoted exit price per share before any type-specific adjustment
    pub fn exit_price(&self, grant: &Grant) -> f64 {
        match self.valuation {
            ExitValuation::Multiple(multiple) => grant.current_fmv * multiple,
            ExitValuation::Price(price) => price,
        }
    }

    /// Price per share the holder actually realises
    pub fn realized_price(&self, grant: &Grant) -> f64 {
        let quoted = self.exit_price(grant);
        match &self.exit_type {
            ExitType::Secondary { discount_percentage } => {
                quoted * (1.0 - discount_percentage / 100.0)
            }
            _ => quoted,
        }
    }

    pub fn validate(&self) -> EquityResult<()> {
        match self.valuation {
            ExitValuation::Multiple(m) => ensure_non_negative("exit multiple", m)?,
            ExitValuation::Price(p) => ensure_non_negative("exit price", p)?,
        }

        match &self.exit_type {
            ExitType::Ipo { lockup_days } => {
                if *lockup_days < 0 {
                    return Err(EquityError::Validation(format!(
                        "lockup days must be non-negative, got {}",
                        lockup_days
                    )));
                }
            }
            ExitType::Acquisition {
                cash_percentage,
                stock_percentage,
                earnout,
                stock_hold_days,
            } => {
                ensure_non_negative("cash percentage", *cash_percentage)?;
                ensure_non_negative("stock percentage", *stock_percentage)?;
                if *stock_hold_days < 0 {
                    return Err(EquityError::Validation(format!(
                        "stock hold days must be non-negative, got {}",
                        stock_hold_days
                    )));
                }
                if (cash_percentage + stock_percentage - 100.0).abs() > 1e-6 {
                    return Err(EquityError::Configuration(format!(
                        "cash/stock mix must sum to 100%, got {}%",
                        cash_percentage + stock_percentage
                    )));
                }
                if let Some(earnout) = earnout {
                    if !(0.0..=100.0).contains(&earnout.percentage) {
                        return Err(EquityError::Validation(format!(
                            "earnout percentage must be between 0 and 100, got {}",
                            earnout.percentage
                        )));
                    }
                    if earnout.delay_days < 0 {
                        return Err(EquityError::Validation(
                            "earnout delay must be non-negative".to_string(),
                        ));
                    }
                }
            }
            ExitType::Secondary {
                discount_percentage,
            } => {
                if !discount_percentage.is_finite()
                    || !(0.0..100.0).contains(discount_percentage)
                {
                    return Err(EquityError::Validation(format!(
                        "secondary discount must be in [0, 100), got {}",
                        discount_percentage
                    )));
                }
            }
        }

        Ok(())
    }
}
