//! Holding Periods
//!
//! Long-term and ISO qualifying-disposition classification.

use chrono::NaiveDate;
use equity_core::dates::days_between;
use equity_core::{EquityError, EquityResult};
use serde::{Deserialize, Serialize};

use crate::rules::TaxRules;

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingPeriod {
    ShortTerm,
    LongTerm,
}

/// ISO disposition type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Held 1 year past exercise and 2 years past grant
    Qualifying,
    Disqualifying,
    /// Some lots qualified and some did not
    Mixed,
    /// Not an ISO sale
    #[default]
    NotApplicable,
}

/// How the holding period of a sale is known.
///
/// Callers with only a long-term flag take the simplified path; callers with
/// exercise and sale dates get the exact one-year / two-year ISO rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HoldingTerms {
    Flag {
        is_long_term: bool,
    },
    Dates {
        exercise_date: NaiveDate,
        sale_date: NaiveDate,
    },
}

impl HoldingTerms {
    pub fn flag(is_long_term: bool) -> Self {
        HoldingTerms::Flag { is_long_term }
    }

    pub fn dates(exercise_date: NaiveDate, sale_date: NaiveDate) -> Self {
        HoldingTerms::Dates {
            exercise_date,
            sale_date,
        }
    }

    pub fn validate(&self) -> EquityResult<()> {
        if let HoldingTerms::Dates {
            exercise_date,
            sale_date,
        } = self
        {
            if sale_date < exercise_date {
                return Err(EquityError::Validation(format!(
                    "sale date {} precedes exercise date {}",
                    sale_date, exercise_date
                )));
            }
        }
        Ok(())
    }

    /// Days held between exercise and sale, when dates are known
    pub fn days_held(&self) -> Option<i64> {
        match self {
            HoldingTerms::Flag { .. } => None,
            HoldingTerms::Dates {
                exercise_date,
                sale_date,
            } => Some(days_between(*exercise_date, *sale_date)),
        }
    }

    /// Holding period measured from exercise
    pub fn holding_period(&self, rules: &TaxRules) -> HoldingPeriod {
        let long_term = match self {
            HoldingTerms::Flag { is_long_term } => *is_long_term,
            HoldingTerms::Dates { .. } => self
                .days_held()
                .map(|days| days >= rules.long_term_threshold_days)
                .unwrap_or(false),
        };
        if long_term {
            HoldingPeriod::LongTerm
        } else {
            HoldingPeriod::ShortTerm
        }
    }

    /// Whether an ISO sale is a qualifying disposition
    pub fn iso_qualifies(&self, grant_date: NaiveDate, rules: &TaxRules) -> bool {
        match self {
            HoldingTerms::Flag { is_long_term } => *is_long_term,
            HoldingTerms::Dates { sale_date, .. } => {
                self.holding_period(rules) == HoldingPeriod::LongTerm
                    && days_between(grant_date, *sale_date) >= rules.iso_grant_threshold_days
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equity_core::dates::add_days;

    fn grant_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn test_holding_period_from_dates() {
        let rules = TaxRules::us();
        let exercise = grant_date();
        assert_eq!(
            HoldingTerms::dates(exercise, add_days(exercise, 364)).holding_period(&rules),
            HoldingPeriod::ShortTerm
        );
        assert_eq!(
            HoldingTerms::dates(exercise, add_days(exercise, 365)).holding_period(&rules),
            HoldingPeriod::LongTerm
        );
    }

    #[test]
    fn test_iso_qualification_flips_on_exercise_threshold() {
        let rules = TaxRules::us();
        let exercise = add_days(grant_date(), 400);
        let sale = add_days(exercise, 365);
        assert!(HoldingTerms::dates(exercise, sale).iso_qualifies(grant_date(), &rules));
        assert!(!HoldingTerms::dates(exercise, add_days(sale, -1)).iso_qualifies(grant_date(), &rules));
    }

    #[test]
    fn test_iso_qualification_flips_on_grant_threshold() {
        let rules = TaxRules::us();
        let exercise = add_days(grant_date(), 100);
        let sale = add_days(grant_date(), 730);
        assert!(HoldingTerms::dates(exercise, sale).iso_qualifies(grant_date(), &rules));
        assert!(!HoldingTerms::dates(exercise, add_days(sale, -1)).iso_qualifies(grant_date(), &rules));
    }

    #[test]
    fn test_flag_path() {
        let rules = TaxRules::us();
        assert!(HoldingTerms::flag(true).iso_qualifies(grant_date(), &rules));
        assert_eq!(HoldingTerms::flag(false).holding_period(&rules), HoldingPeriod::ShortTerm);
    }

    #[test]
    fn test_sale_before_exercise_rejected() {
        let terms = HoldingTerms::dates(add_days(grant_date(), 10), grant_date());
        assert!(terms.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_terms_json_shape() {
        let terms: HoldingTerms = serde_json::from_str(
            r#"{"type": "dates", "exercise_date": "2021-01-01", "sale_date": "2022-06-01"}"#,
        )
        .unwrap();
        assert_eq!(terms.days_held(), Some(516));
        let flag: HoldingTerms =
            serde_json::from_str(r#"{"type": "flag", "is_long_term": false}"#).unwrap();
        assert_eq!(flag, HoldingTerms::flag(false));
    }
}
