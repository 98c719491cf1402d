//! Tax Engine
//!
//! Computes the tax consequences of exercising a grant and selling the
//! resulting shares, in one or several lots.

use equity_core::{ensure_non_negative, EquityError, EquityResult, Grant, GrantType, TaxSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::holding::{Disposition, HoldingPeriod, HoldingTerms};
use crate::rules::TaxRules;
use crate::state;

/// Tolerance when comparing share counts
const SHARE_TOLERANCE: f64 = 1e-9;

/// A single exercise followed by an optional sale of every exercised share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub strike_price: f64,
    /// FMV per share on the exercise (or RSU settlement) date
    pub fmv_at_exercise: f64,
    /// Sale price per share, `None` to exercise and hold
    pub sale_price: Option<f64>,
    pub shares: f64,
    pub holding: HoldingTerms,
}

/// Exercise half of a multi-lot computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub strike_price: f64,
    pub fmv_at_exercise: f64,
    pub shares: f64,
}

/// Shares sold together at one price on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLot {
    pub shares: f64,
    pub price: f64,
    pub holding: HoldingTerms,
}

/// Tax liability of a transaction. Every field is non-negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxResult {
    /// Spread taxed as ordinary income
    pub ordinary_income: f64,
    pub ordinary_income_tax: f64,
    /// ISO spread counted as an AMT preference item
    pub amt_preference: f64,
    /// Prior-year AMT credit consumed
    pub amt_credit_used: f64,
    /// AMT owed net of credit
    pub amt_liability: f64,
    /// Net taxable capital gain
    pub capital_gain: f64,
    /// Net capital loss, if the sale lost money
    pub capital_loss: f64,
    pub capital_gains_tax: f64,
    /// Every sold lot got long-term treatment
    pub is_long_term: bool,
    pub disposition: Disposition,
    pub state_tax: f64,
    pub niit: f64,
    pub total_tax: f64,
    /// Economic gain over the strike price
    pub total_gain: f64,
    /// total_tax / total_gain, 0 when there is no gain
    pub effective_rate: f64,
}

impl TaxResult {
    /// Sum the results of independently taxed tranches.
    pub fn combine(results: &[TaxResult], rules: &TaxRules) -> TaxResult {
        let mut combined = TaxResult {
            is_long_term: !results.is_empty(),
            ..TaxResult::default()
        };

        let mut disposition: Option<Disposition> = None;
        for r in results {
            combined.ordinary_income += r.ordinary_income;
            combined.ordinary_income_tax += r.ordinary_income_tax;
            combined.amt_preference += r.amt_preference;
            combined.amt_credit_used += r.amt_credit_used;
            combined.amt_liability += r.amt_liability;
            combined.capital_gain += r.capital_gain;
            combined.capital_loss += r.capital_loss;
            combined.capital_gains_tax += r.capital_gains_tax;
            combined.state_tax += r.state_tax;
            combined.niit += r.niit;
            combined.total_tax += r.total_tax;
            combined.total_gain += r.total_gain;
            combined.is_long_term &= r.is_long_term;

            disposition = Some(match disposition {
                None => r.disposition,
                Some(d) if d == r.disposition => d,
                Some(Disposition::NotApplicable) => r.disposition,
                Some(d) if r.disposition == Disposition::NotApplicable => d,
                Some(_) => Disposition::Mixed,
            });
        }

        combined.disposition = disposition.unwrap_or(Disposition::NotApplicable);
        combined.effective_rate = effective_rate(combined.total_tax, combined.total_gain, rules);
        combined
    }
}

fn effective_rate(total_tax: f64, total_gain: f64, rules: &TaxRules) -> f64 {
    if total_gain <= 0.0 {
        0.0
    } else {
        total_tax / total_gain.max(rules.effective_rate_epsilon)
    }
}

/// Per-bucket capital gains after netting short against long
fn net_capital_gains(short_term: f64, long_term: f64) -> (f64, f64) {
    match (short_term < 0.0, long_term < 0.0) {
        (true, false) => (0.0, (long_term + short_term).max(0.0)),
        (false, true) => ((short_term + long_term).max(0.0), 0.0),
        (true, true) => (0.0, 0.0),
        (false, false) => (short_term, long_term),
    }
}

/// Tax engine for equity compensation transactions
#[derive(Debug, Clone, Default)]
pub struct TaxEngine {
    rules: TaxRules,
}

impl TaxEngine {
    /// Create an engine with US federal rules
    pub fn new() -> Self {
        Self {
            rules: TaxRules::us(),
        }
    }

    /// Create with custom rules
    pub fn with_rules(rules: TaxRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TaxRules {
        &self.rules
    }

    /// Tax on exercising `tx.shares` and optionally selling all of them.
    pub fn compute_tax(
        &self,
        grant: &Grant,
        tx: &Transaction,
        settings: &TaxSettings,
    ) -> EquityResult<TaxResult> {
        let exercise = Exercise {
            strike_price: tx.strike_price,
            fmv_at_exercise: tx.fmv_at_exercise,
            shares: tx.shares,
        };
        let lots: Vec<SaleLot> = tx
            .sale_price
            .map(|price| SaleLot {
                shares: tx.shares,
                price,
                holding: tx.holding,
            })
            .into_iter()
            .collect();

        self.compute_lots(grant, &exercise, &lots, settings)
    }

    /// Tax on one exercise whose shares are sold in several lots. Unsold
    /// shares are treated as held.
    pub fn compute_lots(
        &self,
        grant: &Grant,
        exercise: &Exercise,
        lots: &[SaleLot],
        settings: &TaxSettings,
    ) -> EquityResult<TaxResult> {
        grant.validate()?;
        settings.validate()?;
        ensure_non_negative("share count", exercise.shares)?;
        ensure_non_negative("strike price", exercise.strike_price)?;
        ensure_non_negative("FMV at exercise", exercise.fmv_at_exercise)?;

        let mut sold = 0.0;
        for lot in lots {
            ensure_non_negative("lot share count", lot.shares)?;
            ensure_non_negative("sale price", lot.price)?;
            lot.holding.validate()?;
            sold += lot.shares;
        }
        if sold > exercise.shares + SHARE_TOLERANCE {
            return Err(EquityError::Validation(format!(
                "cannot sell {} shares from an exercise of {}",
                sold, exercise.shares
            )));
        }
        let unsold = (exercise.shares - sold).max(0.0);

        let spread = (exercise.fmv_at_exercise - exercise.strike_price).max(0.0);
        let rules = &self.rules;

        let mut ordinary_income = 0.0;
        let mut amt_preference = 0.0;
        let mut short_term_gain = 0.0;
        let mut long_term_gain = 0.0;
        let mut total_gain = unsold * (exercise.fmv_at_exercise - exercise.strike_price);
        let mut qualifying_lots = 0usize;
        let mut long_term_lots = 0usize;

        match grant.grant_type {
            GrantType::Nso | GrantType::Rsu => {
                ordinary_income = spread * exercise.shares;
                for lot in lots {
                    let gain = (lot.price - exercise.fmv_at_exercise) * lot.shares;
                    if lot.holding.holding_period(rules) == HoldingPeriod::LongTerm {
                        long_term_gain += gain;
                        long_term_lots += 1;
                    } else {
                        short_term_gain += gain;
                    }
                    total_gain += (lot.price - exercise.strike_price) * lot.shares;
                }
            }
            GrantType::Iso => {
                amt_preference = spread * unsold;
                for lot in lots {
                    if lot.holding.iso_qualifies(grant.grant_date, rules) {
                        amt_preference += spread * lot.shares;
                        long_term_gain += (lot.price - exercise.strike_price) * lot.shares;
                        qualifying_lots += 1;
                        long_term_lots += 1;
                    } else {
                        // Ordinary income is capped at the gain actually realised
                        let income = spread.min((lot.price - exercise.strike_price).max(0.0));
                        ordinary_income += income * lot.shares;
                        short_term_gain +=
                            (lot.price - exercise.strike_price - income) * lot.shares;
                    }
                    total_gain += (lot.price - exercise.strike_price) * lot.shares;
                }
            }
        }

        let ordinary_income_tax = ordinary_income * settings.federal_rate;

        let (amt_liability, amt_credit_used) = if settings.include_amt && amt_preference > 0.0 {
            let amt_rate = settings.amt_rate.ok_or_else(|| {
                EquityError::Configuration("include_amt is set but no amt_rate was supplied".into())
            })?;
            let gross = amt_preference * amt_rate;
            let credit = settings.prior_amt_credits.min(gross);
            (gross - credit, credit)
        } else {
            (0.0, 0.0)
        };

        let net_total = short_term_gain + long_term_gain;
        let (short_term_gain, long_term_gain) = net_capital_gains(short_term_gain, long_term_gain);
        let capital_gain = short_term_gain + long_term_gain;
        let capital_loss = (-net_total).max(0.0);
        let capital_gains_tax = short_term_gain * settings.federal_rate
            + long_term_gain * settings.long_term_capital_gains_rate;

        let niit = if settings.include_niit {
            let modified_agi = settings.other_income + ordinary_income + capital_gain;
            let over_threshold = (modified_agi - settings.filing_status.niit_threshold()).max(0.0);
            rules.niit_rate * capital_gain.min(over_threshold)
        } else {
            0.0
        };

        let state_tax = state::state_tax(settings, ordinary_income + capital_gain);

        let total_tax = ordinary_income_tax + amt_liability + capital_gains_tax + state_tax + niit;

        let disposition = match grant.grant_type {
            GrantType::Iso if !lots.is_empty() => {
                if qualifying_lots == lots.len() {
                    Disposition::Qualifying
                } else if qualifying_lots == 0 {
                    Disposition::Disqualifying
                } else {
                    Disposition::Mixed
                }
            }
            _ => Disposition::NotApplicable,
        };

        let result = TaxResult {
            ordinary_income,
            ordinary_income_tax,
            amt_preference,
            amt_credit_used,
            amt_liability,
            capital_gain,
            capital_loss,
            capital_gains_tax,
            is_long_term: !lots.is_empty() && long_term_lots == lots.len(),
            disposition,
            state_tax,
            niit,
            total_tax,
            total_gain,
            effective_rate: effective_rate(total_tax, total_gain, rules),
        };

        debug!(
            grant_id = %grant.id,
            grant_type = %grant.grant_type,
            shares = exercise.shares,
            total_tax = result.total_tax,
            effective_rate = result.effective_rate,
            "Computed tax"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use equity_core::dates::add_days;
    use equity_core::{FilingStatus, StateAllocation, VestingCadence};

    fn grant_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn grant(grant_type: GrantType) -> Grant {
        Grant::new(
            "tax",
            grant_type,
            10_000.0,
            1.0,
            5.0,
            grant_date(),
            add_days(grant_date(), 365),
            add_days(grant_date(), 1460),
            VestingCadence::Monthly,
        )
    }

    fn exercise_only(shares: f64) -> Transaction {
        Transaction {
            strike_price: 1.0,
            fmv_at_exercise: 5.0,
            sale_price: None,
            shares,
            holding: HoldingTerms::flag(false),
        }
    }

    #[test]
    fn test_nso_exercise_uses_linear_marginal_rates() {
        let settings = TaxSettings {
            other_income: 150_000.0,
            ..TaxSettings::with_rates(0.37, 0.13)
        };
        let result = TaxEngine::new()
            .compute_tax(&grant(GrantType::Nso), &exercise_only(10_000.0), &settings)
            .unwrap();

        assert_relative_eq!(result.ordinary_income, 40_000.0, epsilon = 1e-9);
        assert_relative_eq!(result.ordinary_income_tax, 14_800.0, epsilon = 1e-9);
        assert_relative_eq!(result.state_tax, 5_200.0, epsilon = 1e-9);
        assert_relative_eq!(result.total_tax, 20_000.0, epsilon = 1e-9);
        assert_relative_eq!(result.effective_rate, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_iso_exercise_creates_amt_preference() {
        let settings = TaxSettings {
            include_amt: true,
            amt_rate: Some(0.28),
            prior_amt_credits: 1_000.0,
            ..TaxSettings::with_rates(0.37, 0.0)
        };
        let result = TaxEngine::new()
            .compute_tax(&grant(GrantType::Iso), &exercise_only(10_000.0), &settings)
            .unwrap();

        assert_eq!(result.ordinary_income, 0.0);
        assert_relative_eq!(result.amt_preference, 40_000.0, epsilon = 1e-9);
        assert_relative_eq!(result.amt_credit_used, 1_000.0, epsilon = 1e-9);
        assert_relative_eq!(result.amt_liability, 40_000.0 * 0.28 - 1_000.0, epsilon = 1e-9);
        assert_relative_eq!(result.total_tax, result.amt_liability, epsilon = 1e-9);
    }

    #[test]
    fn test_amt_credit_never_goes_negative() {
        let settings = TaxSettings {
            include_amt: true,
            amt_rate: Some(0.26),
            prior_amt_credits: 1_000_000.0,
            ..TaxSettings::default()
        };
        let result = TaxEngine::new()
            .compute_tax(&grant(GrantType::Iso), &exercise_only(1_000.0), &settings)
            .unwrap();
        assert_eq!(result.amt_liability, 0.0);
        assert_relative_eq!(result.amt_credit_used, 4_000.0 * 0.26, epsilon = 1e-9);
    }

    #[test]
    fn test_iso_qualifying_vs_disqualifying_sale() {
        let engine = TaxEngine::new();
        let settings = TaxSettings {
            long_term_capital_gains_rate: 0.20,
            ..TaxSettings::with_rates(0.37, 0.0)
        };
        let g = grant(GrantType::Iso);
        let exercise_date = add_days(grant_date(), 400);
        let sale_date = add_days(exercise_date, 365);

        let sale = |sale_date| Transaction {
            strike_price: 1.0,
            fmv_at_exercise: 5.0,
            sale_price: Some(10.0),
            shares: 1_000.0,
            holding: HoldingTerms::dates(exercise_date, sale_date),
        };

        let qualifying = engine.compute_tax(&g, &sale(sale_date), &settings).unwrap();
        assert_eq!(qualifying.disposition, Disposition::Qualifying);
        assert!(qualifying.is_long_term);
        assert_eq!(qualifying.ordinary_income, 0.0);
        // (10 - 1) × 1000 at 20%
        assert_relative_eq!(qualifying.capital_gain, 9_000.0, epsilon = 1e-9);
        assert_relative_eq!(qualifying.capital_gains_tax, 1_800.0, epsilon = 1e-9);

        let early = engine.compute_tax(&g, &sale(add_days(sale_date, -1)), &settings).unwrap();
        assert_eq!(early.disposition, Disposition::Disqualifying);
        assert!(!early.is_long_term);
        // Spread becomes ordinary income, basis steps up to FMV
        assert_relative_eq!(early.ordinary_income, 4_000.0, epsilon = 1e-9);
        assert_relative_eq!(early.capital_gain, 5_000.0, epsilon = 1e-9);
        assert_relative_eq!(early.capital_gains_tax, 5_000.0 * 0.37, epsilon = 1e-9);
        assert!(early.total_tax > qualifying.total_tax);
    }

    #[test]
    fn test_disqualifying_sale_below_exercise_fmv_caps_ordinary_income() {
        let engine = TaxEngine::new();
        let settings = TaxSettings::with_rates(0.37, 0.0);
        let g = grant(GrantType::Iso);
        let sale_at = |price| Transaction {
            strike_price: 1.0,
            fmv_at_exercise: 5.0,
            sale_price: Some(price),
            shares: 1_000.0,
            holding: HoldingTerms::flag(false),
        };

        // Sold at 3: only the realised 2/share is ordinary income
        let below = engine.compute_tax(&g, &sale_at(3.0), &settings).unwrap();
        assert_eq!(below.disposition, Disposition::Disqualifying);
        assert_relative_eq!(below.ordinary_income, 2_000.0, epsilon = 1e-9);
        assert_eq!(below.capital_gain, 0.0);
        assert_eq!(below.capital_loss, 0.0);
        assert_relative_eq!(below.total_tax, 2_000.0 * 0.37, epsilon = 1e-9);

        // Sold under the strike: no ordinary income, the shortfall is a capital loss
        let under = engine.compute_tax(&g, &sale_at(0.5), &settings).unwrap();
        assert_eq!(under.ordinary_income, 0.0);
        assert_relative_eq!(under.capital_loss, 500.0, epsilon = 1e-9);
        assert_eq!(under.total_tax, 0.0);
    }

    #[test]
    fn test_iso_grant_date_threshold_flips_treatment() {
        let engine = TaxEngine::new();
        let settings = TaxSettings::with_rates(0.37, 0.0);
        let g = grant(GrantType::Iso);
        let exercise_date = add_days(grant_date(), 100);
        let sale_date = add_days(grant_date(), 730);

        let tx = |sale_date| Transaction {
            strike_price: 1.0,
            fmv_at_exercise: 5.0,
            sale_price: Some(10.0),
            shares: 1_000.0,
            holding: HoldingTerms::dates(exercise_date, sale_date),
        };

        assert!(engine.compute_tax(&g, &tx(sale_date), &settings).unwrap().is_long_term);
        let early = engine.compute_tax(&g, &tx(add_days(sale_date, -1)), &settings).unwrap();
        assert!(!early.is_long_term);
        assert_eq!(early.disposition, Disposition::Disqualifying);
    }

    #[test]
    fn test_nso_long_term_sale() {
        let settings = TaxSettings::with_rates(0.37, 0.0);
        let tx = Transaction {
            strike_price: 1.0,
            fmv_at_exercise: 5.0,
            sale_price: Some(8.0),
            shares: 100.0,
            holding: HoldingTerms::flag(true),
        };
        let result = TaxEngine::new().compute_tax(&grant(GrantType::Nso), &tx, &settings).unwrap();
        assert_relative_eq!(result.ordinary_income, 400.0, epsilon = 1e-9);
        assert_relative_eq!(result.capital_gain, 300.0, epsilon = 1e-9);
        assert_relative_eq!(result.capital_gains_tax, 60.0, epsilon = 1e-9);
        assert_relative_eq!(result.total_gain, 700.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sale_at_a_loss_has_no_negative_fields() {
        let settings = TaxSettings {
            include_niit: true,
            ..TaxSettings::with_rates(0.37, 0.05)
        };
        let tx = Transaction {
            strike_price: 1.0,
            fmv_at_exercise: 5.0,
            sale_price: Some(0.5),
            shares: 1_000.0,
            holding: HoldingTerms::flag(false),
        };
        let result = TaxEngine::new().compute_tax(&grant(GrantType::Nso), &tx, &settings).unwrap();

        assert_eq!(result.capital_gain, 0.0);
        assert_relative_eq!(result.capital_loss, 4_500.0, epsilon = 1e-9);
        assert_eq!(result.capital_gains_tax, 0.0);
        assert_eq!(result.niit, 0.0);
        assert_eq!(result.effective_rate, 0.0);
        for value in [
            result.ordinary_income_tax,
            result.amt_liability,
            result.capital_gains_tax,
            result.state_tax,
            result.niit,
            result.total_tax,
        ] {
            assert!(value >= 0.0);
        }
        let components = result.ordinary_income_tax
            + result.amt_liability
            + result.capital_gains_tax
            + result.state_tax
            + result.niit;
        assert!(result.total_tax >= components - 1e-9);
    }

    #[test]
    fn test_niit_limited_to_income_over_threshold() {
        let settings = TaxSettings {
            filing_status: FilingStatus::Single,
            other_income: 190_000.0,
            include_niit: true,
            ..TaxSettings::with_rates(0.37, 0.0)
        };
        let tx = Transaction {
            strike_price: 0.0,
            fmv_at_exercise: 0.0,
            sale_price: Some(50.0),
            shares: 1_000.0,
            holding: HoldingTerms::flag(true),
        };
        let mut g = grant(GrantType::Nso);
        g.strike_price = 0.0;
        let result = TaxEngine::new().compute_tax(&g, &tx, &settings).unwrap();
        // MAGI 240K, 40K over threshold, gain 50K
        assert_relative_eq!(result.niit, 0.038 * 40_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_multi_state_allocation() {
        let settings = TaxSettings {
            include_multi_state: true,
            state_allocations: vec![
                StateAllocation { state: "CA".into(), percentage: 50.0, rate: 0.10 },
                StateAllocation { state: "WA".into(), percentage: 50.0, rate: 0.0 },
            ],
            ..TaxSettings::with_rates(0.37, 0.13)
        };
        let result = TaxEngine::new()
            .compute_tax(&grant(GrantType::Nso), &exercise_only(10_000.0), &settings)
            .unwrap();
        assert_relative_eq!(result.state_tax, 40_000.0 * 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_validation_errors() {
        let engine = TaxEngine::new();
        let settings = TaxSettings::default();
        let g = grant(GrantType::Nso);

        let mut tx = exercise_only(-1.0);
        assert!(engine.compute_tax(&g, &tx, &settings).unwrap_err().is_validation());

        tx = exercise_only(10.0);
        tx.strike_price = -1.0;
        assert!(engine.compute_tax(&g, &tx, &settings).unwrap_err().is_validation());

        tx = exercise_only(10.0);
        tx.fmv_at_exercise = -5.0;
        assert!(engine.compute_tax(&g, &tx, &settings).unwrap_err().is_validation());
    }

    #[test]
    fn test_amt_without_rate_is_configuration_error() {
        let settings = TaxSettings {
            include_amt: true,
            amt_rate: None,
            ..TaxSettings::default()
        };
        let err = TaxEngine::new()
            .compute_tax(&grant(GrantType::Iso), &exercise_only(10.0), &settings)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_lots_cannot_oversell() {
        let exercise = Exercise { strike_price: 1.0, fmv_at_exercise: 5.0, shares: 100.0 };
        let lots = vec![SaleLot { shares: 150.0, price: 6.0, holding: HoldingTerms::flag(false) }];
        let err = TaxEngine::new()
            .compute_lots(&grant(GrantType::Nso), &exercise, &lots, &TaxSettings::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_mixed_iso_lots() {
        let exercise_date = add_days(grant_date(), 400);
        let exercise = Exercise { strike_price: 1.0, fmv_at_exercise: 5.0, shares: 200.0 };
        let lots = vec![
            SaleLot {
                shares: 100.0,
                price: 10.0,
                holding: HoldingTerms::dates(exercise_date, add_days(exercise_date, 30)),
            },
            SaleLot {
                shares: 100.0,
                price: 10.0,
                holding: HoldingTerms::dates(exercise_date, add_days(exercise_date, 400)),
            },
        ];
        let result = TaxEngine::new()
            .compute_lots(&grant(GrantType::Iso), &exercise, &lots, &TaxSettings::default())
            .unwrap();
        assert_eq!(result.disposition, Disposition::Mixed);
        assert!(!result.is_long_term);
        assert_relative_eq!(result.ordinary_income, 400.0, epsilon = 1e-9);
        assert_relative_eq!(result.amt_preference, 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_combine_recomputes_effective_rate() {
        let engine = TaxEngine::new();
        let settings = TaxSettings::with_rates(0.30, 0.0);
        let g = grant(GrantType::Nso);
        let a = engine.compute_tax(&g, &exercise_only(100.0), &settings).unwrap();
        let b = engine.compute_tax(&g, &exercise_only(300.0), &settings).unwrap();
        let combined = TaxResult::combine(&[a, b], engine.rules());
        assert_relative_eq!(combined.ordinary_income, 1_600.0, epsilon = 1e-9);
        assert_relative_eq!(combined.total_tax, 480.0, epsilon = 1e-9);
        assert_relative_eq!(combined.effective_rate, 0.30, epsilon = 1e-12);
        assert!(!combined.is_long_term);
    }
}
