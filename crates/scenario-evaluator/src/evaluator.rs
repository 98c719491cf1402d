//! Scenario Evaluator
//!
//! Each candidate becomes a list of exercise tranches. Each tranche is sold
//! in one or more lots shaped by the exit type. Every lot is taxed through
//! the same `TaxEngine` call.

use chrono::NaiveDate;
use equity_core::dates::{add_days, add_months_approx, checked_add_days, days_between};
use equity_core::{
    ensure_non_negative, ensure_unit_interval, EquityError, EquityResult, ExitScenario, ExitType,
    Grant, TaxSettings,
};
use serde::{Deserialize, Serialize};
use tax_engine::{Exercise, HoldingTerms, SaleLot, TaxEngine, TaxResult};
use tracing::{debug, info};
use vesting_calculator::VestingCalculator;

use crate::sensitivity::{self, SensitivityCell, SensitivityConfig};
use crate::strategy::{Strategy, StrategyCandidate, StrategyKind};

/// Whole-share rounding slack
const SHARE_EPSILON: f64 = 1e-9;

/// Output of one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub grant_id: String,
    pub as_of: NaiveDate,
    pub exit_date: NaiveDate,
    /// Price per share the holder realises at exit
    pub exit_price: f64,
    /// Ranked, best first
    pub strategies: Vec<Strategy>,
    /// Id of the top-ranked strategy
    pub optimal: String,
    /// Net-proceeds margin of the optimal strategy over the runner-up
    pub potential_savings: f64,
    /// Row-major grid (multiples outer, holding periods inner)
    pub sensitivity: Vec<SensitivityCell>,
}

impl Evaluation {
    pub fn optimal_strategy(&self) -> Option<&Strategy> {
        self.strategies.first()
    }
}

/// Strategies sorted best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedStrategies {
    pub strategies: Vec<Strategy>,
    pub optimal: String,
    pub potential_savings: f64,
}

/// Sort by net proceeds descending, ties to the lower effective rate.
/// Fully tied strategies keep their input order.
pub fn rank(mut strategies: Vec<Strategy>) -> EquityResult<RankedStrategies> {
    if strategies.is_empty() {
        return Err(EquityError::Validation("no strategies to rank".into()));
    }

    strategies.sort_by(|a, b| {
        b.net_proceeds
            .total_cmp(&a.net_proceeds)
            .then_with(|| a.tax.effective_rate.total_cmp(&b.tax.effective_rate))
    });

    let potential_savings = match strategies.get(1) {
        Some(second) => (strategies[0].net_proceeds - second.net_proceeds).max(0.0),
        None => 0.0,
    };

    Ok(RankedStrategies {
        optimal: strategies[0].id.clone(),
        potential_savings,
        strategies,
    })
}

/// Shares exercised together on one date
#[derive(Debug, Clone, Copy)]
struct Tranche {
    date: NaiveDate,
    shares: f64,
}

fn whole_shares(shares: f64) -> f64 {
    (shares + SHARE_EPSILON).floor().max(0.0)
}

/// FMV on `date`, linear between today's FMV and the quoted exit price
fn projected_fmv(
    grant: &Grant,
    exit_price: f64,
    as_of: NaiveDate,
    exit_date: NaiveDate,
    date: NaiveDate,
) -> f64 {
    let span = days_between(as_of, exit_date);
    if span <= 0 {
        return exit_price;
    }
    let t = (days_between(as_of, date) as f64 / span as f64).clamp(0.0, 1.0);
    grant.current_fmv + (exit_price - grant.current_fmv) * t
}

/// Cash/stock override for deal variants, `None` to use the scenario's mix
fn deal_mix(exit: &ExitScenario, kind: StrategyKind) -> EquityResult<Option<(f64, f64)>> {
    if !kind.is_deal() {
        return Ok(None);
    }
    match exit.exit_type {
        ExitType::Acquisition { .. } => Ok(match kind {
            StrategyKind::CashDeal => Some((100.0, 0.0)),
            StrategyKind::StockDeal => Some((0.0, 100.0)),
            _ => None,
        }),
        _ => Err(EquityError::Configuration(format!(
            "deal strategies require an acquisition exit, got {}",
            exit.exit_type.name()
        ))),
    }
}

/// Sale lots for one tranche. No lot is sold before its exercise date.
fn sale_lots(
    exit: &ExitScenario,
    mix: Option<(f64, f64)>,
    exit_date: NaiveDate,
    price: f64,
    tranche: Tranche,
) -> EquityResult<Vec<SaleLot>> {
    let lot = |sale_date: NaiveDate, shares: f64| SaleLot {
        shares,
        price,
        holding: HoldingTerms::dates(tranche.date, sale_date.max(tranche.date)),
    };

    match &exit.exit_type {
        ExitType::Ipo { lockup_days } => {
            Ok(vec![lot(checked_add_days(exit_date, *lockup_days)?, tranche.shares)])
        }
        ExitType::Secondary { .. } => Ok(vec![lot(exit_date, tranche.shares)]),
        ExitType::Acquisition {
            cash_percentage,
            stock_percentage,
            earnout,
            stock_hold_days,
        } => {
            let (cash, stock) = mix.unwrap_or((*cash_percentage, *stock_percentage));
            let earnout_fraction = earnout.as_ref().map(|e| e.percentage / 100.0).unwrap_or(0.0);
            let upfront = tranche.shares * (1.0 - earnout_fraction);

            let mut lots = vec![
                lot(exit_date, upfront * cash / 100.0),
                lot(checked_add_days(exit_date, *stock_hold_days)?, upfront * stock / 100.0),
            ];
            if let Some(earnout) = earnout {
                lots.push(lot(
                    checked_add_days(exit_date, earnout.delay_days)?,
                    tranche.shares * earnout_fraction,
                ));
            }
            lots.retain(|l| l.shares > 0.0);
            Ok(lots)
        }
    }
}

/// Composes vesting and tax across candidate strategies
#[derive(Debug, Clone, Default)]
pub struct ScenarioEvaluator {
    vesting: VestingCalculator,
    tax: TaxEngine,
    sensitivity: SensitivityConfig,
}

impl ScenarioEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tax_engine(mut self, tax: TaxEngine) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: SensitivityConfig) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Evaluate and rank `candidates`, then sweep the sensitivity grid for
    /// the optimal strategy's share count.
    pub fn evaluate(
        &self,
        grant: &Grant,
        exit: &ExitScenario,
        candidates: &[StrategyCandidate],
        settings: &TaxSettings,
        as_of: NaiveDate,
    ) -> EquityResult<Evaluation> {
        grant.validate()?;
        exit.validate()?;
        settings.validate()?;
        self.sensitivity.validate()?;

        if candidates.is_empty() {
            return Err(EquityError::Validation(
                "at least one candidate strategy is required".into(),
            ));
        }

        let strategies = candidates
            .iter()
            .map(|c| self.evaluate_candidate(grant, exit, c, settings, as_of))
            .collect::<EquityResult<Vec<_>>>()?;

        let ranked = rank(strategies)?;
        let optimal_shares = ranked
            .strategies
            .first()
            .map(|s| s.shares_exercised)
            .unwrap_or(0.0);

        let sensitivity =
            sensitivity::sweep(&self.tax, grant, optimal_shares, settings, &self.sensitivity)?;

        info!(
            grant_id = %grant.id,
            exit_type = exit.exit_type.name(),
            strategies = ranked.strategies.len(),
            optimal = %ranked.optimal,
            potential_savings = ranked.potential_savings,
            "Evaluated exit scenario"
        );

        Ok(Evaluation {
            grant_id: grant.id.clone(),
            as_of,
            exit_date: exit.exit_date(as_of)?,
            exit_price: exit.realized_price(grant),
            strategies: ranked.strategies,
            optimal: ranked.optimal,
            potential_savings: ranked.potential_savings,
            sensitivity,
        })
    }

    /// Evaluate a single candidate without ranking
    pub fn evaluate_candidate(
        &self,
        grant: &Grant,
        exit: &ExitScenario,
        candidate: &StrategyCandidate,
        settings: &TaxSettings,
        as_of: NaiveDate,
    ) -> EquityResult<Strategy> {
        ensure_unit_interval("share fraction", candidate.share_fraction)?;

        let exit_date = exit.exit_date(as_of)?;
        if exit_date < as_of {
            return Err(EquityError::Validation(format!(
                "exit date {} precedes as-of date {}",
                exit_date, as_of
            )));
        }

        let mix = deal_mix(exit, candidate.kind)?;
        let (planned_date, tranches) = self.plan_exercises(grant, candidate, as_of, exit_date)?;

        // A secondary buyer's discounted price is also the FMV on the exit date
        let price = exit.realized_price(grant);
        let shares_exercised: f64 = tranches.iter().map(|t| t.shares).sum();

        let mut results = Vec::with_capacity(tranches.len());
        let mut gross_proceeds = 0.0;
        let mut sale_date = exit_date;

        for tranche in &tranches {
            let lots = sale_lots(exit, mix, exit_date, price, *tranche)?;
            for lot in &lots {
                gross_proceeds += lot.shares * lot.price;
                if let HoldingTerms::Dates { sale_date: d, .. } = lot.holding {
                    sale_date = sale_date.max(d);
                }
            }

            let exercise = Exercise {
                strike_price: grant.strike_price,
                fmv_at_exercise: projected_fmv(grant, price, as_of, exit_date, tranche.date),
                shares: tranche.shares,
            };
            let tranche_settings = if tranches.len() > 1 {
                settings.apportioned(tranche.shares / shares_exercised)
            } else {
                settings.clone()
            };
            results.push(self.tax.compute_lots(grant, &exercise, &lots, &tranche_settings)?);
        }

        let tax = match results.len() {
            0 => TaxResult::default(),
            1 => results.remove(0),
            _ => TaxResult::combine(&results, self.tax.rules()),
        };

        let exercise_cost = grant.strike_price * shares_exercised;
        let net_proceeds = gross_proceeds - exercise_cost - tax.total_tax;
        let roi = if exercise_cost > 0.0 {
            net_proceeds / exercise_cost
        } else {
            0.0
        };

        debug!(
            grant_id = %grant.id,
            strategy = %candidate.id,
            shares_exercised,
            net_proceeds,
            total_tax = tax.total_tax,
            "Evaluated strategy"
        );

        Ok(Strategy {
            id: candidate.id.clone(),
            label: candidate.label.clone(),
            kind: candidate.kind,
            shares_exercised,
            exercise_date: tranches.first().map(|t| t.date).unwrap_or(planned_date),
            sale_date,
            exercise_cost,
            gross_proceeds,
            tax,
            net_proceeds,
            roi,
            risk: candidate.kind.risk(),
        })
    }

    /// Shares that can be exercised on `date`. Double-trigger grants are
    /// released by the exit itself.
    fn exercisable(
        &self,
        grant: &Grant,
        date: NaiveDate,
        exit_date: NaiveDate,
    ) -> EquityResult<f64> {
        if grant.grant_type.is_option() {
            if let Some(expiration) = grant.expiration_date {
                if date > expiration {
                    return Ok(0.0);
                }
            }
            if grant.early_exercise_allowed {
                return Ok(grant.total_shares);
            }
        }
        self.vesting.vested_shares(grant, date, Some(exit_date))
    }

    /// Planned first exercise date and the non-empty tranches
    fn plan_exercises(
        &self,
        grant: &Grant,
        candidate: &StrategyCandidate,
        as_of: NaiveDate,
        exit_date: NaiveDate,
    ) -> EquityResult<(NaiveDate, Vec<Tranche>)> {
        let fraction = candidate.share_fraction;
        let single = |date: NaiveDate| -> EquityResult<(NaiveDate, Vec<Tranche>)> {
            let shares = whole_shares(fraction * self.exercisable(grant, date, exit_date)?);
            let tranches = if shares > 0.0 {
                vec![Tranche { date, shares }]
            } else {
                Vec::new()
            };
            Ok((date, tranches))
        };

        match candidate.kind {
            StrategyKind::ExerciseNow => single(as_of),
            StrategyKind::ExerciseAtExit
            | StrategyKind::CashDeal
            | StrategyKind::StockDeal
            | StrategyKind::MixedDeal => single(exit_date),
            StrategyKind::WaitAndExercise { months } => {
                ensure_non_negative("wait months", months)?;
                single(add_months_approx(as_of, months)?.min(exit_date))
            }
            StrategyKind::Staggered { tranches: count } => {
                if count == 0 {
                    return Err(EquityError::Validation(
                        "staggered strategy needs at least one tranche".into(),
                    ));
                }
                let span = days_between(as_of, exit_date);
                let mut tranches = Vec::with_capacity(count as usize);
                let mut done = 0.0;
                for i in 0..count {
                    let offset = if count == 1 {
                        0
                    } else {
                        (span as f64 * i as f64 / (count - 1) as f64).round() as i64
                    };
                    let date = add_days(as_of, offset);
                    let target = whole_shares(
                        fraction * self.exercisable(grant, date, exit_date)? * (i + 1) as f64
                            / count as f64,
                    );
                    let shares = target - done;
                    if shares > 0.0 {
                        tranches.push(Tranche { date, shares });
                        done = target;
                    }
                }
                Ok((as_of, tranches))
            }
        }
    }
}
