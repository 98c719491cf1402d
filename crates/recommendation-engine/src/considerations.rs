//! Considerations
//!
//! An ordered table of `(kind, predicate)` rules. Every rule that holds
//! contributes one consideration, in table order.

use equity_core::{Grant, GrantType};
use scenario_evaluator::Strategy;
use serde::{Deserialize, Serialize};

use crate::factors::DecisionFactors;
use crate::policy::{RecommendedAction, Timeframe};

/// Factor scores below this trigger a caution
const LOW_FACTOR: f64 = 0.5;
/// Outlook at or above this is treated as high conviction
const HIGH_OUTLOOK: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsiderationKind {
    LiquidityCaution,
    OutlookCaution,
    OutlookConviction,
    TaxInefficiency,
    TimingCaution,
    Expired,
    ExpirationApproaching,
    IsoAmtExposure,
    NsoOrdinaryIncome,
    RsuSettlement,
    DoubleTrigger,
    EarlyExerciseElection,
    TaxStrategyDiffers,
}

impl ConsiderationKind {
    pub fn message(&self) -> &'static str {
        match self {
            ConsiderationKind::LiquidityCaution => {
                "Exercise cost and tax due at exercise may strain available cash; keep a reserve before committing"
            }
            ConsiderationKind::OutlookCaution => {
                "Company outlook is uncertain; limit the capital placed in illiquid shares"
            }
            ConsiderationKind::OutlookConviction => {
                "Strong outlook: exercising earlier starts the holding-period clock on more shares"
            }
            ConsiderationKind::TaxInefficiency => {
                "The current tax position is unfavourable; model the liability before exercising"
            }
            ConsiderationKind::TimingCaution => {
                "Timing is unfavourable; revisit after the next valuation or liquidity update"
            }
            ConsiderationKind::Expired => "The exercise window has closed; the options can no longer be exercised",
            ConsiderationKind::ExpirationApproaching => {
                "Options expire soon; anything left unexercised at expiration is forfeited"
            }
            ConsiderationKind::IsoAmtExposure => {
                "ISO exercise creates an AMT preference item; hold 1 year past exercise and 2 years past grant for a qualifying disposition"
            }
            ConsiderationKind::NsoOrdinaryIncome => {
                "NSO spread is taxed as ordinary income in the year of exercise"
            }
            ConsiderationKind::RsuSettlement => {
                "RSUs are taxed as ordinary income at settlement; plan for withholding shortfalls"
            }
            ConsiderationKind::DoubleTrigger => {
                "Shares are released only by a liquidity event; time-vested shares carry no value until then"
            }
            ConsiderationKind::EarlyExerciseElection => {
                "Early exercise is allowed; an 83(b) election within 30 days fixes the taxable spread at exercise"
            }
            ConsiderationKind::TaxStrategyDiffers => {
                "The lowest-tax strategy is not the highest-proceeds strategy; weigh tax savings against net proceeds"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consideration {
    pub kind: ConsiderationKind,
    pub message: String,
}

/// Inputs the rule predicates read
pub struct ConsiderationContext<'a> {
    pub factors: &'a DecisionFactors,
    pub grant: &'a Grant,
    pub action: RecommendedAction,
    pub timeframe: Timeframe,
    pub optimal: Option<&'a Strategy>,
    pub best_tax: Option<&'a Strategy>,
}

struct Rule {
    kind: ConsiderationKind,
    applies: fn(&ConsiderationContext<'_>) -> bool,
}

fn low_capacity(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.factors.financial_capacity < LOW_FACTOR
}

fn low_outlook(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.factors.company_outlook < LOW_FACTOR
}

fn high_outlook(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.factors.company_outlook >= HIGH_OUTLOOK
}

fn low_tax_efficiency(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.factors.tax_efficiency < LOW_FACTOR
}

fn low_timing(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.factors.timing < LOW_FACTOR
}

fn expired(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.timeframe == Timeframe::Expired
}

fn expiring(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.timeframe == Timeframe::Immediate
}

fn iso_exercise(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.grant.grant_type == GrantType::Iso && ctx.action != RecommendedAction::Wait
}

fn nso(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.grant.grant_type == GrantType::Nso
}

fn rsu(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.grant.grant_type == GrantType::Rsu
}

fn double_trigger(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.grant.liquidity_event_only
}

fn early_exercise(ctx: &ConsiderationContext<'_>) -> bool {
    ctx.grant.early_exercise_allowed && ctx.grant.grant_type.is_option()
}

fn tax_strategy_differs(ctx: &ConsiderationContext<'_>) -> bool {
    match (ctx.optimal, ctx.best_tax) {
        (Some(optimal), Some(best_tax)) => optimal.id != best_tax.id,
        _ => false,
    }
}

static RULES: &[Rule] = &[
    Rule { kind: ConsiderationKind::LiquidityCaution, applies: low_capacity },
    Rule { kind: ConsiderationKind::OutlookCaution, applies: low_outlook },
    Rule { kind: ConsiderationKind::OutlookConviction, applies: high_outlook },
    Rule { kind: ConsiderationKind::TaxInefficiency, applies: low_tax_efficiency },
    Rule { kind: ConsiderationKind::TimingCaution, applies: low_timing },
    Rule { kind: ConsiderationKind::Expired, applies: expired },
    Rule { kind: ConsiderationKind::ExpirationApproaching, applies: expiring },
    Rule { kind: ConsiderationKind::IsoAmtExposure, applies: iso_exercise },
    Rule { kind: ConsiderationKind::NsoOrdinaryIncome, applies: nso },
    Rule { kind: ConsiderationKind::RsuSettlement, applies: rsu },
    Rule { kind: ConsiderationKind::DoubleTrigger, applies: double_trigger },
    Rule { kind: ConsiderationKind::EarlyExerciseElection, applies: early_exercise },
    Rule { kind: ConsiderationKind::TaxStrategyDiffers, applies: tax_strategy_differs },
];

/// Considerations for `ctx`, in table order
pub fn collect(ctx: &ConsiderationContext<'_>) -> Vec<Consideration> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(ctx))
        .map(|rule| Consideration {
            kind: rule.kind,
            message: rule.kind.message().to_string(),
        })
        .collect()
}
