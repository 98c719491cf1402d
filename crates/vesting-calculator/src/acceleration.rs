//! Vesting Acceleration
//!
//! Applies single-trigger, double-trigger or partial acceleration to a
//! snapshot without touching the grant.

use chrono::NaiveDate;
use equity_core::dates::months_between;
use equity_core::{ensure_non_negative, EquityResult, Grant};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calculator::VestingCalculator;

/// Acceleration event supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccelerationEvent {
    /// Change of control alone vests everything
    SingleTrigger,
    /// Change of control plus termination vests everything
    DoubleTrigger { termination_confirmed: bool },
    /// A number of months of additional vesting
    Partial { months: f64 },
}

/// Post-acceleration vesting split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelerationOutcome {
    pub grant_id: String,
    pub as_of: NaiveDate,
    /// Whether any acceleration was applied
    pub applied: bool,
    pub vested_before: f64,
    pub accelerated_shares: f64,
    pub vested_shares: f64,
    pub unvested_shares: f64,
    pub vested_percentage: f64,
}

/// Shares vesting per month over the whole vesting window
pub fn monthly_vesting_rate(grant: &Grant) -> f64 {
    let months = months_between(grant.vesting_start, grant.vesting_end);
    if months <= 0.0 {
        grant.total_shares
    } else {
        grant.total_shares / months
    }
}

pub(crate) fn apply(
    calculator: &VestingCalculator,
    grant: &Grant,
    as_of: NaiveDate,
    event: &AccelerationEvent,
) -> EquityResult<AccelerationOutcome> {
    if let AccelerationEvent::Partial { months } = event {
        ensure_non_negative("acceleration months", *months)?;
    }

    // A change of control is itself the liquidity event for double-trigger RSUs
    let snapshot = calculator.snapshot_with_liquidity(grant, as_of, Some(as_of))?;
    let unvested = snapshot.unvested_shares;

    let accelerated = if !grant.accelerated_vesting {
        0.0
    } else {
        match event {
            AccelerationEvent::SingleTrigger => unvested,
            AccelerationEvent::DoubleTrigger {
                termination_confirmed: true,
            } => unvested,
            AccelerationEvent::DoubleTrigger {
                termination_confirmed: false,
            } => 0.0,
            AccelerationEvent::Partial { months } => {
                (months * monthly_vesting_rate(grant)).floor().min(unvested)
            }
        }
    };

    let vested = snapshot.vested_shares + accelerated;

    if accelerated > 0.0 {
        info!(
            grant_id = %grant.id,
            %as_of,
            accelerated,
            "Applied vesting acceleration"
        );
    }

    Ok(AccelerationOutcome {
        grant_id: grant.id.clone(),
        as_of,
        applied: accelerated > 0.0,
        vested_before: snapshot.vested_shares,
        accelerated_shares: accelerated,
        vested_shares: vested,
        unvested_shares: grant.total_shares - vested,
        vested_percentage: vested / grant.total_shares * 100.0,
    })
}
