//! Vesting Calculator
//!
//! Computes point-in-time vesting snapshots for a grant.

use chrono::NaiveDate;
use equity_core::{EquityResult, Grant};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::acceleration::{self, AccelerationEvent, AccelerationOutcome};
use crate::iso_limit::{self, IsoLimitSplit};
use crate::schedule::{VestingEvent, VestingPlan};

/// Vesting state of a grant as of a date. Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingSnapshot {
    /// Grant this snapshot describes
    pub grant_id: String,
    /// Date the snapshot was taken
    pub as_of: NaiveDate,
    pub total_shares: f64,
    /// Shares vested and released
    pub vested_shares: f64,
    pub unvested_shares: f64,
    /// Vested percentage (0-100)
    pub vested_percentage: f64,
    pub cliff_passed: bool,
    pub fully_vested: bool,
    /// Time-based vested shares, released only once any liquidity condition is met
    pub time_vested_shares: f64,
    /// Double-trigger grant still waiting for its liquidity event
    pub awaiting_liquidity_event: bool,
    /// Next date on which vested shares increase
    pub next_vesting: Option<VestingEvent>,
    /// Full schedule of vesting events
    pub schedule: Vec<VestingEvent>,
}

impl VestingSnapshot {
    /// Shares added by the next vesting event
    pub fn next_vesting_shares(&self) -> f64 {
        self.next_vesting
            .as_ref()
            .map(|e| e.cumulative_shares - self.vested_shares)
            .unwrap_or(0.0)
    }
}

/// Vesting calculator. Stateless; every call recomputes from the grant.
#[derive(Debug, Clone, Copy, Default)]
pub struct VestingCalculator;

impl VestingCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Vesting snapshot with no liquidity event supplied.
    pub fn snapshot(&self, grant: &Grant, as_of: NaiveDate) -> EquityResult<VestingSnapshot> {
        self.snapshot_with_liquidity(grant, as_of, None)
    }

    /// Vesting snapshot, releasing double-trigger shares once `liquidity_event`
    /// has occurred on or before `as_of`.
    pub fn snapshot_with_liquidity(
        &self,
        grant: &Grant,
        as_of: NaiveDate,
        liquidity_event: Option<NaiveDate>,
    ) -> EquityResult<VestingSnapshot> {
        let plan = VestingPlan::new(grant)?;
        let schedule = plan.events();
        let time_vested = plan.vested_at(as_of);

        let liquidity_met = liquidity_event.map(|d| d <= as_of).unwrap_or(false);
        let awaiting_liquidity_event = grant.liquidity_event_only && !liquidity_met;

        let vested_shares = if awaiting_liquidity_event { 0.0 } else { time_vested };
        let unvested_shares = grant.total_shares - vested_shares;

        let next_vesting = if awaiting_liquidity_event {
            None
        } else {
            schedule.iter().find(|e| e.date > as_of).cloned()
        };

        debug!(
            grant_id = %grant.id,
            %as_of,
            vested_shares,
            time_vested,
            awaiting_liquidity_event,
            "Computed vesting snapshot"
        );

        Ok(VestingSnapshot {
            grant_id: grant.id.clone(),
            as_of,
            total_shares: grant.total_shares,
            vested_shares,
            unvested_shares,
            vested_percentage: vested_shares / grant.total_shares * 100.0,
            cliff_passed: as_of >= grant.cliff_date,
            fully_vested: vested_shares >= grant.total_shares,
            time_vested_shares: time_vested,
            awaiting_liquidity_event,
            next_vesting,
            schedule,
        })
    }

    /// Vested shares only, for callers that do not need the schedule
    pub fn vested_shares(
        &self,
        grant: &Grant,
        as_of: NaiveDate,
        liquidity_event: Option<NaiveDate>,
    ) -> EquityResult<f64> {
        let plan = VestingPlan::new(grant)?;
        let liquidity_met = liquidity_event.map(|d| d <= as_of).unwrap_or(false);
        if grant.liquidity_event_only && !liquidity_met {
            return Ok(0.0);
        }
        Ok(plan.vested_at(as_of))
    }

    /// Full vesting schedule of a grant
    pub fn schedule(&self, grant: &Grant) -> EquityResult<Vec<VestingEvent>> {
        Ok(VestingPlan::new(grant)?.events())
    }

    /// Split an ISO grant into ISO and NSO shares under the $100K annual limit
    pub fn iso_limit_split(&self, grant: &Grant) -> EquityResult<IsoLimitSplit> {
        iso_limit::split_grant(grant)
    }

    /// Split several ISO grants, sharing each calendar year's limit in grant-date order
    pub fn iso_limit_split_all(&self, grants: &[Grant]) -> EquityResult<Vec<IsoLimitSplit>> {
        iso_limit::split_grants(grants)
    }

    /// Post-acceleration vested/unvested split; the grant is left untouched
    pub fn apply_acceleration(
        &self,
        grant: &Grant,
        as_of: NaiveDate,
        event: &AccelerationEvent,
    ) -> EquityResult<AccelerationOutcome> {
        acceleration::apply(self, grant, as_of, event)
    }
}
