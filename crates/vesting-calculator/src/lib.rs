//! Vesting Calculator
//!
//! Vested/unvested share counts, vesting schedules, ISO $100K limit
//! splitting and acceleration for equity grants.

pub mod acceleration;
pub mod calculator;
pub mod iso_limit;
pub mod schedule;

pub use acceleration::{monthly_vesting_rate, AccelerationEvent, AccelerationOutcome};
pub use calculator::{VestingCalculator, VestingSnapshot};
pub use iso_limit::{IsoLimitSplit, IsoYearTranche, ISO_ANNUAL_LIMIT};
pub use schedule::{cliff_fraction, VestingEvent, VestingEventLabel, VestingPlan};
