//! Day-count helpers.
//!
//! Intervals are measured in whole days between calendar dates. Month,
//! quarter and year lengths use fixed approximations; `VestingCadence`
//! routes every period-length lookup through `period_length_days` so a
//! calendar-exact implementation only has to change that one function.

use chrono::{Duration, NaiveDate};

use crate::error::{EquityError, EquityResult};

/// Average month length in days
pub const DAYS_PER_MONTH: f64 = 30.44;
/// Average quarter length in days
pub const DAYS_PER_QUARTER: f64 = 91.25;
/// Year length in days
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Shift by a day count known to stay inside the calendar range.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Shift by a caller-supplied day count, failing past chrono's date range.
pub fn checked_add_days(date: NaiveDate, days: i64) -> EquityResult<NaiveDate> {
    Duration::try_days(days)
        .and_then(|offset| date.checked_add_signed(offset))
        .ok_or_else(|| {
            EquityError::Validation(format!(
                "{} shifted by {} days is outside the supported date range",
                date, days
            ))
        })
}

/// Shift a date by a (possibly fractional) number of approximate months.
pub fn add_months_approx(date: NaiveDate, months: f64) -> EquityResult<NaiveDate> {
    if !months.is_finite() {
        return Err(EquityError::Validation(format!(
            "month offset must be finite, got {}",
            months
        )));
    }
    // Saturating cast; out-of-range counts are rejected by checked_add_days
    checked_add_days(date, (months * DAYS_PER_MONTH).round() as i64)
}

/// Approximate months between two dates.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> f64 {
    days_between(from, to) as f64 / DAYS_PER_MONTH
}

/// Approximate years between two dates.
pub fn years_between(from: NaiveDate, to: NaiveDate) -> f64 {
    days_between(from, to) as f64 / DAYS_PER_YEAR
}
