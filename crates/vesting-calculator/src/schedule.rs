//! Vesting Schedule
//!
//! Time-based vesting arithmetic shared by snapshots, ISO limit splitting and
//! acceleration. Liquidity-event gating is applied on top of this by the
//! calculator.

use chrono::NaiveDate;
use equity_core::dates::days_between;
use equity_core::{EquityResult, Grant, VestingCadence};
use serde::{Deserialize, Serialize};

/// Tolerance for float products that should land on whole shares
const SHARE_EPSILON: f64 = 1e-9;

/// What kind of vesting event a schedule entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VestingEventLabel {
    Cliff,
    Monthly,
    Quarterly,
    Yearly,
    Tranche,
    FullyVested,
}

/// One entry of a vesting schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingEvent {
    /// Date the shares vest
    pub date: NaiveDate,
    /// Shares vesting on this date
    pub shares: f64,
    /// Cumulative vested shares after this event
    pub cumulative_shares: f64,
    pub label: VestingEventLabel,
}

/// Fraction of the grant that vests at the cliff.
///
/// An explicit fraction on the grant wins. Otherwise the fraction is the
/// share of the vesting window elapsed at the cliff; a zero-length window
/// vests everything at the cliff and a cliff on the start date vests nothing.
pub fn cliff_fraction(grant: &Grant) -> f64 {
    if grant.cadence == VestingCadence::Cliff {
        return 1.0;
    }
    if let Some(fraction) = grant.cliff_fraction {
        return fraction;
    }

    let window_days = days_between(grant.vesting_start, grant.vesting_end);
    if window_days <= 0 {
        return 1.0;
    }
    let cliff_days = days_between(grant.vesting_start, grant.cliff_date);
    if cliff_days <= 0 {
        return 0.0;
    }
    cliff_days as f64 / window_days as f64
}

/// Precomputed vesting parameters for one grant
#[derive(Debug, Clone)]
pub struct VestingPlan<'a> {
    grant: &'a Grant,
    cliff_shares: f64,
    period_days: Option<f64>,
    period_count: u32,
    shares_per_period: f64,
}

impl<'a> VestingPlan<'a> {
    pub fn new(grant: &'a Grant) -> EquityResult<Self> {
        grant.validate()?;

        let cliff_shares = (grant.total_shares * cliff_fraction(grant) + SHARE_EPSILON).floor();
        let period_days = grant.cadence.period_length_days();

        let (period_count, shares_per_period) = match period_days {
            Some(period) => {
                let after_cliff = days_between(grant.cliff_date, grant.vesting_end) as f64;
                let count = (after_cliff / period).round() as u32;
                let per_period = if count > 0 {
                    (grant.total_shares - cliff_shares) / count as f64
                } else {
                    0.0
                };
                (count, per_period)
            }
            None => (0, 0.0),
        };

        Ok(Self {
            grant,
            cliff_shares,
            period_days,
            period_count,
            shares_per_period,
        })
    }

    pub fn grant(&self) -> &Grant {
        self.grant
    }

    /// Shares vesting on the cliff date
    pub fn cliff_shares(&self) -> f64 {
        self.cliff_shares
    }

    /// Number of vesting periods after the cliff
    pub fn period_count(&self) -> u32 {
        self.period_count
    }

    pub fn shares_per_period(&self) -> f64 {
        self.shares_per_period
    }

    /// Time-based vested shares on `date`, ignoring liquidity gating.
    pub fn vested_at(&self, date: NaiveDate) -> f64 {
        let grant = self.grant;

        if grant.cadence == VestingCadence::Custom {
            return grant
                .custom_schedule
                .iter()
                .filter(|t| t.date <= date)
                .map(|t| t.shares)
                .sum::<f64>()
                .min(grant.total_shares);
        }

        if date >= grant.vesting_end {
            return grant.total_shares;
        }
        if date < grant.cliff_date {
            return 0.0;
        }

        let period = match self.period_days {
            Some(period) if self.period_count > 0 => period,
            _ => return self.cliff_shares,
        };

        let days_since_cliff = days_between(grant.cliff_date, date) as f64;
        let elapsed = ((days_since_cliff / period).floor() as u32).min(self.period_count);
        let periodic = (elapsed as f64 * self.shares_per_period + SHARE_EPSILON).floor();

        (self.cliff_shares + periodic).min(grant.total_shares)
    }

    /// Date on which post-cliff period `k` vests.
    ///
    /// `ceil` keeps this the first day on which `vested_at` counts the period.
    fn period_date(&self, period: f64, k: u32) -> NaiveDate {
        let offset = (k as f64 * period).ceil() as i64;
        equity_core::dates::add_days(self.grant.cliff_date, offset)
    }

    /// Ordered schedule of dates on which cumulative vested shares increase.
    pub fn events(&self) -> Vec<VestingEvent> {
        let grant = self.grant;

        let mut dates: Vec<NaiveDate> = match grant.cadence {
            VestingCadence::Custom => grant.custom_schedule.iter().map(|t| t.date).collect(),
            _ => {
                let mut dates = vec![grant.cliff_date];
                if let Some(period) = self.period_days {
                    for k in 1..=self.period_count {
                        let date = self.period_date(period, k);
                        if date >= grant.vesting_end {
                            break;
                        }
                        dates.push(date);
                    }
                }
                dates.push(grant.vesting_end);
                dates
            }
        };
        dates.sort();
        dates.dedup();

        let periodic_label = match grant.cadence {
            VestingCadence::Monthly => VestingEventLabel::Monthly,
            VestingCadence::Quarterly => VestingEventLabel::Quarterly,
            VestingCadence::Yearly => VestingEventLabel::Yearly,
            VestingCadence::Cliff => VestingEventLabel::Cliff,
            VestingCadence::Custom => VestingEventLabel::Tranche,
        };

        let mut events = Vec::with_capacity(dates.len());
        let mut previous = 0.0;
        for date in dates {
            let cumulative = self.vested_at(date);
            if cumulative <= previous {
                continue;
            }

            let label = if cumulative >= grant.total_shares {
                VestingEventLabel::FullyVested
            } else if date == grant.cliff_date && grant.cadence != VestingCadence::Custom {
                VestingEventLabel::Cliff
            } else {
                periodic_label
            };

            events.push(VestingEvent {
                date,
                shares: cumulative - previous,
                cumulative_shares: cumulative,
                label,
            });
            previous = cumulative;
        }

        events
    }
}
