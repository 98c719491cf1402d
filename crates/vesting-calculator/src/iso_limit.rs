//! ISO $100K Limit
//!
//! Only $100,000 of ISO stock (valued at the strike price) may first become
//! exercisable in any calendar year. Shares over the limit are treated as
//! NSOs. The limit is shared by every ISO grant vesting in the same year,
//! with earlier grants consuming it first.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use equity_core::{EquityError, EquityResult, Grant, GrantType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schedule::VestingPlan;

/// Annual ISO exercisability limit in dollars
pub const ISO_ANNUAL_LIMIT: f64 = 100_000.0;

/// One calendar year's slice of a grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoYearTranche {
    pub year: i32,
    /// Shares first vesting in this year
    pub vested_shares: f64,
    /// Vested shares × strike
    pub exercise_value: f64,
    pub iso_shares: f64,
    pub nso_shares: f64,
}

/// Result of splitting one grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoLimitSplit {
    pub grant_id: String,
    pub iso_shares: f64,
    pub nso_shares: f64,
    pub tranches: Vec<IsoYearTranche>,
}

pub(crate) fn split_grant(grant: &Grant) -> EquityResult<IsoLimitSplit> {
    let mut splits = split_grants(std::slice::from_ref(grant))?;
    splits.pop().ok_or_else(|| {
        EquityError::Validation(format!("grant {}: no ISO split produced", grant.id))
    })
}

pub(crate) fn split_grants(grants: &[Grant]) -> EquityResult<Vec<IsoLimitSplit>> {
    for grant in grants {
        if grant.grant_type != GrantType::Iso {
            return Err(EquityError::Validation(format!(
                "grant {}: the $100K limit applies only to ISO grants, got {}",
                grant.id, grant.grant_type
            )));
        }
    }

    // Earlier grants use up the annual limit first
    let mut order: Vec<usize> = (0..grants.len()).collect();
    order.sort_by_key(|&i| grants[i].grant_date);

    let mut remaining_limit: HashMap<i32, f64> = HashMap::new();
    let mut splits: Vec<Option<IsoLimitSplit>> = vec![None; grants.len()];

    for index in order {
        let grant = &grants[index];
        let plan = VestingPlan::new(grant)?;

        let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
        for event in plan.events() {
            *by_year.entry(event.date.year()).or_insert(0.0) += event.shares;
        }

        let mut tranches = Vec::with_capacity(by_year.len());
        let mut iso_total = 0.0;
        let mut nso_total = 0.0;

        for (year, shares) in by_year {
            let exercise_value = shares * grant.strike_price;
            let available = remaining_limit.entry(year).or_insert(ISO_ANNUAL_LIMIT);

            let iso_shares = if grant.strike_price <= 0.0 {
                shares
            } else {
                (*available / grant.strike_price).floor().clamp(0.0, shares)
            };
            *available = (*available - iso_shares * grant.strike_price).max(0.0);

            let nso_shares = shares - iso_shares;
            iso_total += iso_shares;
            nso_total += nso_shares;

            tranches.push(IsoYearTranche {
                year,
                vested_shares: shares,
                exercise_value,
                iso_shares,
                nso_shares,
            });
        }

        debug!(
            grant_id = %grant.id,
            iso_shares = iso_total,
            nso_shares = nso_total,
            "Applied ISO annual limit"
        );

        splits[index] = Some(IsoLimitSplit {
            grant_id: grant.id.clone(),
            iso_shares: iso_total,
            nso_shares: nso_total,
            tranches,
        });
    }

    Ok(splits.into_iter().flatten().collect())
}
