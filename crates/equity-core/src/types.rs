use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{DAYS_PER_MONTH, DAYS_PER_QUARTER, DAYS_PER_YEAR};
use crate::error::{ensure_non_negative, EquityError, EquityResult};

/// Type of equity grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Incentive stock option - AMT preference at exercise, qualifying dispositions
    Iso,
    /// Non-qualified stock option - ordinary income on the spread at exercise
    Nso,
    /// Restricted stock unit - ordinary income on settlement
    Rsu,
}

impl GrantType {
    pub fn is_option(&self) -> bool {
        matches!(self, GrantType::Iso | GrantType::Nso)
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantType::Iso => write!(f, "ISO"),
            GrantType::Nso => write!(f, "NSO"),
            GrantType::Rsu => write!(f, "RSU"),
        }
    }
}

/// How often shares vest after the cliff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VestingCadence {
    Monthly,
    Quarterly,
    Yearly,
    /// Everything vests on the cliff date
    Cliff,
    /// Explicit tranche list on the grant
    Custom,
}

impl VestingCadence {
    /// Length of one vesting period in days, `None` for cadences without periods.
    pub fn period_length_days(&self) -> Option<f64> {
        match self {
            VestingCadence::Monthly => Some(DAYS_PER_MONTH),
            VestingCadence::Quarterly => Some(DAYS_PER_QUARTER),
            VestingCadence::Yearly => Some(DAYS_PER_YEAR),
            VestingCadence::Cliff | VestingCadence::Custom => None,
        }
    }
}

/// One dated tranche of a custom vesting schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTranche {
    pub date: NaiveDate,
    pub shares: f64,
}

/// An equity grant as supplied by the grant source. Never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Grant identifier
    pub id: String,
    /// ISO / NSO / RSU
    pub grant_type: GrantType,
    /// Total shares granted
    pub total_shares: f64,
    /// Strike price per share (0 for RSUs)
    pub strike_price: f64,
    /// Current fair market value per share
    pub current_fmv: f64,
    /// Date the grant was made (ISO 2-year clock starts here)
    pub grant_date: NaiveDate,
    /// Vesting start date
    pub vesting_start: NaiveDate,
    /// Cliff date, within [vesting_start, vesting_end]
    pub cliff_date: NaiveDate,
    /// Date the grant is fully vested
    pub vesting_end: NaiveDate,
    /// Vesting cadence after the cliff
    pub cadence: VestingCadence,
    /// Tranches for `VestingCadence::Custom`
    #[serde(default)]
    pub custom_schedule: Vec<CustomTranche>,
    /// Explicit cliff fraction overriding the time-proportional default
    #[serde(default)]
    pub cliff_fraction: Option<f64>,
    /// Whether unvested shares may be exercised early
    #[serde(default)]
    pub early_exercise_allowed: bool,
    /// Option expiration date
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    /// Double-trigger RSU: nothing vests before a liquidity event
    #[serde(default)]
    pub liquidity_event_only: bool,
    /// Whether the grant carries an acceleration clause
    #[serde(default)]
    pub accelerated_vesting: bool,
}

impl Grant {
    /// Create a grant with the common fields; optional clauses default off.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        grant_type: GrantType,
        total_shares: f64,
        strike_price: f64,
        current_fmv: f64,
        vesting_start: NaiveDate,
        cliff_date: NaiveDate,
        vesting_end: NaiveDate,
        cadence: VestingCadence,
    ) -> Self {
        Self {
            id: id.into(),
            grant_type,
            total_shares,
            strike_price,
            current_fmv,
            grant_date: vesting_start,
            vesting_start,
            cliff_date,
            vesting_end,
            cadence,
            custom_schedule: Vec::new(),
            cliff_fraction: None,
            early_exercise_allowed: false,
            expiration_date: None,
            liquidity_event_only: false,
            accelerated_vesting: false,
        }
    }

    pub fn with_grant_date(mut self, grant_date: NaiveDate) -> Self {
        self.grant_date = grant_date;
        self
    }

    pub fn with_expiration(mut self, expiration_date: NaiveDate) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    pub fn with_custom_schedule(mut self, tranches: Vec<CustomTranche>) -> Self {
        self.cadence = VestingCadence::Custom;
        self.custom_schedule = tranches;
        self
    }

    pub fn with_cliff_fraction(mut self, fraction: f64) -> Self {
        self.cliff_fraction = Some(fraction);
        self
    }

    pub fn with_early_exercise(mut self) -> Self {
        self.early_exercise_allowed = true;
        self
    }

    pub fn with_liquidity_event_only(mut self) -> Self {
        self.liquidity_event_only = true;
        self
    }

    pub fn with_acceleration(mut self) -> Self {
        self.accelerated_vesting = true;
        self
    }

    /// Spread per share at the current FMV (never negative)
    pub fn current_spread(&self) -> f64 {
        (self.current_fmv - self.strike_price).max(0.0)
    }

    /// Check the numeric and date invariants of the grant.
    pub fn validate(&self) -> EquityResult<()> {
        if !self.total_shares.is_finite() || self.total_shares <= 0.0 {
            return Err(EquityError::Validation(format!(
                "grant {}: total shares must be positive, got {}",
                self.id, self.total_shares
            )));
        }
        ensure_non_negative("strike price", self.strike_price)?;
        ensure_non_negative("current FMV", self.current_fmv)?;

        if self.cliff_date < self.vesting_start || self.cliff_date > self.vesting_end {
            return Err(EquityError::Validation(format!(
                "grant {}: cliff date {} outside vesting window {}..{}",
                self.id, self.cliff_date, self.vesting_start, self.vesting_end
            )));
        }
        if self.grant_date > self.vesting_end {
            return Err(EquityError::Validation(format!(
                "grant {}: grant date {} is after vesting end {}",
                self.id, self.grant_date, self.vesting_end
            )));
        }
        if let Some(fraction) = self.cliff_fraction {
            if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                return Err(EquityError::Validation(format!(
                    "grant {}: cliff fraction must be between 0 and 1, got {}",
                    self.id, fraction
                )));
            }
        }

        if self.cadence == VestingCadence::Custom {
            if self.custom_schedule.is_empty() {
                return Err(EquityError::Configuration(format!(
                    "grant {}: custom cadence requires a tranche schedule",
                    self.id
                )));
            }
            let mut scheduled = 0.0;
            for tranche in &self.custom_schedule {
                ensure_non_negative("custom tranche shares", tranche.shares)?;
                if tranche.date < self.cliff_date || tranche.date > self.vesting_end {
                    return Err(EquityError::Validation(format!(
                        "grant {}: custom tranche on {} outside {}..{}",
                        self.id, tranche.date, self.cliff_date, self.vesting_end
                    )));
                }
                scheduled += tranche.shares;
            }
            if (scheduled - self.total_shares).abs() > 1e-6 {
                return Err(EquityError::Validation(format!(
                    "grant {}: custom schedule covers {} shares, grant has {}",
                    self.id, scheduled, self.total_shares
                )));
            }
        }

        Ok(())
    }
}
