//! Sensitivity Grid
//!
//! Net proceeds and ROI across exit multiples × holding periods.

use equity_core::{EquityError, EquityResult, Grant, TaxSettings};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tax_engine::{HoldingTerms, TaxEngine, Transaction};

/// Grid axes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Exit price as a multiple of current FMV
    pub multiples: Vec<f64>,
    /// Years held after exercise; >= 1 gets long-term treatment
    pub holding_years: Vec<f64>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            multiples: vec![0.5, 1.0, 2.0, 3.0, 5.0, 10.0],
            holding_years: vec![0.5, 1.0, 2.0, 3.0, 5.0],
        }
    }
}

impl SensitivityConfig {
    pub fn validate(&self) -> EquityResult<()> {
        if self.multiples.is_empty() || self.holding_years.is_empty() {
            return Err(EquityError::Configuration(
                "sensitivity grid needs at least one multiple and one holding period".into(),
            ));
        }
        if let Some(m) = self.multiples.iter().find(|m| !m.is_finite() || **m < 0.0) {
            return Err(EquityError::Validation(format!(
                "sensitivity multiple must be non-negative, got {}",
                m
            )));
        }
        if let Some(y) = self.holding_years.iter().find(|y| !y.is_finite() || **y < 0.0) {
            return Err(EquityError::Validation(format!(
                "sensitivity holding period must be non-negative, got {}",
                y
            )));
        }
        Ok(())
    }
}

/// One grid cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityCell {
    pub multiple: f64,
    pub holding_years: f64,
    pub sale_price: f64,
    pub net_proceeds: f64,
    pub roi: f64,
}

/// Sweep the grid for `shares` exercised at current FMV. Cells come back in
/// row-major order (multiples outer, holding periods inner).
pub fn sweep(
    tax: &TaxEngine,
    grant: &Grant,
    shares: f64,
    settings: &TaxSettings,
    config: &SensitivityConfig,
) -> EquityResult<Vec<SensitivityCell>> {
    config.validate()?;

    let axes: Vec<(f64, f64)> = config
        .multiples
        .iter()
        .flat_map(|&m| config.holding_years.iter().map(move |&y| (m, y)))
        .collect();

    axes.par_iter()
        .map(|&(multiple, holding_years)| -> EquityResult<SensitivityCell> {
            let sale_price = grant.current_fmv * multiple;
            let tx = Transaction {
                strike_price: grant.strike_price,
                fmv_at_exercise: grant.current_fmv,
                sale_price: Some(sale_price),
                shares,
                holding: HoldingTerms::flag(holding_years >= 1.0),
            };
            let result = tax.compute_tax(grant, &tx, settings)?;

            let cost = grant.strike_price * shares;
            let net_proceeds = sale_price * shares - cost - result.total_tax;
            let roi = if cost > 0.0 { net_proceeds / cost } else { 0.0 };

            Ok(SensitivityCell {
                multiple,
                holding_years,
                sale_price,
                net_proceeds,
                roi,
            })
        })
        .collect()
}
