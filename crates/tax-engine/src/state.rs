//! State Tax
//!
//! Single-state or allocation-weighted multi-state tax on the taxable amount.

use equity_core::TaxSettings;

/// Effective state rate: the residence rate, or the allocation-weighted
/// blend when multi-state allocation is enabled. Settings are assumed
/// validated.
pub fn blended_state_rate(settings: &TaxSettings) -> f64 {
    if settings.include_multi_state {
        settings
            .state_allocations
            .iter()
            .map(|a| a.rate * a.percentage / 100.0)
            .sum()
    } else {
        settings.state_rate
    }
}

/// State tax on ordinary income plus taxable capital gain
pub fn state_tax(settings: &TaxSettings, taxable: f64) -> f64 {
    if taxable <= 0.0 {
        return 0.0;
    }
    taxable * blended_state_rate(settings)
}
