use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquityError {
    /// Malformed or out-of-domain input (negative shares, cliff outside window, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A computation path was enabled without the data it needs
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EquityError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EquityError::Validation(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, EquityError::Configuration(_))
    }
}

pub type EquityResult<T> = Result<T, EquityError>;

/// Reject negative, NaN or infinite amounts.
pub fn ensure_non_negative(name: &str, value: f64) -> EquityResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EquityError::Validation(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Reject rates outside [0, 1].
pub fn ensure_unit_interval(name: &str, value: f64) -> EquityResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(EquityError::Validation(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative_guard() {
        assert!(ensure_non_negative("shares", 0.0).is_ok());
        assert!(ensure_non_negative("shares", -1.0).unwrap_err().is_validation());
        assert!(ensure_non_negative("shares", f64::NAN).is_err());
    }

    #[test]
    fn test_unit_interval_guard() {
        assert!(ensure_unit_interval("rate", 0.37).is_ok());
        assert!(ensure_unit_interval("rate", 1.0).is_ok());
        assert!(ensure_unit_interval("rate", 1.01).is_err());
    }
}
