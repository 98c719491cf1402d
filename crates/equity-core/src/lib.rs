//! Equity Core
//!
//! Shared data model and error taxonomy for the vesting, tax, scenario and
//! recommendation crates.

pub mod dates;
pub mod error;
pub mod exit;
pub mod settings;
pub mod types;

pub use error::*;
pub use exit::*;
pub use settings::*;
pub use types::*;
