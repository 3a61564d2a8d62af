pub mod error;
pub mod types;

pub mod brackets;
pub mod regime;

pub mod engines;

pub mod accounts;
pub mod jurisdictions;

#[cfg(feature = "classifier")]
pub mod dispatch;

#[cfg(feature = "solver")]
pub mod solver;

pub use error::AfterTaxError;
pub use types::*;

/// Standard result type for all after-tax operations
pub type AfterTaxResult<T> = Result<T, AfterTaxError>;
