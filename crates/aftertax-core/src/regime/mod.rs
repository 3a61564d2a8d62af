pub mod descriptor;

#[cfg(feature = "classifier")]
pub mod classifier;
#[cfg(feature = "classifier")]
pub mod scan;

pub use descriptor::{Regime, RegimeDescriptor, RuleFlag, SpecialKind};

#[cfg(feature = "classifier")]
pub use classifier::classify;
