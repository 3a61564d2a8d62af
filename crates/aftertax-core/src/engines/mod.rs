pub mod flat;
pub mod progressive;
pub mod special;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::brackets::BracketLine;
use crate::regime::{Regime, RegimeDescriptor};
use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Common engine contract
// ---------------------------------------------------------------------------

/// Flat add-on levy stacked on the base calculation (solidarity surcharge,
/// health cess, local tax), each an independent percentage of the taxable
/// amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnTax {
    pub name: String,
    pub rate: Rate,
}

/// Inputs common to every regime engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainTaxParams {
    /// Gain to be taxed.
    pub amount: Money,
    /// Actual holding duration, when the caller knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_months: Option<u32>,
    /// Dispatcher-level override: the hold already qualifies as long.
    pub is_long: bool,
    pub add_ons: Vec<AddOnTax>,
}

impl GainTaxParams {
    pub fn of_amount(amount: Money) -> Self {
        Self {
            amount,
            holding_months: None,
            is_long: false,
            add_ons: Vec::new(),
        }
    }
}

/// Normalized engine result. `breakdown` is only populated by the
/// progressive engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutcome {
    pub tax: Money,
    pub add_on_tax: Money,
    /// Amount that escaped tax through an exemption or qualifying hold.
    pub exempt_amount: Money,
    pub breakdown: Vec<BracketLine>,
}

impl EngineOutcome {
    pub fn zero() -> Self {
        Self {
            tax: Decimal::ZERO,
            add_on_tax: Decimal::ZERO,
            exempt_amount: Decimal::ZERO,
            breakdown: Vec::new(),
        }
    }

    pub fn exempting(amount: Money) -> Self {
        Self {
            exempt_amount: amount.max(Decimal::ZERO),
            ..Self::zero()
        }
    }

    pub fn total(&self) -> Money {
        self.tax + self.add_on_tax
    }

    /// Effective rate for display, relative to the pre-exemption amount.
    pub fn effective_rate(&self, amount: Money) -> Rate {
        if amount <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            self.total() / amount
        }
    }
}

/// Routes a descriptor to its engine. Each engine re-checks the variant and
/// treats a mismatch as a programming-contract violation.
pub fn calculate(descriptor: &RegimeDescriptor, params: &GainTaxParams) -> EngineOutcome {
    match &descriptor.regime {
        Regime::Progressive { .. } => progressive::calculate(descriptor, params),
        Regime::Flat { .. } => flat::calculate(descriptor, params),
        Regime::Special { .. } => special::calculate(descriptor, params),
    }
}

/// Whether the holding period satisfies the descriptor's qualifying
/// duration (or the dispatcher already decided it does).
pub(crate) fn holding_qualifies(descriptor: &RegimeDescriptor, params: &GainTaxParams) -> bool {
    if params.is_long {
        return true;
    }
    match (params.holding_months, descriptor.holding_period_months) {
        (Some(held), Some(required)) => held >= required,
        _ => false,
    }
}
