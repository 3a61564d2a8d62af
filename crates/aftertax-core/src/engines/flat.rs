use rust_decimal::Decimal;

use super::{holding_qualifies, EngineOutcome, GainTaxParams};
use crate::regime::{Regime, RegimeDescriptor};

/// Flat-rate engine.
///
/// Same holding-period short-circuit as the progressive engine; the
/// exemption here is an allowance (deducted from the amount before the rate
/// applies), and add-ons are independent percentages of the post-exemption
/// amount, summed.
pub fn calculate(descriptor: &RegimeDescriptor, params: &GainTaxParams) -> EngineOutcome {
    let Regime::Flat { rate } = &descriptor.regime else {
        debug_assert!(false, "flat engine routed a non-flat descriptor");
        return EngineOutcome::zero();
    };

    let amount = params.amount.max(Decimal::ZERO);
    if amount.is_zero() {
        return EngineOutcome::zero();
    }
    if descriptor.full_exemption_after_holding && holding_qualifies(descriptor, params) {
        return EngineOutcome::exempting(amount);
    }

    let exemption_used = descriptor
        .exemption
        .map(|e| e.max(Decimal::ZERO).min(amount))
        .unwrap_or(Decimal::ZERO);
    let taxable = amount - exemption_used;

    let tax = taxable * rate;
    let add_on_tax = params.add_ons.iter().map(|a| taxable * a.rate).sum();

    EngineOutcome {
        tax,
        add_on_tax,
        exempt_amount: exemption_used,
        breakdown: Vec::new(),
    }
}
