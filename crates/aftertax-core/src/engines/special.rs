use rust_decimal::Decimal;

use super::{EngineOutcome, GainTaxParams};
use crate::regime::{Regime, RegimeDescriptor, SpecialKind};

/// Special-case engine: exempt, banned, threshold-based, conditional, and
/// complex-approximation rules.
pub fn calculate(descriptor: &RegimeDescriptor, params: &GainTaxParams) -> EngineOutcome {
    let Regime::Special { kind } = &descriptor.regime else {
        debug_assert!(false, "special engine routed a non-special descriptor");
        return EngineOutcome::zero();
    };

    let amount = params.amount.max(Decimal::ZERO);
    match kind {
        SpecialKind::Exempt => EngineOutcome::exempting(amount),
        SpecialKind::Banned => EngineOutcome::zero(),
        SpecialKind::ThresholdBased { threshold, rate } => {
            let taxable = (amount - threshold).max(Decimal::ZERO);
            EngineOutcome {
                tax: taxable * rate,
                exempt_amount: amount.min(*threshold).max(Decimal::ZERO),
                ..EngineOutcome::zero()
            }
        }
        SpecialKind::Conditional {
            short_rate,
            long_rate,
            qualifying_months,
        } => {
            let long = params.is_long
                || params
                    .holding_months
                    .is_some_and(|held| held >= *qualifying_months);
            let rate = if long { long_rate } else { short_rate };
            EngineOutcome {
                tax: amount * rate,
                ..EngineOutcome::zero()
            }
        }
        // One approximate rate standing in for unmodeled law.
        SpecialKind::Complex { approx_rate } => EngineOutcome {
            tax: amount * approx_rate,
            ..EngineOutcome::zero()
        },
    }
}
