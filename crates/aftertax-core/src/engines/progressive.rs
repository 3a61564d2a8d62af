use rust_decimal::Decimal;

use super::{holding_qualifies, EngineOutcome, GainTaxParams};
use crate::regime::{Regime, RegimeDescriptor};

/// Progressive-bracket engine.
///
/// Short-circuits to a zero-tax outcome on a qualifying long hold with full
/// exemption, or when the gain stays at or below the exemption threshold
/// (threshold semantics: crossing it makes the whole amount taxable).
/// Otherwise walks the bracket table, keeps the per-bracket breakdown, and
/// stacks the configured add-on percentages of the taxable amount.
pub fn calculate(descriptor: &RegimeDescriptor, params: &GainTaxParams) -> EngineOutcome {
    let Regime::Progressive { table } = &descriptor.regime else {
        debug_assert!(
            false,
            "progressive engine routed a non-progressive descriptor"
        );
        return EngineOutcome::zero();
    };

    let amount = params.amount.max(Decimal::ZERO);
    if amount.is_zero() {
        return EngineOutcome::zero();
    }
    if descriptor.full_exemption_after_holding && holding_qualifies(descriptor, params) {
        return EngineOutcome::exempting(amount);
    }
    if let Some(threshold) = descriptor.exemption {
        if amount <= threshold {
            return EngineOutcome::exempting(amount);
        }
    }

    let (tax, breakdown) = table.tax_with_breakdown(amount);
    let add_on_tax = params
        .add_ons
        .iter()
        .map(|a| amount * a.rate)
        .sum();

    EngineOutcome {
        tax,
        add_on_tax,
        exempt_amount: Decimal::ZERO,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brackets::{BracketTable, TaxBracket};
    use crate::engines::AddOnTax;
    use crate::types::Currency;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn descriptor() -> RegimeDescriptor {
        let table = BracketTable::new(vec![
            TaxBracket::up_to(dec!(10_000), dec!(0.10)),
            TaxBracket::top(dec!(0.30)),
        ])
        .unwrap();
        RegimeDescriptor::of(Regime::Progressive { table }, Currency::USD)
    }

    #[test]
    fn test_bracket_walk_with_breakdown() {
        let outcome = calculate(&descriptor(), &GainTaxParams::of_amount(dec!(25_000)));
        // 10_000 * 0.10 + 15_000 * 0.30
        assert_eq!(outcome.tax, dec!(5_500));
        assert_eq!(outcome.breakdown.len(), 2);
        assert_eq!(outcome.breakdown[1].amount, dec!(15_000));
    }

    #[test]
    fn test_threshold_exemption_all_or_nothing() {
        let mut d = descriptor();
        d.exemption = Some(dec!(600));

        let under = calculate(&d, &GainTaxParams::of_amount(dec!(600)));
        assert_eq!(under.tax, Decimal::ZERO);
        assert_eq!(under.exempt_amount, dec!(600));

        // One unit over the threshold taxes the whole amount.
        let over = calculate(&d, &GainTaxParams::of_amount(dec!(601)));
        assert_eq!(over.tax, dec!(601) * dec!(0.10));
        assert_eq!(over.exempt_amount, Decimal::ZERO);
    }

    #[test]
    fn test_full_exemption_on_qualifying_hold() {
        let mut d = descriptor();
        d.holding_period_months = Some(12);
        d.full_exemption_after_holding = true;

        let mut params = GainTaxParams::of_amount(dec!(50_000));
        params.holding_months = Some(18);
        let outcome = calculate(&d, &params);
        assert_eq!(outcome.tax, Decimal::ZERO);
        assert_eq!(outcome.exempt_amount, dec!(50_000));

        params.holding_months = Some(6);
        let outcome = calculate(&d, &params);
        assert!(outcome.tax > Decimal::ZERO);
    }

    #[test]
    fn test_add_ons_are_percent_of_amount() {
        let mut params = GainTaxParams::of_amount(dec!(20_000));
        params.add_ons.push(AddOnTax {
            name: "local levy".into(),
            rate: dec!(0.02),
        });
        let outcome = calculate(&descriptor(), &params);
        assert_eq!(outcome.add_on_tax, dec!(400));
        assert_eq!(outcome.total(), outcome.tax + dec!(400));
    }

    #[test]
    fn test_negative_amount_clamps() {
        let outcome = calculate(&descriptor(), &GainTaxParams::of_amount(dec!(-5_000)));
        assert_eq!(outcome, EngineOutcome::zero());
    }

    #[test]
    #[should_panic(expected = "non-progressive")]
    fn test_mismatched_descriptor_fails_loudly() {
        let d = RegimeDescriptor::of(Regime::Flat { rate: dec!(0.19) }, Currency::USD);
        calculate(&d, &GainTaxParams::of_amount(dec!(1_000)));
    }
}
