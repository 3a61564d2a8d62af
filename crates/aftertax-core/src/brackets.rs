use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AfterTaxError;
use crate::types::{Money, Rate};
use crate::AfterTaxResult;

// ---------------------------------------------------------------------------
// Bracket table
// ---------------------------------------------------------------------------

/// One marginal bracket. `upper: None` marks the unbounded top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<Money>,
    pub rate: Rate,
}

impl TaxBracket {
    pub fn up_to(upper: Money, rate: Rate) -> Self {
        Self {
            upper: Some(upper),
            rate,
        }
    }

    /// The unbounded final bracket.
    pub fn top(rate: Rate) -> Self {
        Self { upper: None, rate }
    }
}

/// Ordered marginal brackets. Immutable once constructed; the constructor
/// enforces the shape the evaluation walk relies on, so the hot path carries
/// no runtime checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    /// Validates and builds a table. Upper bounds must be non-negative and
    /// strictly increasing, every rate must lie in [0, 1], and exactly the
    /// final bracket must be unbounded.
    pub fn new(brackets: Vec<TaxBracket>) -> AfterTaxResult<Self> {
        if brackets.is_empty() {
            return Err(AfterTaxError::MalformedBracketTable {
                reason: "table must contain at least one bracket".into(),
            });
        }

        let last = brackets.len() - 1;
        let mut prev: Option<Money> = None;
        for (i, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(AfterTaxError::MalformedBracketTable {
                    reason: format!("rate {} at bracket {} outside [0, 1]", bracket.rate, i),
                });
            }
            match bracket.upper {
                Some(upper) => {
                    if i == last {
                        return Err(AfterTaxError::MalformedBracketTable {
                            reason: "final bracket must be unbounded".into(),
                        });
                    }
                    if upper < Decimal::ZERO {
                        return Err(AfterTaxError::MalformedBracketTable {
                            reason: format!("negative upper bound {} at bracket {}", upper, i),
                        });
                    }
                    if let Some(p) = prev {
                        if upper <= p {
                            return Err(AfterTaxError::MalformedBracketTable {
                                reason: format!(
                                    "upper bounds not strictly increasing at bracket {} ({} after {})",
                                    i, upper, p
                                ),
                            });
                        }
                    }
                    prev = Some(upper);
                }
                None => {
                    if i != last {
                        return Err(AfterTaxError::MalformedBracketTable {
                            reason: format!("unbounded bracket at position {} before the end", i),
                        });
                    }
                }
            }
        }

        Ok(Self { brackets })
    }

    /// Single-rate table.
    pub fn flat(rate: Rate) -> AfterTaxResult<Self> {
        Self::new(vec![TaxBracket::top(rate)])
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Tax on `amount`. Negative amounts clamp to zero. Total function:
    /// always returns a number, never errors.
    pub fn tax_on(&self, amount: Money) -> Money {
        let mut remaining = amount.max(Decimal::ZERO);
        let mut tax = Decimal::ZERO;
        let mut floor = Decimal::ZERO;

        for bracket in &self.brackets {
            let slice = match bracket.upper {
                Some(upper) => (upper - floor).min(remaining),
                None => remaining,
            };
            tax += slice * bracket.rate;
            remaining -= slice;
            if remaining <= Decimal::ZERO {
                break;
            }
            if let Some(upper) = bracket.upper {
                floor = upper;
            }
        }

        tax
    }

    /// Additional tax created by `delta` on top of `base_taxable`.
    ///
    /// Both endpoints clamp to zero independently. A negative base (income
    /// below the standard deduction) absorbs the first part of the delta as
    /// unused headroom instead of being taxed from zero.
    pub fn incremental(&self, base_taxable: Money, delta: Money) -> Money {
        let high = (base_taxable + delta).max(Decimal::ZERO);
        let low = base_taxable.max(Decimal::ZERO);
        self.tax_on(high) - self.tax_on(low)
    }

    /// Same walk as `tax_on` with a per-bracket line for each slice taxed,
    /// for rendering "how was this computed" views.
    pub fn tax_with_breakdown(&self, amount: Money) -> (Money, Vec<BracketLine>) {
        let mut remaining = amount.max(Decimal::ZERO);
        let mut tax = Decimal::ZERO;
        let mut floor = Decimal::ZERO;
        let mut lines = Vec::new();

        for (index, bracket) in self.brackets.iter().enumerate() {
            let slice = match bracket.upper {
                Some(upper) => (upper - floor).min(remaining),
                None => remaining,
            };
            if slice > Decimal::ZERO {
                let slice_tax = slice * bracket.rate;
                lines.push(BracketLine {
                    index,
                    rate: bracket.rate,
                    amount: slice,
                    tax: slice_tax,
                });
                tax += slice_tax;
                remaining -= slice;
            }
            if remaining <= Decimal::ZERO {
                break;
            }
            if let Some(upper) = bracket.upper {
                floor = upper;
            }
        }

        (tax, lines)
    }

    /// Rate applied to the next unit of income above `amount`.
    pub fn marginal_rate(&self, amount: Money) -> Rate {
        let amount = amount.max(Decimal::ZERO);
        for bracket in &self.brackets {
            match bracket.upper {
                Some(upper) if amount < upper => return bracket.rate,
                Some(_) => {}
                None => return bracket.rate,
            }
        }
        // Unreachable for a validated table; the final bracket is unbounded.
        Decimal::ZERO
    }
}

/// One slice of a progressive walk, for explainability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketLine {
    pub index: usize,
    pub rate: Rate,
    pub amount: Money,
    pub tax: Money,
}

// ---------------------------------------------------------------------------
// Per-jurisdiction bracket bundle
// ---------------------------------------------------------------------------

/// Bracket bundle for one (jurisdiction, filing status) pair. Built fresh
/// per query; cheap value object, safe to cache by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brackets {
    pub ordinary: BracketTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term: Option<BracketTable>,
    pub standard_deduction: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surtax_threshold: Option<Money>,
    pub surtax_rate: Rate,
    pub config: JurisdictionConfig,
}

/// Jurisdiction-specific knobs. The field set is heterogeneous across
/// jurisdictions but finite, so named optional fields rather than an open
/// map; a jurisdiction leaves what it does not use as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    /// Fraction of a long-held gain excluded from tax (e.g. 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_gain_discount: Option<Rate>,
    /// Flat levy on capital income (e.g. German Abgeltungsteuer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_capital_rate: Option<Rate>,
    /// Surcharge applied to the computed tax (not to the base amount).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solidarity_rate: Option<Rate>,
    /// All-or-nothing threshold under which crypto gains stay untaxed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_exemption: Option<Money>,
    /// Months after which a crypto disposal is fully exempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_exempt_after_months: Option<u32>,
    /// Annual capital-gains allowance deducted before tax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_gains_allowance: Option<Money>,
    /// Flat tax on fund earnings while accruing (pension-fund accounts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension_fund_rate: Option<Rate>,
    /// Annual levy on held wealth, informational for display layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wealth_tax_rate: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn two_bracket_table() -> BracketTable {
        BracketTable::new(vec![
            TaxBracket::up_to(dec!(50_000), dec!(0.10)),
            TaxBracket::top(dec!(0.20)),
        ])
        .unwrap()
    }

    // ---------------------------------------------------------------
    // 1. Walk accumulates per-bracket slices
    // ---------------------------------------------------------------
    #[test]
    fn test_tax_on_walks_brackets() {
        let table = two_bracket_table();
        // 50_000 * 0.10 + 10_000 * 0.20 = 5_000 + 2_000
        assert_eq!(table.tax_on(dec!(60_000)), dec!(7_000));
    }

    // ---------------------------------------------------------------
    // 2. Exact at the bracket boundary (decimal math, no drift)
    // ---------------------------------------------------------------
    #[test]
    fn test_tax_on_exact_at_boundary() {
        let table = two_bracket_table();
        assert_eq!(table.tax_on(dec!(50_000)), dec!(5_000));
        assert_eq!(table.tax_on(dec!(50_000.01)), dec!(5_000.002));
    }

    // ---------------------------------------------------------------
    // 3. Negative amounts clamp to zero
    // ---------------------------------------------------------------
    #[test]
    fn test_tax_on_clamps_negative() {
        let table = two_bracket_table();
        assert_eq!(table.tax_on(dec!(-10_000)), Decimal::ZERO);
    }

    // ---------------------------------------------------------------
    // 4. Incremental clamps both endpoints independently
    // ---------------------------------------------------------------
    #[test]
    fn test_incremental_clamps_both_endpoints() {
        let table = two_bracket_table();
        // Base of -1000 (unused deduction headroom) with a 5000 delta:
        // only max(0, -1000 + 5000) = 4000 is taxable.
        assert_eq!(table.incremental(dec!(-1_000), dec!(5_000)), dec!(400));
        // The historical bug class: clamping only the base would have
        // taxed the full 5000 at 10% = 500.
        assert_eq!(table.incremental(dec!(-1_000), dec!(5_000)), dec!(4_000) * dec!(0.10));
    }

    // ---------------------------------------------------------------
    // 5. Incremental spans a bracket boundary
    // ---------------------------------------------------------------
    #[test]
    fn test_incremental_across_boundary() {
        let table = two_bracket_table();
        // 40_000 base, 20_000 delta: 10_000 at 10%, 10_000 at 20%.
        assert_eq!(table.incremental(dec!(40_000), dec!(20_000)), dec!(3_000));
    }

    // ---------------------------------------------------------------
    // 6. Breakdown lines sum to the total
    // ---------------------------------------------------------------
    #[test]
    fn test_breakdown_sums_to_total() {
        let table = BracketTable::new(vec![
            TaxBracket::up_to(dec!(11_925), dec!(0.10)),
            TaxBracket::up_to(dec!(48_475), dec!(0.12)),
            TaxBracket::top(dec!(0.22)),
        ])
        .unwrap();

        let (total, lines) = table.tax_with_breakdown(dec!(100_000));
        assert_eq!(lines.len(), 3);
        let sum: Decimal = lines.iter().map(|l| l.tax).sum();
        assert_eq!(sum, total);
        assert_eq!(lines[0].amount, dec!(11_925));
        assert_eq!(lines[2].rate, dec!(0.22));
    }

    // ---------------------------------------------------------------
    // 7. Marginal rate
    // ---------------------------------------------------------------
    #[test]
    fn test_marginal_rate() {
        let table = two_bracket_table();
        assert_eq!(table.marginal_rate(dec!(10_000)), dec!(0.10));
        // At exactly the boundary the next unit falls in the top bracket.
        assert_eq!(table.marginal_rate(dec!(50_000)), dec!(0.20));
    }

    // ---------------------------------------------------------------
    // Validator rejections
    // ---------------------------------------------------------------
    #[test]
    fn test_rejects_empty_table() {
        assert!(BracketTable::new(vec![]).is_err());
    }

    #[test]
    fn test_rejects_non_monotonic_bounds() {
        let result = BracketTable::new(vec![
            TaxBracket::up_to(dec!(50_000), dec!(0.10)),
            TaxBracket::up_to(dec!(40_000), dec!(0.20)),
            TaxBracket::top(dec!(0.30)),
        ]);
        assert!(matches!(
            result,
            Err(AfterTaxError::MalformedBracketTable { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        assert!(BracketTable::flat(dec!(1.5)).is_err());
        assert!(BracketTable::flat(dec!(-0.1)).is_err());
    }

    #[test]
    fn test_rejects_bounded_final_bracket() {
        let result = BracketTable::new(vec![TaxBracket::up_to(dec!(50_000), dec!(0.10))]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unbounded_middle_bracket() {
        let result = BracketTable::new(vec![
            TaxBracket::top(dec!(0.10)),
            TaxBracket::top(dec!(0.20)),
        ]);
        assert!(result.is_err());
    }
}
