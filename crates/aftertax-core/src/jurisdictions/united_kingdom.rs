//! United Kingdom: capital gains fill the remaining basic-rate band
//! (18%/24% for 2024-25) after a £3,000 annual exempt amount; SIPP
//! withdrawals get a 25% tax-free lump sum with the rest at income rates.
//! Personal-allowance taper above £100k is not modeled.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{static_table, AssessedTax, Jurisdiction};
use crate::accounts::{AccountKind, AccountSetup, TaxCalcParams};
use crate::brackets::{BracketTable, Brackets, JurisdictionConfig, TaxBracket};
use crate::types::{Currency, FilingStatus};

pub struct UnitedKingdom;

const CGT_ALLOWANCE: Decimal = dec!(3_000);
const BASIC_RATE_LIMIT: Decimal = dec!(50_270);
/// Portion of a pension withdrawal taxable as income.
const SIPP_TAXABLE_SHARE: Decimal = dec!(0.75);

fn income_table() -> BracketTable {
    static_table(vec![
        TaxBracket::up_to(dec!(12_570), Decimal::ZERO),
        TaxBracket::up_to(BASIC_RATE_LIMIT, dec!(0.20)),
        TaxBracket::up_to(dec!(125_140), dec!(0.40)),
        TaxBracket::top(dec!(0.45)),
    ])
}

/// CGT bands keyed on total income: gains above the basic-rate limit pay
/// the higher rate.
fn cgt_table() -> BracketTable {
    static_table(vec![
        TaxBracket::up_to(BASIC_RATE_LIMIT, dec!(0.18)),
        TaxBracket::top(dec!(0.24)),
    ])
}

impl Jurisdiction for UnitedKingdom {
    fn key(&self) -> &str {
        "uk"
    }

    fn name(&self) -> &str {
        "United Kingdom"
    }

    fn currency(&self) -> Currency {
        Currency::GBP
    }

    fn brackets(&self, _status: FilingStatus) -> Brackets {
        Brackets {
            ordinary: income_table(),
            long_term: Some(cgt_table()),
            // The personal allowance sits inside the table as a 0% bracket.
            standard_deduction: Decimal::ZERO,
            surtax_threshold: None,
            surtax_rate: Decimal::ZERO,
            config: JurisdictionConfig {
                capital_gains_allowance: Some(CGT_ALLOWANCE),
                ..JurisdictionConfig::default()
            },
        }
    }

    /// Band filling approximated on gross income: the gain stacks on top of
    /// `other_income` against the CGT bands.
    fn taxable_gain_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let taxable = (params.gain - CGT_ALLOWANCE).max(Decimal::ZERO);
        AssessedTax::of(cgt_table().incremental(params.other_income, taxable))
    }

    fn deferred_withdrawal_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let taxable_part = params.withdrawal().max(Decimal::ZERO) * SIPP_TAXABLE_SHARE;
        AssessedTax::of(income_table().incremental(params.other_income, taxable_part))
    }

    fn account_setups(&self) -> Vec<AccountSetup> {
        vec![
            AccountSetup {
                name: "General Investment Account".into(),
                kind: AccountKind::Taxable,
                fees_note: "Platform fees around 0.25%-0.45% of assets".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 0,
            },
            AccountSetup {
                name: "SIPP".into(),
                kind: AccountKind::Deferred,
                // Unauthorised access before minimum pension age.
                fees_note: "25% tax-free lump sum at access; relief on contributions".into(),
                early_penalty_rate: dec!(0.55),
                threshold_age: 57,
            },
            AccountSetup {
                name: "Stocks & Shares ISA".into(),
                kind: AccountKind::TaxFree,
                fees_note: "£20,000 annual subscription limit; withdrawals free any time".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 0,
            },
        ]
    }
}
