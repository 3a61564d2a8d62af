//! United States: progressive federal tables with preferential long-term
//! capital-gains rates and the 3.8% net-investment-income surtax.
//! 2025 figures, federal only.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{deferred_ordinary_tax, static_table, AssessedTax, Jurisdiction};
use crate::accounts::{AccountKind, AccountSetup, TaxCalcParams};
use crate::brackets::{BracketTable, Brackets, JurisdictionConfig, TaxBracket};
use crate::types::{Currency, FilingStatus, Money};

pub struct UnitedStates;

fn ordinary_table(status: FilingStatus) -> BracketTable {
    use FilingStatus::*;
    match status {
        Single => static_table(vec![
            TaxBracket::up_to(dec!(11_925), dec!(0.10)),
            TaxBracket::up_to(dec!(48_475), dec!(0.12)),
            TaxBracket::up_to(dec!(103_350), dec!(0.22)),
            TaxBracket::up_to(dec!(197_300), dec!(0.24)),
            TaxBracket::up_to(dec!(250_525), dec!(0.32)),
            TaxBracket::up_to(dec!(626_350), dec!(0.35)),
            TaxBracket::top(dec!(0.37)),
        ]),
        MarriedJoint => static_table(vec![
            TaxBracket::up_to(dec!(23_850), dec!(0.10)),
            TaxBracket::up_to(dec!(96_950), dec!(0.12)),
            TaxBracket::up_to(dec!(206_700), dec!(0.22)),
            TaxBracket::up_to(dec!(394_600), dec!(0.24)),
            TaxBracket::up_to(dec!(501_050), dec!(0.32)),
            TaxBracket::up_to(dec!(751_600), dec!(0.35)),
            TaxBracket::top(dec!(0.37)),
        ]),
        MarriedSeparate => static_table(vec![
            TaxBracket::up_to(dec!(11_925), dec!(0.10)),
            TaxBracket::up_to(dec!(48_475), dec!(0.12)),
            TaxBracket::up_to(dec!(103_350), dec!(0.22)),
            TaxBracket::up_to(dec!(197_300), dec!(0.24)),
            TaxBracket::up_to(dec!(250_525), dec!(0.32)),
            TaxBracket::up_to(dec!(375_800), dec!(0.35)),
            TaxBracket::top(dec!(0.37)),
        ]),
        HeadOfHousehold => static_table(vec![
            TaxBracket::up_to(dec!(17_000), dec!(0.10)),
            TaxBracket::up_to(dec!(64_850), dec!(0.12)),
            TaxBracket::up_to(dec!(103_350), dec!(0.22)),
            TaxBracket::up_to(dec!(197_300), dec!(0.24)),
            TaxBracket::up_to(dec!(250_500), dec!(0.32)),
            TaxBracket::up_to(dec!(626_350), dec!(0.35)),
            TaxBracket::top(dec!(0.37)),
        ]),
    }
}

fn long_term_table(status: FilingStatus) -> BracketTable {
    use FilingStatus::*;
    match status {
        Single => static_table(vec![
            TaxBracket::up_to(dec!(48_350), Decimal::ZERO),
            TaxBracket::up_to(dec!(533_400), dec!(0.15)),
            TaxBracket::top(dec!(0.20)),
        ]),
        MarriedJoint => static_table(vec![
            TaxBracket::up_to(dec!(96_700), Decimal::ZERO),
            TaxBracket::up_to(dec!(600_050), dec!(0.15)),
            TaxBracket::top(dec!(0.20)),
        ]),
        MarriedSeparate => static_table(vec![
            TaxBracket::up_to(dec!(48_350), Decimal::ZERO),
            TaxBracket::up_to(dec!(300_000), dec!(0.15)),
            TaxBracket::top(dec!(0.20)),
        ]),
        HeadOfHousehold => static_table(vec![
            TaxBracket::up_to(dec!(64_750), Decimal::ZERO),
            TaxBracket::up_to(dec!(566_700), dec!(0.15)),
            TaxBracket::top(dec!(0.20)),
        ]),
    }
}

fn standard_deduction(status: FilingStatus) -> Money {
    use FilingStatus::*;
    match status {
        Single | MarriedSeparate => dec!(15_000),
        MarriedJoint => dec!(30_000),
        HeadOfHousehold => dec!(22_500),
    }
}

fn niit_threshold(status: FilingStatus) -> Money {
    use FilingStatus::*;
    match status {
        Single | HeadOfHousehold => dec!(200_000),
        MarriedJoint => dec!(250_000),
        MarriedSeparate => dec!(125_000),
    }
}

impl Jurisdiction for UnitedStates {
    fn key(&self) -> &str {
        "us"
    }

    fn name(&self) -> &str {
        "United States"
    }

    fn currency(&self) -> Currency {
        Currency::USD
    }

    fn brackets(&self, status: FilingStatus) -> Brackets {
        Brackets {
            ordinary: ordinary_table(status),
            long_term: Some(long_term_table(status)),
            standard_deduction: standard_deduction(status),
            surtax_threshold: Some(niit_threshold(status)),
            surtax_rate: dec!(0.038),
            config: JurisdictionConfig::default(),
        }
    }

    /// Crypto is property: the same short/long-term split as securities.
    /// Gains stack on top of taxable income for rate purposes.
    fn taxable_gain_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let brackets = self.brackets(params.filing_status);
        let gain = params.gain.max(Decimal::ZERO);
        let table = if params.holding_years >= 1 {
            brackets.long_term.as_ref().unwrap_or(&brackets.ordinary)
        } else {
            &brackets.ordinary
        };

        let base = params.other_income - brackets.standard_deduction;
        let tax = table.incremental(base, gain);

        let surtax = match brackets.surtax_threshold {
            Some(threshold) => {
                let magi = params.other_income + gain;
                let niit_base = (magi - threshold).max(Decimal::ZERO).min(gain);
                niit_base * brackets.surtax_rate
            }
            None => Decimal::ZERO,
        };

        AssessedTax { tax, surtax }
    }

    fn deferred_withdrawal_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        deferred_ordinary_tax(&self.brackets(params.filing_status), params)
    }

    fn account_setups(&self) -> Vec<AccountSetup> {
        vec![
            AccountSetup {
                name: "Brokerage".into(),
                kind: AccountKind::Taxable,
                fees_note: "Commission-free trading; fund expense ratios apply".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 0,
            },
            AccountSetup {
                name: "Traditional 401(k)".into(),
                kind: AccountKind::Deferred,
                fees_note: "Plan administration fees vary; employer match common".into(),
                early_penalty_rate: dec!(0.10),
                threshold_age: 60,
            },
            AccountSetup {
                name: "Roth IRA".into(),
                kind: AccountKind::TaxFree,
                fees_note: "Qualified distributions tax-free after age 59½".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 60,
            },
        ]
    }
}
