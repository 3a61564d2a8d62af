//! Australia: progressive resident rates (2024-25), 50% CGT discount after
//! a 12-month hold, 2% Medicare levy on the added taxable amount, and
//! superannuation as a pension-kind fund (15% earnings tax while accruing,
//! tax-free qualifying withdrawal from preservation age).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{static_table, AssessedTax, Jurisdiction};
use crate::accounts::{AccountKind, AccountSetup, TaxCalcParams};
use crate::brackets::{BracketTable, Brackets, JurisdictionConfig, TaxBracket};
use crate::types::{Currency, FilingStatus};

pub struct Australia;

const CGT_DISCOUNT: Decimal = dec!(0.5);
const MEDICARE_LEVY: Decimal = dec!(0.02);
const SUPER_FUND_RATE: Decimal = dec!(0.15);
/// Modeled penalty for accessing preserved super before the age gate.
const SUPER_EARLY_ACCESS_RATE: Decimal = dec!(0.80);

fn ordinary_table() -> BracketTable {
    static_table(vec![
        TaxBracket::up_to(dec!(18_200), Decimal::ZERO),
        TaxBracket::up_to(dec!(45_000), dec!(0.16)),
        TaxBracket::up_to(dec!(135_000), dec!(0.30)),
        TaxBracket::up_to(dec!(190_000), dec!(0.37)),
        TaxBracket::top(dec!(0.45)),
    ])
}

impl Jurisdiction for Australia {
    fn key(&self) -> &str {
        "au"
    }

    fn name(&self) -> &str {
        "Australia"
    }

    fn currency(&self) -> Currency {
        Currency::AUD
    }

    fn brackets(&self, _status: FilingStatus) -> Brackets {
        Brackets {
            ordinary: ordinary_table(),
            long_term: None,
            standard_deduction: Decimal::ZERO,
            surtax_threshold: None,
            surtax_rate: MEDICARE_LEVY,
            config: JurisdictionConfig {
                capital_gain_discount: Some(CGT_DISCOUNT),
                pension_fund_rate: Some(SUPER_FUND_RATE),
                ..JurisdictionConfig::default()
            },
        }
    }

    /// Discounted gain joins assessable income at marginal rates.
    fn taxable_gain_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let gain = params.gain.max(Decimal::ZERO);
        let assessable = if params.holding_years >= 1 {
            gain * (Decimal::ONE - CGT_DISCOUNT)
        } else {
            gain
        };
        AssessedTax {
            tax: ordinary_table().incremental(params.other_income, assessable),
            surtax: assessable * MEDICARE_LEVY,
        }
    }

    fn deferred_withdrawal_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let withdrawal = params.withdrawal().max(Decimal::ZERO);
        AssessedTax {
            tax: ordinary_table().incremental(params.other_income, withdrawal),
            surtax: withdrawal * MEDICARE_LEVY,
        }
    }

    fn account_setups(&self) -> Vec<AccountSetup> {
        vec![
            AccountSetup {
                name: "Personal portfolio".into(),
                kind: AccountKind::Taxable,
                fees_note: "Brokerage per trade; CGT discount after 12 months".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 0,
            },
            AccountSetup {
                name: "Superannuation".into(),
                kind: AccountKind::Pension,
                fees_note: "Concessional contributions capped; 15% earnings tax in fund".into(),
                early_penalty_rate: SUPER_EARLY_ACCESS_RATE,
                threshold_age: 60,
            },
        ]
    }
}
