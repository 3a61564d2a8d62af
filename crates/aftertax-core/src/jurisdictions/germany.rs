//! Germany: flat 25% capital levy plus 5.5% solidarity surcharge for
//! securities; crypto is a private sale taxed at personal income rates,
//! fully exempt after a 12-month hold, with a €600 all-or-nothing
//! threshold. The progressive zones of the income-tax formula are
//! approximated as brackets.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{static_table, AssessedTax, Jurisdiction};
use crate::accounts::{AccountKind, AccountSetup, CalcOutcome, TaxCalcParams};
use crate::brackets::{BracketTable, Brackets, JurisdictionConfig, TaxBracket};
use crate::types::{Currency, FilingStatus};

pub struct Germany;

const SOLIDARITY_RATE: Decimal = dec!(0.055);
const FLAT_CAPITAL_RATE: Decimal = dec!(0.25);
const CRYPTO_EXEMPTION: Decimal = dec!(600);
const CRYPTO_EXEMPT_AFTER_MONTHS: u32 = 12;
/// Modeled clawback of deducted contributions on early Rürup surrender.
const RUERUP_SURRENDER_RATE: Decimal = dec!(0.30);

fn ordinary_table() -> BracketTable {
    static_table(vec![
        TaxBracket::up_to(dec!(12_096), Decimal::ZERO),
        TaxBracket::up_to(dec!(17_443), dec!(0.14)),
        TaxBracket::up_to(dec!(68_480), dec!(0.24)),
        TaxBracket::up_to(dec!(277_825), dec!(0.42)),
        TaxBracket::top(dec!(0.45)),
    ])
}

fn with_solidarity(tax: Decimal) -> AssessedTax {
    AssessedTax {
        tax,
        surtax: tax * SOLIDARITY_RATE,
    }
}

impl Jurisdiction for Germany {
    fn key(&self) -> &str {
        "de"
    }

    fn name(&self) -> &str {
        "Germany"
    }

    fn currency(&self) -> Currency {
        Currency::EUR
    }

    fn brackets(&self, _status: FilingStatus) -> Brackets {
        Brackets {
            ordinary: ordinary_table(),
            long_term: None,
            // The Grundfreibetrag sits inside the table as a 0% bracket.
            standard_deduction: Decimal::ZERO,
            surtax_threshold: None,
            surtax_rate: SOLIDARITY_RATE,
            config: JurisdictionConfig {
                flat_capital_rate: Some(FLAT_CAPITAL_RATE),
                solidarity_rate: Some(SOLIDARITY_RATE),
                crypto_exemption: Some(CRYPTO_EXEMPTION),
                crypto_exempt_after_months: Some(CRYPTO_EXEMPT_AFTER_MONTHS),
                ..JurisdictionConfig::default()
            },
        }
    }

    fn taxable_gain_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let gain = params.gain.max(Decimal::ZERO);
        if gain.is_zero() {
            return AssessedTax::zero();
        }

        if params.is_crypto {
            if params.holding_years * 12 >= CRYPTO_EXEMPT_AFTER_MONTHS {
                return AssessedTax::zero();
            }
            // Freigrenze: crossing the threshold taxes the whole gain.
            if gain <= CRYPTO_EXEMPTION {
                return AssessedTax::zero();
            }
            let tax = ordinary_table().incremental(params.other_income, gain);
            return with_solidarity(tax);
        }

        with_solidarity(gain * FLAT_CAPITAL_RATE)
    }

    fn deferred_withdrawal_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let tax = ordinary_table().incremental(params.other_income, params.withdrawal());
        with_solidarity(tax)
    }

    /// Early Rürup surrender does not fit the standard deferred arm: the
    /// full deferred tax applies plus a clawback of the deducted
    /// contributions.
    fn setup_tax_override(
        &self,
        setup: &AccountSetup,
        params: &TaxCalcParams,
    ) -> Option<CalcOutcome> {
        if setup.name != "Rürup-Rente" {
            return None;
        }
        if params.age_at_withdrawal() >= setup.threshold_age {
            return None;
        }

        let withdrawal = params.withdrawal().max(Decimal::ZERO);
        let assessed = self.deferred_withdrawal_tax(params);
        let penalty = withdrawal * RUERUP_SURRENDER_RATE;
        let total = assessed.total() + penalty;
        Some(CalcOutcome {
            tax: assessed.tax,
            surtax: assessed.surtax,
            penalty,
            tax_percent: if withdrawal > Decimal::ZERO {
                total / withdrawal
            } else {
                Decimal::ZERO
            },
        })
    }

    fn account_setups(&self) -> Vec<AccountSetup> {
        vec![
            AccountSetup {
                name: "Depot".into(),
                kind: AccountKind::Taxable,
                fees_note: "Order fees per trade; no account-level tax wrapper".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 0,
            },
            AccountSetup {
                name: "Rürup-Rente".into(),
                kind: AccountKind::Deferred,
                fees_note: "Basis pension; contributions deductible, annuitized payout".into(),
                early_penalty_rate: Decimal::ZERO,
                threshold_age: 62,
            },
        ]
    }
}
