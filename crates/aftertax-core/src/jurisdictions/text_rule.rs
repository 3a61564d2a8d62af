//! Jurisdictions whose gains rule exists only as free text.
//!
//! Routes every gains computation through the classifier and the unified
//! dispatcher, so downstream consumers see the same bracket/descriptor
//! shapes a hand-written jurisdiction produces. Which path built the input
//! is invisible to the engines and the account state machine.

use rust_decimal::Decimal;

use super::{AssessedTax, Jurisdiction};
use crate::accounts::{AccountSetup, TaxCalcParams};
use crate::brackets::{BracketTable, Brackets, JurisdictionConfig};
use crate::dispatch::calculate_rule_tax;
use crate::engines::GainTaxParams;
use crate::regime::{classify, Regime};
use crate::types::{Currency, FilingStatus};

pub struct TextRuleJurisdiction {
    key: String,
    name: String,
    currency: Currency,
    rule_text: String,
    /// Ordinary-income table for deferred withdrawals, supplied by the
    /// data source alongside the rule text.
    ordinary: BracketTable,
    setups: Vec<AccountSetup>,
}

impl TextRuleJurisdiction {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
        rule_text: impl Into<String>,
        ordinary: BracketTable,
        setups: Vec<AccountSetup>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            currency,
            rule_text: rule_text.into(),
            ordinary,
            setups,
        }
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }
}

impl Jurisdiction for TextRuleJurisdiction {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn currency(&self) -> Currency {
        self.currency.clone()
    }

    fn brackets(&self, _status: FilingStatus) -> Brackets {
        // A parsed progressive/flat rule surfaces as the gains table.
        let gains_table = match classify(&self.rule_text, self.currency.clone()).regime {
            Regime::Progressive { table } => Some(table),
            Regime::Flat { rate } => BracketTable::flat(rate).ok(),
            Regime::Special { .. } => None,
        };
        Brackets {
            ordinary: self.ordinary.clone(),
            long_term: gains_table,
            standard_deduction: Decimal::ZERO,
            surtax_threshold: None,
            surtax_rate: Decimal::ZERO,
            config: JurisdictionConfig::default(),
        }
    }

    fn taxable_gain_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        let mut gain_params = GainTaxParams::of_amount(params.gain);
        gain_params.holding_months = Some(params.holding_years * 12);
        let result = calculate_rule_tax(
            &self.key,
            &self.rule_text,
            self.currency.clone(),
            &gain_params,
        );
        AssessedTax {
            tax: result.outcome.tax,
            surtax: result.outcome.add_on_tax,
        }
    }

    fn deferred_withdrawal_tax(&self, params: &TaxCalcParams) -> AssessedTax {
        AssessedTax::of(
            self.ordinary
                .incremental(params.other_income, params.withdrawal()),
        )
    }

    fn account_setups(&self) -> Vec<AccountSetup> {
        self.setups.clone()
    }
}
