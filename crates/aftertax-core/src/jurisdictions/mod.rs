//! Jurisdiction interface and built-in implementations.
//!
//! Each jurisdiction implements one small trait instead of the open-ended
//! per-country module shape: the engines and the account state machine only
//! ever see [`Brackets`] bundles and assessed amounts. The full per-country
//! data set lives with the host application; the built-ins here cover the
//! distinct rule shapes (progressive + preferential long-term, flat levy
//! with crypto carve-out, band-filling CGT, discount + pension fund).

pub mod australia;
pub mod germany;
#[cfg(feature = "classifier")]
pub mod text_rule;
pub mod united_kingdom;
pub mod united_states;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountSetup, CalcOutcome, TaxCalcParams};
use crate::brackets::{BracketTable, Brackets, TaxBracket};
use crate::error::AfterTaxError;
use crate::types::{Currency, FilingStatus, Money};
use crate::AfterTaxResult;

// ---------------------------------------------------------------------------
// Assessed tax
// ---------------------------------------------------------------------------

/// Tax assessed by a jurisdiction-level computation, before account-level
/// penalties are layered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessedTax {
    pub tax: Money,
    pub surtax: Money,
}

impl AssessedTax {
    pub fn zero() -> Self {
        Self {
            tax: Decimal::ZERO,
            surtax: Decimal::ZERO,
        }
    }

    pub fn of(tax: Money) -> Self {
        Self {
            tax,
            surtax: Decimal::ZERO,
        }
    }

    pub fn total(&self) -> Money {
        self.tax + self.surtax
    }
}

// ---------------------------------------------------------------------------
// Jurisdiction trait
// ---------------------------------------------------------------------------

pub trait Jurisdiction: Send + Sync {
    /// Stable lowercase lookup key.
    fn key(&self) -> &str;
    fn name(&self) -> &str;
    fn currency(&self) -> Currency;

    /// Bracket bundle for a filing status. Built per call; cheap value
    /// object, safe to cache by (key, status).
    fn brackets(&self, status: FilingStatus) -> Brackets;

    /// Tax on the gain alone, held in a plain taxable account.
    fn taxable_gain_tax(&self, params: &TaxCalcParams) -> AssessedTax;

    /// Ordinary-income tax on the full withdrawal (principal + gain)
    /// stacked on top of the other income.
    fn deferred_withdrawal_tax(&self, params: &TaxCalcParams) -> AssessedTax;

    /// Whole-setup override for rules that do not fit the standard account
    /// kinds (surrender clawbacks and similar).
    fn setup_tax_override(
        &self,
        _setup: &AccountSetup,
        _params: &TaxCalcParams,
    ) -> Option<CalcOutcome> {
        None
    }

    fn account_setups(&self) -> Vec<AccountSetup>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Resolves a jurisdiction key. Missing keys are a typed error; fallback
/// policy belongs to the caller, never to the core.
pub fn lookup(key: &str) -> AfterTaxResult<&'static dyn Jurisdiction> {
    match key.to_ascii_lowercase().as_str() {
        "us" | "usa" | "united-states" => Ok(&united_states::UnitedStates),
        "de" | "germany" => Ok(&germany::Germany),
        "uk" | "gb" | "united-kingdom" => Ok(&united_kingdom::UnitedKingdom),
        "au" | "australia" => Ok(&australia::Australia),
        other => Err(AfterTaxError::UnknownJurisdiction(other.to_string())),
    }
}

/// All built-in jurisdictions, for enumeration by the host.
pub fn builtin() -> [&'static dyn Jurisdiction; 4] {
    [
        &united_states::UnitedStates,
        &germany::Germany,
        &united_kingdom::UnitedKingdom,
        &australia::Australia,
    ]
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Builds a statically-known-valid table. Panics on a malformed literal,
/// which is a programming error the jurisdiction tests catch.
pub(crate) fn static_table(brackets: Vec<TaxBracket>) -> BracketTable {
    BracketTable::new(brackets).expect("built-in bracket table is valid")
}

/// The standard deferred computation: the whole withdrawal is ordinary
/// income on top of the existing taxable base. Both endpoints of the
/// incremental walk clamp at zero, so income below the deduction absorbs
/// part of the withdrawal untaxed.
pub(crate) fn deferred_ordinary_tax(brackets: &Brackets, params: &TaxCalcParams) -> AssessedTax {
    let base = params.other_income - brackets.standard_deduction;
    AssessedTax::of(brackets.ordinary.incremental(base, params.withdrawal()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_aliases() {
        assert_eq!(lookup("US").unwrap().key(), "us");
        assert_eq!(lookup("germany").unwrap().key(), "de");
        assert_eq!(lookup("gb").unwrap().key(), "uk");
        assert_eq!(lookup("australia").unwrap().key(), "au");
    }

    #[test]
    fn test_lookup_unknown_is_typed_error() {
        let err = lookup("atlantis").err().unwrap();
        assert!(matches!(err, AfterTaxError::UnknownJurisdiction(k) if k == "atlantis"));
    }

    #[test]
    fn test_builtin_tables_are_valid() {
        // brackets() panics on a malformed literal; touching every status
        // for every jurisdiction is the whole test.
        for jurisdiction in builtin() {
            for status in [
                FilingStatus::Single,
                FilingStatus::MarriedJoint,
                FilingStatus::MarriedSeparate,
                FilingStatus::HeadOfHousehold,
            ] {
                let brackets = jurisdiction.brackets(status);
                assert!(!brackets.ordinary.brackets().is_empty());
            }
        }
    }

    #[test]
    fn test_every_builtin_offers_setups() {
        for jurisdiction in builtin() {
            assert!(!jurisdiction.account_setups().is_empty());
        }
    }
}
