//! Account-setup tax state machine.
//!
//! A chosen [`AccountSetup`] decides how a withdrawal is taxed: only the
//! gain (taxable), the whole withdrawal as ordinary income (deferred),
//! nothing (tax-free), or fund-level accrual tax (pension). Every arm ends
//! in the same [`CalcOutcome`] shape so callers can render one breakdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AfterTaxError;
use crate::jurisdictions::{self, Jurisdiction};
use crate::types::{with_metadata, ComputationOutput, FilingStatus, Money, Rate};
use crate::AfterTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Withdrawal-tax treatment of an account wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    /// Gains taxed in the year of disposal; principal was already taxed.
    Taxable,
    /// Contributions pre-tax; the entire withdrawal is ordinary income.
    Deferred,
    /// Contributions post-tax; qualified withdrawals untaxed.
    TaxFree,
    /// Fund taxed on earnings while accruing; withdrawal rules gated by age.
    Pension,
}

/// A named account wrapper offered by a jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSetup {
    pub name: String,
    pub kind: AccountKind,
    /// Free-text fee characteristics, passed through to display layers.
    pub fees_note: String,
    /// Penalty rate on the withdrawal when accessed before `threshold_age`.
    /// For pension funds this is the large modeled non-qualifying penalty.
    pub early_penalty_rate: Rate,
    /// Age at which withdrawals become unrestricted. Zero = no gate.
    pub threshold_age: u32,
}

/// Inputs for one tax calculation. Constructed per call; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalcParams {
    pub filing_status: FilingStatus,
    /// Annual income excluding the gain being assessed.
    pub other_income: Money,
    pub principal: Money,
    pub gain: Money,
    pub holding_years: u32,
    pub current_age: u32,
    pub is_crypto: bool,
    /// Caller-supplied penalty on top of the setup's own early penalty.
    pub extra_early_penalty_rate: Rate,
}

impl TaxCalcParams {
    pub fn withdrawal(&self) -> Money {
        self.principal + self.gain
    }

    /// Age at the end of the holding horizon.
    pub fn age_at_withdrawal(&self) -> u32 {
        self.current_age + self.holding_years
    }
}

/// Final tax breakdown for one (setup, params) calculation.
///
/// `tax_percent` is relative to the gain for taxable and tax-free accounts
/// but relative to the total withdrawal for deferred and pension accounts,
/// whose entire withdrawal is taxed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcOutcome {
    pub tax: Money,
    pub surtax: Money,
    pub penalty: Money,
    pub tax_percent: Rate,
}

impl CalcOutcome {
    pub fn zero() -> Self {
        Self {
            tax: Decimal::ZERO,
            surtax: Decimal::ZERO,
            penalty: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
        }
    }

    /// The single number surfaced as "tax paid".
    pub fn total(&self) -> Money {
        self.tax + self.surtax + self.penalty
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

fn is_early(setup: &AccountSetup, params: &TaxCalcParams) -> bool {
    params.age_at_withdrawal() < setup.threshold_age
}

fn percent_of(total: Money, denominator: Money) -> Rate {
    if denominator > Decimal::ZERO {
        total / denominator
    } else {
        Decimal::ZERO
    }
}

/// Computes the tax outcome for one account setup. Total function once the
/// jurisdiction and setup are resolved.
pub fn compute_setup_tax(
    jurisdiction: &dyn Jurisdiction,
    setup: &AccountSetup,
    params: &TaxCalcParams,
) -> CalcOutcome {
    if let Some(outcome) = jurisdiction.setup_tax_override(setup, params) {
        return outcome;
    }

    let withdrawal = params.withdrawal().max(Decimal::ZERO);
    match setup.kind {
        AccountKind::Taxable => {
            let assessed = jurisdiction.taxable_gain_tax(params);
            CalcOutcome {
                tax: assessed.tax,
                surtax: assessed.surtax,
                penalty: Decimal::ZERO,
                tax_percent: percent_of(assessed.total(), params.gain),
            }
        }
        AccountKind::Deferred => {
            let assessed = jurisdiction.deferred_withdrawal_tax(params);
            let penalty = if is_early(setup, params) {
                withdrawal * (setup.early_penalty_rate + params.extra_early_penalty_rate)
            } else {
                Decimal::ZERO
            };
            CalcOutcome {
                tax: assessed.tax,
                surtax: assessed.surtax,
                penalty,
                tax_percent: percent_of(assessed.total() + penalty, withdrawal),
            }
        }
        AccountKind::TaxFree => {
            let penalty = if is_early(setup, params) {
                withdrawal * params.extra_early_penalty_rate
            } else {
                Decimal::ZERO
            };
            let tax_percent = if penalty > Decimal::ZERO {
                percent_of(penalty, withdrawal)
            } else {
                Decimal::ZERO
            };
            CalcOutcome {
                tax: Decimal::ZERO,
                surtax: Decimal::ZERO,
                penalty,
                tax_percent,
            }
        }
        AccountKind::Pension => {
            let brackets = jurisdiction.brackets(params.filing_status);
            let fund_rate = brackets.config.pension_fund_rate.unwrap_or(Decimal::ZERO);
            let tax = params.gain.max(Decimal::ZERO) * fund_rate;
            let penalty = if is_early(setup, params) {
                withdrawal * setup.early_penalty_rate
            } else {
                Decimal::ZERO
            };
            CalcOutcome {
                tax,
                surtax: Decimal::ZERO,
                penalty,
                tax_percent: percent_of(tax + penalty, withdrawal),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Resolves the jurisdiction and setup by key, validates the parameters,
/// and wraps the outcome in the standard envelope.
pub fn compute_tax(
    jurisdiction_key: &str,
    setup_name: &str,
    params: &TaxCalcParams,
) -> AfterTaxResult<ComputationOutput<CalcOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let jurisdiction = jurisdictions::lookup(jurisdiction_key)?;
    let setup = jurisdiction
        .account_setups()
        .into_iter()
        .find(|s| s.name == setup_name)
        .ok_or_else(|| AfterTaxError::UnknownAccountSetup {
            jurisdiction: jurisdiction.key().to_string(),
            name: setup_name.to_string(),
        })?;

    validate_params(params)?;
    if params.gain < Decimal::ZERO {
        warnings.push("Gain is negative; tax floors at zero and no loss relief is modeled".into());
    }

    let outcome = compute_setup_tax(jurisdiction, &setup, params);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Account-setup tax (jurisdiction rules + withdrawal treatment)",
        &serde_json::json!({
            "jurisdiction": jurisdiction.key(),
            "setup": setup.name,
            "kind": format!("{:?}", setup.kind),
            "filing_status": format!("{:?}", params.filing_status),
            "holding_years": params.holding_years,
            "is_crypto": params.is_crypto,
        }),
        warnings,
        elapsed,
        outcome,
    ))
}

fn validate_params(params: &TaxCalcParams) -> AfterTaxResult<()> {
    if params.principal < Decimal::ZERO {
        return Err(AfterTaxError::InvalidInput {
            field: "principal".into(),
            reason: "principal must be >= 0".into(),
        });
    }
    if params.other_income < Decimal::ZERO {
        return Err(AfterTaxError::InvalidInput {
            field: "other_income".into(),
            reason: "other_income must be >= 0".into(),
        });
    }
    if params.extra_early_penalty_rate < Decimal::ZERO
        || params.extra_early_penalty_rate > Decimal::ONE
    {
        return Err(AfterTaxError::InvalidInput {
            field: "extra_early_penalty_rate".into(),
            reason: "penalty rate must lie in [0, 1]".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn params() -> TaxCalcParams {
        TaxCalcParams {
            filing_status: FilingStatus::Single,
            other_income: dec!(60_000),
            principal: dec!(100_000),
            gain: dec!(50_000),
            holding_years: 10,
            current_age: 55,
            is_crypto: false,
            extra_early_penalty_rate: Decimal::ZERO,
        }
    }

    // ---------------------------------------------------------------
    // 1. Taxable percent is against the gain
    // ---------------------------------------------------------------
    #[test]
    fn test_taxable_percent_against_gain() {
        let result = compute_tax("us", "Brokerage", &params()).unwrap();
        let outcome = result.result;
        assert!(outcome.tax > Decimal::ZERO);
        assert_eq!(outcome.penalty, Decimal::ZERO);
        assert_eq!(outcome.tax_percent, outcome.total() / dec!(50_000));
    }

    // ---------------------------------------------------------------
    // 2. Deferred percent is against the withdrawal
    // ---------------------------------------------------------------
    #[test]
    fn test_deferred_percent_against_withdrawal() {
        let result = compute_tax("us", "Traditional 401(k)", &params()).unwrap();
        let outcome = result.result;
        assert!(outcome.tax > Decimal::ZERO);
        assert_eq!(outcome.tax_percent, outcome.total() / dec!(150_000));
    }

    // ---------------------------------------------------------------
    // 3. Early deferred withdrawal adds the penalty
    // ---------------------------------------------------------------
    #[test]
    fn test_deferred_early_penalty() {
        let mut p = params();
        p.current_age = 40;
        p.holding_years = 5; // withdraws at 45, threshold 60
        let outcome = compute_tax("us", "Traditional 401(k)", &p).unwrap().result;
        assert_eq!(outcome.penalty, dec!(150_000) * dec!(0.10));

        let mut late = params();
        late.current_age = 55;
        late.holding_years = 10; // withdraws at 65
        let outcome = compute_tax("us", "Traditional 401(k)", &late).unwrap().result;
        assert_eq!(outcome.penalty, Decimal::ZERO);
    }

    // ---------------------------------------------------------------
    // 4. Tax-free: zero unless the caller supplies an extra penalty
    // ---------------------------------------------------------------
    #[test]
    fn test_tax_free_zero_without_extra_penalty() {
        let mut p = params();
        p.current_age = 40;
        p.holding_years = 5;
        let outcome = compute_tax("us", "Roth IRA", &p).unwrap().result;
        assert_eq!(outcome, CalcOutcome::zero());

        p.extra_early_penalty_rate = dec!(0.10);
        let outcome = compute_tax("us", "Roth IRA", &p).unwrap().result;
        assert_eq!(outcome.penalty, dec!(150_000) * dec!(0.10));
        assert_eq!(outcome.tax_percent, outcome.penalty / dec!(150_000));
    }

    // ---------------------------------------------------------------
    // 5. Typed not-found errors
    // ---------------------------------------------------------------
    #[test]
    fn test_unknown_jurisdiction() {
        let err = compute_tax("atlantis", "Brokerage", &params()).unwrap_err();
        assert!(matches!(err, AfterTaxError::UnknownJurisdiction(_)));
    }

    #[test]
    fn test_unknown_setup() {
        let err = compute_tax("us", "Offshore Trust", &params()).unwrap_err();
        assert!(matches!(err, AfterTaxError::UnknownAccountSetup { .. }));
    }

    // ---------------------------------------------------------------
    // 6. Validation errors
    // ---------------------------------------------------------------
    #[test]
    fn test_negative_principal_rejected() {
        let mut p = params();
        p.principal = dec!(-1);
        assert!(compute_tax("us", "Brokerage", &p).is_err());
    }

    // ---------------------------------------------------------------
    // 7. Zero gain: taxable percent denominator guard
    // ---------------------------------------------------------------
    #[test]
    fn test_zero_gain_zero_percent() {
        let mut p = params();
        p.gain = Decimal::ZERO;
        let outcome = compute_tax("us", "Brokerage", &p).unwrap().result;
        assert_eq!(outcome.tax_percent, Decimal::ZERO);
    }
}
