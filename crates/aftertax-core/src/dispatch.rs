//! Unified tax dispatcher: free rule text in, normalized tax out.
//!
//! Classifies the text, applies the jurisdiction's holding-period treatment
//! when the caller supplies an explicit holding duration, and routes to the
//! matching regime engine. Degraded classifications fall back to a zero-tax
//! outcome with an advisory reason instead of propagating an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::engines::{self, EngineOutcome, GainTaxParams};
use crate::regime::{classify, RegimeDescriptor, RuleFlag};
use crate::types::{Currency, Rate};

// ---------------------------------------------------------------------------
// Holding-period treatment
// ---------------------------------------------------------------------------

/// How a jurisdiction treats a long hold, independent of the rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingTreatment {
    /// A qualifying hold wipes the tax entirely.
    FullExemption { after_months: u32 },
    /// A qualifying hold excludes a fraction of the gain.
    PartialDiscount { after_months: u32, discount: Rate },
    NoEffect,
}

/// Holding-period table for text-driven jurisdictions. Keys are the same
/// lowercase codes the registry uses; unknown keys get no treatment.
pub fn holding_treatment(jurisdiction_key: &str) -> HoldingTreatment {
    match jurisdiction_key.to_ascii_lowercase().as_str() {
        "de" | "germany" | "pt" | "portugal" => HoldingTreatment::FullExemption { after_months: 12 },
        "au" | "australia" => HoldingTreatment::PartialDiscount {
            after_months: 12,
            discount: dec!(0.5),
        },
        _ => HoldingTreatment::NoEffect,
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Result of a text-driven calculation: the normalized outcome, the
/// descriptor that produced it, and any advisory notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTaxOutcome {
    pub outcome: EngineOutcome,
    pub descriptor: RegimeDescriptor,
    pub advisories: Vec<String>,
}

/// Classifies `rule_text` and computes the tax for `params`. Total
/// function: classification failures degrade, they never propagate.
pub fn calculate_rule_tax(
    jurisdiction_key: &str,
    rule_text: &str,
    currency: Currency,
    params: &GainTaxParams,
) -> RuleTaxOutcome {
    let descriptor = classify(rule_text, currency);
    let mut params = params.clone();
    let mut advisories = Vec::new();

    if let Some(held) = params.holding_months {
        match holding_treatment(jurisdiction_key) {
            HoldingTreatment::FullExemption { after_months } if held >= after_months => {
                return RuleTaxOutcome {
                    outcome: EngineOutcome::exempting(params.amount),
                    descriptor,
                    advisories,
                };
            }
            HoldingTreatment::PartialDiscount {
                after_months,
                discount,
            } if held >= after_months => {
                params.is_long = true;
                params.amount = params.amount.max(Decimal::ZERO) * (Decimal::ONE - discount);
            }
            _ => {}
        }
        // The rule text's own qualifying duration still counts.
        if let Some(required) = descriptor.holding_period_months {
            if held >= required {
                params.is_long = true;
            }
        }
    }

    if descriptor.has_flag(RuleFlag::ManualReviewNeeded) {
        advisories.push(format!(
            "rule text for '{jurisdiction_key}' could not be classified; \
             returning zero tax pending manual review"
        ));
        return RuleTaxOutcome {
            outcome: EngineOutcome::zero(),
            descriptor,
            advisories,
        };
    }

    let outcome = engines::calculate(&descriptor, &params);
    RuleTaxOutcome {
        outcome,
        descriptor,
        advisories,
    }
}
