use serde::{Deserialize, Serialize};

use crate::brackets::BracketTable;
use crate::types::{Currency, Money, Rate};

// ---------------------------------------------------------------------------
// Regime descriptor
// ---------------------------------------------------------------------------

/// The shape of a jurisdiction's gains-tax rule. Closed set: every producer
/// (hand-written jurisdiction or text classifier) emits one of these, so the
/// engines never know which path built their input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Progressive { table: BracketTable },
    Flat { rate: Rate },
    Special { kind: SpecialKind },
}

/// Sub-cases of the special engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialKind {
    /// No tax on gains at all.
    Exempt,
    /// Holding the asset is prohibited; nothing to tax.
    Banned,
    /// Only the amount above `threshold` is taxed, at `rate`.
    ThresholdBased { threshold: Money, rate: Rate },
    /// Two flat rates selected by whether the holding period qualifies.
    Conditional {
        short_rate: Rate,
        long_rate: Rate,
        qualifying_months: u32,
    },
    /// One approximate rate standing in for rules too intricate to model.
    Complex { approx_rate: Rate },
}

/// Advisory flags attached by the classifier. Informational only; the
/// engines do not consume them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleFlag {
    MiningTaxedAsIncome,
    StakingTaxedAsIncome,
    WealthTax,
    /// Bracket bounds were approximated from a bare rate range.
    ApproximatedBrackets,
    /// The text resisted classification; the result is a zero-tax stand-in.
    ManualReviewNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeDescriptor {
    pub regime: Regime,
    /// Annual exemption threshold, when the rule names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemption: Option<Money>,
    /// Holding period the rule attaches consequences to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_period_months: Option<u32>,
    /// A qualifying hold wipes the tax entirely (e.g. German private sales).
    pub full_exemption_after_holding: bool,
    pub flags: Vec<RuleFlag>,
    pub currency: Currency,
}

impl RegimeDescriptor {
    /// Bare descriptor around a regime, no exemptions or flags.
    pub fn of(regime: Regime, currency: Currency) -> Self {
        Self {
            regime,
            exemption: None,
            holding_period_months: None,
            full_exemption_after_holding: false,
            flags: Vec::new(),
            currency,
        }
    }

    pub fn has_flag(&self, flag: RuleFlag) -> bool {
        self.flags.contains(&flag)
    }
}
