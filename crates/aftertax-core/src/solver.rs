//! Break-even yield solver.
//!
//! Answers "how much extra annual yield does the alternative need (or how
//! much can it give up) to match the baseline's after-tax terminal value"
//! by bisecting on a yield delta. Bounded bracket growth plus fixed
//! iteration caps guarantee termination; an unreachable target degrades to
//! the cap boundary, never to an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::accounts::{compute_setup_tax, AccountSetup, TaxCalcParams};
use crate::error::AfterTaxError;
use crate::jurisdictions::{self, Jurisdiction};
use crate::types::{with_metadata, ComputationOutput, FilingStatus, Money, Rate};
use crate::AfterTaxResult;

pub const BISECT_MAX_ITERATIONS: u32 = 80;
pub const BISECT_TOLERANCE: Decimal = dec!(0.0001);
pub const GROWTH_START: Decimal = dec!(0.5);
pub const GROWTH_MAX_DOUBLINGS: u32 = 20;
/// Largest modeled yield delta. Hitting it means "no solution in range".
pub const DELTA_CAP: Decimal = dec!(5.0);

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// One side of a break-even comparison: an account in a jurisdiction plus
/// the non-gain calculation inputs. The gain is derived per (rate, years).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub jurisdiction_key: String,
    pub setup_name: String,
    pub filing_status: FilingStatus,
    pub other_income: Money,
    pub principal: Money,
    pub current_age: u32,
    pub is_crypto: bool,
    pub extra_early_penalty_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenRequest {
    pub baseline: ScenarioSpec,
    pub alternative: ScenarioSpec,
}

/// Extra-yield deltas for every (horizon, base return) grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenMatrix {
    pub horizons: Vec<u32>,
    pub base_returns: Vec<Rate>,
    /// `deltas[h][r]` pairs with `horizons[h]` and `base_returns[r]`.
    pub deltas: Vec<Vec<Rate>>,
}

/// A resolved comparison side. `resolve` builds one from a spec through
/// the registry; callers holding a jurisdiction outside the registry (a
/// text-driven one, for instance) construct it directly.
pub struct Scenario<'a> {
    pub jurisdiction: &'a dyn Jurisdiction,
    pub setup: AccountSetup,
    pub spec: &'a ScenarioSpec,
}

pub fn resolve(spec: &ScenarioSpec) -> AfterTaxResult<Scenario<'_>> {
    let jurisdiction = jurisdictions::lookup(&spec.jurisdiction_key)?;
    let setup = jurisdiction
        .account_setups()
        .into_iter()
        .find(|s| s.name == spec.setup_name)
        .ok_or_else(|| AfterTaxError::UnknownAccountSetup {
            jurisdiction: jurisdiction.key().to_string(),
            name: spec.setup_name.clone(),
        })?;
    Ok(Scenario {
        jurisdiction,
        setup,
        spec,
    })
}

// ---------------------------------------------------------------------------
// After-tax terminal value
// ---------------------------------------------------------------------------

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
fn compound(rate: Rate, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    let factor = Decimal::ONE + rate;
    for _ in 0..n {
        result *= factor;
    }
    result
}

/// Terminal value after the setup's total reported tax:
/// `principal × (1+rate)^years − total`.
pub fn after_tax_terminal(scenario: &Scenario<'_>, rate: Rate, years: u32) -> Money {
    let spec = scenario.spec;
    let terminal = spec.principal * compound(rate, years);
    let gain = terminal - spec.principal;
    let params = TaxCalcParams {
        filing_status: spec.filing_status,
        other_income: spec.other_income,
        principal: spec.principal,
        gain,
        holding_years: years,
        current_age: spec.current_age,
        is_crypto: spec.is_crypto,
        extra_early_penalty_rate: spec.extra_early_penalty_rate,
    };
    let outcome = compute_setup_tax(scenario.jurisdiction, &scenario.setup, &params);
    terminal - outcome.total()
}

// ---------------------------------------------------------------------------
// Bisection
// ---------------------------------------------------------------------------

/// Core solve for one (rate, years) cell. Total once the scenarios are
/// resolved: every loop is capped.
pub fn solve_break_even_for(
    baseline: &Scenario<'_>,
    alternative: &Scenario<'_>,
    rate: Rate,
    years: u32,
) -> Rate {
    let target = after_tax_terminal(baseline, rate, years);
    let at_same_rate = after_tax_terminal(alternative, rate, years);

    if at_same_rate >= target {
        // The alternative already wins at the same nominal rate: find how
        // much yield it can give up and still meet the target. The floor
        // is a zero nominal return (delta = -rate).
        let mut lo = -rate;
        let mut hi = Decimal::ZERO;
        if after_tax_terminal(alternative, rate + lo, years) >= target {
            return lo;
        }
        for _ in 0..BISECT_MAX_ITERATIONS {
            let mid = (lo + hi) / dec!(2);
            if after_tax_terminal(alternative, rate + mid, years) >= target {
                hi = mid;
            } else {
                lo = mid;
            }
            if hi - lo <= BISECT_TOLERANCE {
                break;
            }
        }
        return hi;
    }

    // Grow the upper bound until the alternative catches up, then bisect.
    let mut high = GROWTH_START;
    let mut found = after_tax_terminal(alternative, rate + high, years) >= target;
    let mut doublings = 0;
    while !found && doublings < GROWTH_MAX_DOUBLINGS && high < DELTA_CAP {
        high = (high * dec!(2)).min(DELTA_CAP);
        doublings += 1;
        found = after_tax_terminal(alternative, rate + high, years) >= target;
    }
    if !found {
        return DELTA_CAP;
    }

    let mut lo = Decimal::ZERO;
    let mut hi = high;
    for _ in 0..BISECT_MAX_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        if after_tax_terminal(alternative, rate + mid, years) >= target {
            hi = mid;
        } else {
            lo = mid;
        }
        if hi - lo <= BISECT_TOLERANCE {
            break;
        }
    }
    hi
}

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// Extra yield the alternative needs over `rate` (negative: yield it can
/// give up) to match the baseline's after-tax terminal value.
pub fn solve_break_even(
    request: &BreakEvenRequest,
    rate: Rate,
    years: u32,
) -> AfterTaxResult<Rate> {
    if rate <= dec!(-1) {
        return Err(AfterTaxError::InvalidInput {
            field: "rate".into(),
            reason: "base return must be greater than -100%".into(),
        });
    }
    if years == 0 {
        return Err(AfterTaxError::InvalidInput {
            field: "years".into(),
            reason: "horizon must be at least 1 year".into(),
        });
    }
    let baseline = resolve(&request.baseline)?;
    let alternative = resolve(&request.alternative)?;
    Ok(solve_break_even_for(&baseline, &alternative, rate, years))
}

/// Fixed evaluation grid: horizons 1,3,…,49 years.
pub fn horizon_grid() -> Vec<u32> {
    (1..=50).step_by(2).collect()
}

/// Fixed evaluation grid: base returns 1%,3%,…,19%.
pub fn return_grid() -> Vec<Rate> {
    (1..=20i64).step_by(2).map(|p| Decimal::new(p, 2)).collect()
}

/// Evaluates the whole grid. Each cell is independent; an unreachable
/// target reports the cap and a summary warning, not an error.
pub fn break_even_grid(
    request: &BreakEvenRequest,
) -> AfterTaxResult<ComputationOutput<BreakEvenMatrix>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let baseline = resolve(&request.baseline)?;
    let alternative = resolve(&request.alternative)?;

    let horizons = horizon_grid();
    let base_returns = return_grid();
    let mut capped_cells = 0u32;

    let deltas: Vec<Vec<Rate>> = horizons
        .iter()
        .map(|&years| {
            base_returns
                .iter()
                .map(|&rate| {
                    let delta = solve_break_even_for(&baseline, &alternative, rate, years);
                    if delta == DELTA_CAP {
                        capped_cells += 1;
                    }
                    delta
                })
                .collect()
        })
        .collect();

    if capped_cells > 0 {
        warnings.push(format!(
            "{capped_cells} grid cell(s) found no break-even within +{DELTA_CAP}; \
             the cap value means \"no solution in range\""
        ));
    }

    let matrix = BreakEvenMatrix {
        horizons,
        base_returns,
        deltas,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Break-even yield grid (bracketed growth + bisection)",
        &serde_json::json!({
            "baseline": format!("{}/{}", request.baseline.jurisdiction_key, request.baseline.setup_name),
            "alternative": format!("{}/{}", request.alternative.jurisdiction_key, request.alternative.setup_name),
            "bisect_iterations": BISECT_MAX_ITERATIONS,
            "tolerance": BISECT_TOLERANCE.to_string(),
            "delta_cap": DELTA_CAP.to_string(),
        }),
        warnings,
        elapsed,
        matrix,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
