use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::types::{Money, Rate, Stage};

/// ECL horizon in months for a given stage.
///
/// Stage 1 carries a 12-month ECL; Stages 2 and 3 carry lifetime ECL over the
/// full remaining term.
pub fn horizon_months(stage: Stage, remaining_term_months: u32) -> u32 {
    match stage {
        Stage::One => 12,
        Stage::Two | Stage::Three => remaining_term_months,
    }
}

/// Present-value factor 1 / (1 + eir)^(months / 12).
///
/// Equals 1.0 at eir = 0 for any horizon; strictly decreasing in the horizon
/// for eir > 0, so always in (0, 1] for validated inputs.
pub fn discount_factor(eir: Rate, months: u32) -> Decimal {
    if eir.is_zero() || months == 0 {
        return Decimal::ONE;
    }
    let years = Decimal::from(months) / dec!(12);
    Decimal::ONE / (Decimal::ONE + eir).powd(years)
}

/// 12-month loss under a single scenario:
/// scenario_pd × lgd × ead × discount factor.
pub fn scenario_loss(scenario_pd: Rate, lgd: Rate, ead: Money, factor: Decimal) -> Money {
    scenario_pd * lgd * ead * factor
}

/// Lifetime loss under a single scenario: the sum of discounted marginal
/// losses over each year of the remaining term.
///
/// The marginal loss in year t is the probability of surviving to t−1 and
/// defaulting in t, `(1 − pd)^(t−1) × pd`, discounted to the end of the
/// period. A final partial year keeps the full annual PD and is discounted at
/// the actual maturity. Total expected discounted loss is non-decreasing in
/// scenario_pd: the discount weights fall with t while cumulative default
/// probability rises with pd.
pub fn lifetime_loss(
    scenario_pd: Rate,
    lgd: Rate,
    ead: Money,
    eir: Rate,
    term_months: u32,
) -> Money {
    let mut total = Decimal::ZERO;
    let mut survival = Decimal::ONE;
    let mut elapsed = 0u32;
    while elapsed < term_months {
        elapsed = (elapsed + 12).min(term_months);
        let marginal_pd = survival * scenario_pd;
        total += marginal_pd * lgd * ead * discount_factor(eir, elapsed);
        survival *= Decimal::ONE - scenario_pd;
    }
    total
}
