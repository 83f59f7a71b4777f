//! Per-attempt success probability and energy formulas
//!
//! All rates are percentage points (10.0 == 10%). Nothing in here keeps state;
//! the simulator threads the running values through.

use rand::Rng;

/// Fixed game-balance divisor turning success probability into energy
pub const ENERGY_DIVISOR: f64 = 2.15;

/// Refine level above which full bonus mode guarantees the contribution
pub const FULL_BONUS_GUARANTEE_LEVEL: u32 = 23;

/// Rates that stay fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateFactors {
    pub base_rate: f64,
    pub bonus_item_rate: f64,
}

/// Linear retry ramp: each failed attempt adds a tenth of the base rate,
/// saturating at the base rate after ten retries.
pub fn retry_bonus(attempt_index: u32, base_rate: f64) -> f64 {
    let retry_count = attempt_index.saturating_sub(1);
    if retry_count > 10 {
        base_rate
    } else {
        retry_count as f64 * base_rate / 10.0
    }
}

/// Extra rate granted by full bonus mode
pub fn full_bonus_contribution(full_bonus_mode: bool, target_refine_level: u32, base_rate: f64) -> f64 {
    if !full_bonus_mode {
        0.0
    } else if target_refine_level > FULL_BONUS_GUARANTEE_LEVEL {
        1.0
    } else {
        base_rate
    }
}

/// Highest probability an attempt can reach for these factors
pub fn max_probability(factors: RateFactors, target_refine_level: u32, full_bonus_mode: bool) -> f64 {
    2.0 * factors.base_rate
        + factors.bonus_item_rate
        + full_bonus_contribution(full_bonus_mode, target_refine_level, factors.base_rate)
}

/// Success probability for the attempt at `attempt_index`.
///
/// A prior probability already above the ceiling is clamped to the ceiling.
pub fn success_probability(
    factors: RateFactors,
    prior_probability: f64,
    attempt_index: u32,
    target_refine_level: u32,
    full_bonus_mode: bool,
) -> f64 {
    let ceiling = max_probability(factors, target_refine_level, full_bonus_mode);
    if prior_probability > ceiling {
        return ceiling;
    }

    factors.base_rate
        + retry_bonus(attempt_index, factors.base_rate)
        + factors.bonus_item_rate
        + full_bonus_contribution(full_bonus_mode, target_refine_level, factors.base_rate)
}

/// Energy gained by failing an attempt at `success_probability`
pub fn energy_gain(success_probability: f64, doubled: bool) -> f64 {
    let gain = success_probability / ENERGY_DIVISOR;
    if doubled {
        gain * 2.0
    } else {
        gain
    }
}

/// Draw a value in [0, 100] with one decimal of precision
pub fn roll(rng: &mut impl Rng) -> f64 {
    (rng.gen::<f64>() * 1001.0).floor() / 10.0
}

/// Roll an attempt: succeeds when the draw lands in the top `success_probability` points
pub fn roll_success(success_probability: f64, rng: &mut impl Rng) -> bool {
    roll(rng) >= 100.0 - success_probability
}
