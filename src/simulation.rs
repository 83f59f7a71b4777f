//! Core refine simulation engine

use crate::config::{SimulationConfig, ENERGY_CAP};
use crate::error::SimError;
use crate::probability::{
    energy_gain, full_bonus_contribution, max_probability, roll_success, success_probability,
    RateFactors, ENERGY_DIVISOR,
};
use crate::stats::{AttemptRecord, RefineStats, RunOutcome};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};

/// Position of a run in its state machine
#[derive(Debug, Clone, Copy)]
enum RunState {
    Running {
        attempt_index: u32,
        energy: f64,
        prior_probability: f64,
    },
    Terminated {
        attempts: u32,
        forced: bool,
    },
}

/// Run a single simulation with a fresh entropy-seeded RNG
pub fn simulate_run(config: &SimulationConfig) -> Result<RunOutcome, SimError> {
    let mut rng = SmallRng::from_entropy();
    simulate_run_with_rng(config, &mut rng)
}

/// Run a simulation with a specific RNG (for deterministic testing)
pub fn simulate_run_with_rng(config: &SimulationConfig, rng: &mut impl Rng) -> Result<RunOutcome, SimError> {
    config.validate()?;
    simulate_validated(config, rng)
}

/// Attempts a run may take before it is declared stuck.
///
/// Every attempt gains at least `floor_probability / ENERGY_DIVISOR` energy, so a
/// run with a positive floor fills the gauge within a computable number of
/// attempts; the configured `max_attempts` is raised to that bound. Only runs
/// that can never gain energy are cut off at `max_attempts`.
fn attempt_limit(config: &SimulationConfig, factors: RateFactors) -> u32 {
    let floor_probability = factors.base_rate
        + factors.bonus_item_rate
        + full_bonus_contribution(config.full_bonus_mode, config.target_refine_level, factors.base_rate);
    if floor_probability <= 0.0 {
        return config.max_attempts;
    }

    let needed = ((ENERGY_CAP - config.starting_bonus_energy).max(0.0) * ENERGY_DIVISOR / floor_probability).ceil();
    let bound = if needed >= f64::from(u32::MAX - 1) {
        u32::MAX
    } else {
        needed as u32 + 1
    };
    config.max_attempts.max(bound)
}

fn simulate_validated(config: &SimulationConfig, rng: &mut impl Rng) -> Result<RunOutcome, SimError> {
    let factors = RateFactors {
        base_rate: config.base_success_rate,
        bonus_item_rate: config.bonus_item_rate(),
    };
    let retry_offset = config.retry_offset();
    let carried_rate = config.carried_rate();
    let level = config.target_refine_level;
    let full_bonus = config.full_bonus_mode;
    let ceiling = max_probability(factors, level, full_bonus);
    let limit = attempt_limit(config, factors);

    let mut records = Vec::new();
    let mut state = RunState::Running {
        attempt_index: 1,
        energy: config.starting_bonus_energy,
        prior_probability: 0.0,
    };

    loop {
        match state {
            RunState::Running {
                attempt_index,
                energy,
                prior_probability,
            } => {
                if attempt_index > limit {
                    return Err(SimError::ExhaustedRetries { limit });
                }

                let mut probability = success_probability(
                    factors,
                    prior_probability,
                    attempt_index + retry_offset,
                    level,
                    full_bonus,
                );
                if attempt_index == 1 {
                    probability = (probability + carried_rate).min(ceiling);
                }
                let succeeded = roll_success(probability, rng);
                let next_energy = energy + energy_gain(probability, config.double_energy);

                records.push(AttemptRecord {
                    attempt_index,
                    success_probability: probability,
                    energy,
                    prior_probability,
                });

                state = if succeeded {
                    RunState::Terminated {
                        attempts: attempt_index,
                        forced: false,
                    }
                } else if next_energy >= ENERGY_CAP {
                    // Full gauge: the following attempt is guaranteed
                    records.push(AttemptRecord {
                        attempt_index: attempt_index + 1,
                        success_probability: success_probability(
                            factors,
                            probability,
                            attempt_index + 1 + retry_offset,
                            level,
                            full_bonus,
                        ),
                        energy: ENERGY_CAP,
                        prior_probability: probability,
                    });
                    RunState::Terminated {
                        attempts: attempt_index + 1,
                        forced: true,
                    }
                } else {
                    RunState::Running {
                        attempt_index: attempt_index + 1,
                        energy: next_energy,
                        prior_probability: probability,
                    }
                };
            }
            RunState::Terminated { attempts, forced } => {
                log::trace!("run finished after {attempts} attempts (forced: {forced})");
                return Ok(RunOutcome {
                    attempts,
                    is_full_count: forced,
                    last_refine: forced,
                    full_bonus_mode: full_bonus,
                    records,
                });
            }
        }
    }
}

/// Run `count` simulations sequentially with an entropy-seeded RNG
pub fn run_batch(config: &SimulationConfig, count: usize) -> Result<Vec<RunOutcome>, SimError> {
    let mut rng = SmallRng::from_entropy();
    run_batch_with_rng(config, count, &mut rng)
}

/// Run `count` simulations sequentially from a fixed seed
pub fn run_batch_seeded(config: &SimulationConfig, count: usize, seed: u64) -> Result<Vec<RunOutcome>, SimError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    run_batch_with_rng(config, count, &mut rng)
}

/// Run `count` simulations sequentially, drawing from the caller's RNG
pub fn run_batch_with_rng(
    config: &SimulationConfig,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<RunOutcome>, SimError> {
    config.validate()?;
    log::debug!("running {count} refine simulations sequentially");

    (0..count).map(|_| simulate_validated(config, rng)).collect()
}

/// Like [run_batch_with_rng] but stops between runs once `cancel` is set
pub fn run_batch_cancellable(
    config: &SimulationConfig,
    count: usize,
    rng: &mut impl Rng,
    cancel: &AtomicBool,
) -> Result<Vec<RunOutcome>, SimError> {
    config.validate()?;

    let mut outcomes = Vec::with_capacity(count);
    for _ in 0..count {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("batch cancelled after {} runs", outcomes.len());
            return Err(SimError::Cancelled {
                completed: outcomes.len(),
            });
        }
        outcomes.push(simulate_validated(config, rng)?);
    }
    Ok(outcomes)
}

/// Run `count` simulations across a rayon pool.
///
/// With a seed, run `i` draws from `seed + i`, so the output does not depend
/// on how the work is split across threads. Results keep run order.
pub fn run_batch_parallel(
    config: &SimulationConfig,
    count: usize,
    seed: Option<u64>,
) -> Result<Vec<RunOutcome>, SimError> {
    config.validate()?;

    let num_threads = num_cpus::get().max(1);
    log::debug!("running {count} refine simulations on {num_threads} threads");

    let run_all = || -> Result<Vec<RunOutcome>, SimError> {
        let chunk_size = (count / num_threads).max(1);
        (0..count)
            .into_par_iter()
            .with_min_len(chunk_size.min(100))
            .map(|i| {
                let mut rng = match seed {
                    Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => SmallRng::from_entropy(),
                };
                simulate_validated(config, &mut rng)
            })
            .collect()
    };

    match ThreadPoolBuilder::new().num_threads(num_threads).build() {
        Ok(pool) => pool.install(run_all),
        Err(e) => {
            log::warn!("could not build dedicated thread pool ({e}), using the global pool");
            run_all()
        }
    }
}

/// Dispatch to the sequential or parallel runner
pub fn run_simulations(
    config: &SimulationConfig,
    count: usize,
    parallel: bool,
    seed: Option<u64>,
) -> Result<Vec<RunOutcome>, SimError> {
    match (parallel, seed) {
        (true, _) => run_batch_parallel(config, count, seed),
        (false, Some(seed)) => run_batch_seeded(config, count, seed),
        (false, None) => run_batch(config, count),
    }
}

/// Run simulations and return aggregated stats
pub fn run_and_aggregate(
    config: &SimulationConfig,
    count: usize,
    parallel: bool,
    seed: Option<u64>,
) -> Result<RefineStats, SimError> {
    let outcomes = run_simulations(config, count, parallel, seed)?;
    Ok(RefineStats::from_outcomes(&outcomes))
}
