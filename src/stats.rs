//! Run outcome records and batch summary statistics

use serde::{Deserialize, Serialize};

/// One attempt within a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based, strictly increasing within a run
    pub attempt_index: u32,
    pub success_probability: f64,
    /// Energy before this attempt was made
    pub energy: f64,
    pub prior_probability: f64,
}

/// Results from a single simulated run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Attempts consumed, including the forced one on an energy-cap finish
    pub attempts: u32,
    /// Terminated because the energy gauge filled
    pub is_full_count: bool,
    /// Marks the forced final attempt (false on a natural success)
    pub last_refine: bool,
    pub full_bonus_mode: bool,
    pub records: Vec<AttemptRecord>,
}

/// Aggregated statistics from multiple runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefineStats {
    pub runs: usize,
    pub avg_attempts: f64,
    pub std_attempts: f64,
    pub min_attempts: u32,
    pub max_attempts: u32,
    pub median_attempts: u32,
    pub p90_attempts: u32,
    /// Share of runs that ended on a full energy gauge
    pub full_count_rate: f64,
    /// Share of runs that succeeded before the gauge filled
    pub natural_success_rate: f64,
}

impl RefineStats {
    /// Summarise a batch of outcomes
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self::default();
        }

        let n = outcomes.len() as f64;
        let mut attempts: Vec<u32> = outcomes.iter().map(|o| o.attempts).collect();
        attempts.sort_unstable();

        let avg_attempts = attempts.iter().map(|&a| a as f64).sum::<f64>() / n;
        let variance = attempts
            .iter()
            .map(|&a| (a as f64 - avg_attempts).powi(2))
            .sum::<f64>()
            / n;

        let full_counts = outcomes.iter().filter(|o| o.is_full_count).count();

        Self {
            runs: outcomes.len(),
            avg_attempts,
            std_attempts: variance.sqrt(),
            min_attempts: attempts[0],
            max_attempts: attempts[attempts.len() - 1],
            median_attempts: nearest_rank(&attempts, 50.0),
            p90_attempts: nearest_rank(&attempts, 90.0),
            full_count_rate: full_counts as f64 / n,
            natural_success_rate: (outcomes.len() - full_counts) as f64 / n,
        }
    }
}

/// Sorted attempt counts of a batch, the shape the histogram code wants
pub fn sorted_attempts(outcomes: &[RunOutcome]) -> Vec<u32> {
    let mut attempts: Vec<u32> = outcomes.iter().map(|o| o.attempts).collect();
    attempts.sort_unstable();
    attempts
}

/// Value at `floor(len * percent / 100)`, clamped to the last element
pub(crate) fn nearest_rank<T: Copy>(sorted: &[T], percent: f64) -> T {
    let index = (sorted.len() as f64 * percent / 100.0).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}
