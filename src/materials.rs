//! Material requirements per refine step and market price lookups

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::config::{load_file, SimulationConfig, SlotType, Tier};
use crate::error::SimError;
use crate::stats::{nearest_rank, sorted_attempts, RunOutcome};

/// What one attempt at a given refine level consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefineStep {
    /// Base success rate for this level, in percentage points
    #[serde(default)]
    pub probability: Option<f64>,
    /// Material id -> count per attempt
    #[serde(default)]
    pub materials: BTreeMap<String, f64>,
    /// Extra consumption when the bonus item or full bonus mode is used
    #[serde(default)]
    pub bonus_materials: BTreeMap<String, f64>,
}

/// Static game data: slot -> tier -> refine level -> step.
///
/// ```yaml
/// weapon:
///   t3:
///     15:
///       probability: 15
///       materials: { destruction_stone: 1200, leapstone: 22, gold: 1500 }
///       bonus_materials: { solar_grace: 12 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialTable {
    slots: HashMap<SlotType, HashMap<Tier, BTreeMap<u32, RefineStep>>>,
}

impl MaterialTable {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        load_file(path)
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, slot: SlotType, tier: Tier, level: u32, step: RefineStep) {
        self.slots
            .entry(slot)
            .or_default()
            .entry(tier)
            .or_default()
            .insert(level, step);
    }

    pub fn step(&self, slot: SlotType, tier: Tier, level: u32) -> Result<&RefineStep, SimError> {
        self.slots
            .get(&slot)
            .and_then(|tiers| tiers.get(&tier))
            .and_then(|levels| levels.get(&level))
            .ok_or(SimError::MissingMaterials { slot, tier, level })
    }

    /// Replace the config's base rate with the table's rate for its level.
    ///
    /// Steps without a probability leave the config untouched.
    pub fn apply_base_rate(&self, config: &mut SimulationConfig) -> Result<(), SimError> {
        let step = self.step(config.slot_type, config.tier, config.target_refine_level)?;
        if let Some(probability) = step.probability {
            config.base_success_rate = probability;
        }
        Ok(())
    }
}

/// Current minimum market price per item id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
}

impl PriceTable {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        load_file(path)
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, item: impl Into<String>, price: f64) {
        self.prices.insert(item.into(), price);
    }

    /// Price of `item`; unlisted items cost nothing
    pub fn price(&self, item: &str) -> f64 {
        self.prices.get(item).copied().unwrap_or(0.0)
    }
}

/// Market value of what a single attempt consumes
pub fn attempt_cost(step: &RefineStep, prices: &PriceTable, include_bonus: bool) -> f64 {
    let sum = |materials: &BTreeMap<String, f64>| -> f64 {
        materials
            .iter()
            .map(|(item, count)| count * prices.price(item))
            .sum()
    };

    let mut cost = sum(&step.materials);
    if include_bonus {
        cost += sum(&step.bonus_materials);
    }
    cost
}

/// Cost distribution of a batch, every attempt priced the same
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub cost_per_attempt: f64,
    pub avg_cost: f64,
    pub min_cost: f64,
    pub max_cost: f64,
    pub median_cost: f64,
    pub p90_cost: f64,
}

impl CostSummary {
    pub fn from_outcomes(outcomes: &[RunOutcome], cost_per_attempt: f64) -> Self {
        if outcomes.is_empty() {
            return Self {
                cost_per_attempt,
                ..Default::default()
            };
        }

        let attempts = sorted_attempts(outcomes);
        let cost = |a: u32| f64::from(a) * cost_per_attempt;
        let total: f64 = attempts.iter().map(|&a| cost(a)).sum();

        Self {
            cost_per_attempt,
            avg_cost: total / attempts.len() as f64,
            min_cost: cost(attempts[0]),
            max_cost: cost(attempts[attempts.len() - 1]),
            median_cost: cost(nearest_rank(&attempts, 50.0)),
            p90_cost: cost(nearest_rank(&attempts, 90.0)),
        }
    }
}

/// Price a batch of runs for the configuration that produced it
pub fn estimate_costs(
    table: &MaterialTable,
    prices: &PriceTable,
    config: &SimulationConfig,
    outcomes: &[RunOutcome],
) -> Result<CostSummary, SimError> {
    let step = table.step(config.slot_type, config.tier, config.target_refine_level)?;
    let include_bonus = config.use_bonus_item || config.full_bonus_mode;
    let per_attempt = attempt_cost(step, prices, include_bonus);
    Ok(CostSummary::from_outcomes(outcomes, per_attempt))
}
