//! Simulation configuration and loading from YAML/JSON files

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::SimError;

/// Default ceiling on attempts per run before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Energy gauge capacity; reaching it forces the next attempt to succeed
pub const ENERGY_CAP: f64 = 100.0;

/// Slack for float noise when splitting the additional rate into retry steps
const RATE_EPSILON: f64 = 1e-9;

/// Read `path` as JSON when it ends in `.json`, YAML otherwise
pub(crate) fn load_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, SimError> {
    let content = fs::read_to_string(&path)?;
    let path_str = path.as_ref().to_string_lossy().to_lowercase();

    if path_str.ends_with(".json") {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Content generation the refine belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    T3,
    T4,
}

impl Tier {
    /// Refine levels the tier's tables cover
    pub fn level_range(self) -> RangeInclusive<u32> {
        match self {
            Tier::T3 => 12..=25,
            Tier::T4 => 11..=25,
        }
    }
}

// Case-insensitive so hand-written files can say "t3" or "T3"
impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "t3" => Ok(Tier::T3),
            "t4" => Ok(Tier::T4),
            _ => Err(serde::de::Error::unknown_variant(&s, &["t3", "t4", "T3", "T4"])),
        }
    }
}

/// Equipment slot being refined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotType {
    Weapon,
    Armor,
}

impl<'de> Deserialize<'de> for SlotType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "weapon" => Ok(SlotType::Weapon),
            "armor" | "armour" => Ok(SlotType::Armor),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["weapon", "armor", "Weapon", "Armor"],
            )),
        }
    }
}

/// Everything one refine simulation needs to know.
///
/// Field aliases accept the camelCase names the dashboard form posts, e.g.
/// `{ "tier": "T4", "slotType": "weapon", "targetRefineLevel": 15, ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub tier: Tier,
    #[serde(alias = "slotType")]
    pub slot_type: SlotType,
    #[serde(alias = "targetRefineLevel")]
    pub target_refine_level: u32,
    /// Percentage points, 0..=100
    #[serde(alias = "baseSuccessRate")]
    pub base_success_rate: f64,
    /// Rate already accumulated from earlier failures (resumed refine)
    #[serde(default, alias = "additionalSuccessRate")]
    pub additional_success_rate: f64,
    #[serde(default, alias = "startingBonusEnergy")]
    pub starting_bonus_energy: f64,
    #[serde(default, alias = "isArtisanEnergyTwice")]
    pub double_energy: bool,
    #[serde(default, alias = "useBonusItem")]
    pub use_bonus_item: bool,
    #[serde(default, alias = "bonusItemProbability")]
    pub bonus_item_probability: f64,
    #[serde(default, alias = "isFullSoom")]
    pub full_bonus_mode: bool,
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl SimulationConfig {
    /// Minimal config with every optional bonus switched off
    pub fn new(tier: Tier, slot_type: SlotType, target_refine_level: u32, base_success_rate: f64) -> Self {
        Self {
            tier,
            slot_type,
            target_refine_level,
            base_success_rate,
            additional_success_rate: 0.0,
            starting_bonus_energy: 0.0,
            double_energy: false,
            use_bonus_item: false,
            bonus_item_probability: 0.0,
            full_bonus_mode: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Load a configuration from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        load_file(path)
    }

    /// Load from a JSON string (the dashboard form payload)
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Flat success contribution of the bonus item, zero when unused
    pub fn bonus_item_rate(&self) -> f64 {
        if self.use_bonus_item {
            self.bonus_item_probability
        } else {
            0.0
        }
    }

    /// Number of whole retries already "spent" by the accumulated additional rate.
    ///
    /// Each retry adds a tenth of the base rate, so an additional rate of
    /// `k * base / 10` resumes the ramp at retry `k` (at most 10).
    pub fn retry_offset(&self) -> u32 {
        if self.additional_success_rate <= 0.0 || self.base_success_rate <= 0.0 {
            return 0;
        }
        let retries = (self.additional_success_rate * 10.0 / self.base_success_rate + RATE_EPSILON).floor();
        retries.min(10.0) as u32
    }

    /// Part of the additional rate not covered by [retry_offset](Self::retry_offset).
    ///
    /// Added on top of the first attempt only; later attempts have ramped past it.
    pub fn carried_rate(&self) -> f64 {
        if self.additional_success_rate <= 0.0 {
            return 0.0;
        }
        let covered = f64::from(self.retry_offset()) * self.base_success_rate / 10.0;
        let leftover = self.additional_success_rate - covered;
        if leftover > RATE_EPSILON {
            leftover
        } else {
            0.0
        }
    }

    /// Reject configurations the engine cannot simulate meaningfully
    pub fn validate(&self) -> Result<(), SimError> {
        check_percentage("base_success_rate", self.base_success_rate)?;
        check_percentage("additional_success_rate", self.additional_success_rate)?;
        check_percentage("bonus_item_probability", self.bonus_item_probability)?;

        if !self.starting_bonus_energy.is_finite()
            || self.starting_bonus_energy < 0.0
            || self.starting_bonus_energy >= ENERGY_CAP
        {
            return Err(SimError::config(
                "starting_bonus_energy",
                format!("must be in [0, {ENERGY_CAP}) (got {})", self.starting_bonus_energy),
            ));
        }

        if self.additional_success_rate > 0.0 && self.starting_bonus_energy <= 0.0 {
            return Err(SimError::config(
                "additional_success_rate",
                "requires starting_bonus_energy > 0",
            ));
        }

        let levels = self.tier.level_range();
        if !levels.contains(&self.target_refine_level) {
            return Err(SimError::config(
                "target_refine_level",
                format!(
                    "must be between {} and {} for {:?} (got {})",
                    levels.start(),
                    levels.end(),
                    self.tier,
                    self.target_refine_level
                ),
            ));
        }

        if self.max_attempts == 0 {
            return Err(SimError::config("max_attempts", "must be at least 1"));
        }

        Ok(())
    }
}

fn check_percentage(field: &'static str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::config(field, format!("must be in [0, 100] (got {value})")))
    }
}
