//! Error taxonomy for the refine engine

use thiserror::Error;

use crate::config::{SlotType, Tier};

/// Everything the engine can fail with.
#[derive(Debug, Error)]
pub enum SimError {
    /// The caller handed over an inconsistent configuration.
    #[error("invalid configuration: {field} {reason}")]
    Configuration { field: &'static str, reason: String },

    /// A run hit the attempt ceiling without success or a full energy gauge.
    #[error("run did not terminate within {limit} attempts")]
    ExhaustedRetries { limit: u32 },

    #[error("cannot aggregate an empty list of attempt counts")]
    EmptyInput,

    #[error("no material data for {slot:?} {tier:?} +{level}")]
    MissingMaterials { slot: SlotType, tier: Tier, level: u32 },

    #[error("batch cancelled after {completed} runs")]
    Cancelled { completed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl SimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::Configuration {
            field,
            reason: reason.into(),
        }
    }
}
