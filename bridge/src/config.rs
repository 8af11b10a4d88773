//! Bridge configuration.

use serde::{Deserialize, Serialize};
use statebridge_primitives::{OptionFlags, StepCost};

/// Configuration shared by every context of a session.
///
/// Missing JSON fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Cost schedule charged by every context.
    pub step_cost: StepCost,

    /// Base options, OR-ed into the options of every context.
    pub options: OptionFlags,
}

impl BridgeConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Configuration parse failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bridge config: {0}")]
    Json(#[from] serde_json::Error),
}
