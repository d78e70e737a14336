use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Dissolve threshold animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Dissolve", inline)]
#[serde(default)]
pub struct DissolveOptions {
    /// Threshold advance per second while dissolving.
    #[schemars(title = "Rate", range(min = 0.0, max = 2.0), extend("step" = 0.01))]
    pub rate: f32,
}

impl Default for DissolveOptions {
    fn default() -> Self {
        Self { rate: 0.1 }
    }
}
