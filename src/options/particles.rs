use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Particle pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Particles", inline)]
#[serde(default)]
pub struct ParticleOptions {
    /// Fixed pool capacity; spawning beyond it is silently dropped.
    #[schemars(skip)]
    pub max_particles: usize,
}

impl Default for ParticleOptions {
    fn default() -> Self {
        Self {
            max_particles: 1_000_000,
        }
    }
}
