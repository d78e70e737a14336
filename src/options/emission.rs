use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Start parameters for particles emitted from dissolving fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Emission", inline)]
#[serde(default)]
pub struct EmissionOptions {
    /// Base spawn direction (normalized at sampling time).
    #[schemars(title = "Direction")]
    pub direction: [f32; 3],
    /// Per-axis blend factor toward a random direction (0 = none, 1 = fully
    /// random).
    #[schemars(title = "Randomness")]
    pub randomness: [f32; 3],
    /// Initial speed in world units per second.
    #[schemars(title = "Speed", range(min = 0.0, max = 20.0), extend("step" = 0.1))]
    pub speed: f32,
    /// Base particle life in seconds.
    #[schemars(title = "Life", range(min = 0.1, max = 20.0), extend("step" = 0.1))]
    pub life: f32,
    /// Maximum extra life added uniformly at random.
    #[schemars(title = "Life Randomness", range(min = 0.0, max = 5.0), extend("step" = 0.05))]
    pub life_randomness: f32,
    /// Size of every emitted particle.
    #[schemars(title = "Particle Size", range(min = 0.01, max = 1.0), extend("step" = 0.01))]
    pub particle_size: f32,
    /// Number of precomputed start parameters cycled through per frame.
    #[schemars(skip)]
    pub reservoir_size: usize,
}

impl Default for EmissionOptions {
    fn default() -> Self {
        Self {
            direction: [0.775_614, 0.441_849, -0.450_769],
            randomness: [0.15, 0.15, 0.15],
            speed: 3.5,
            life: 5.0,
            life_randomness: 0.8,
            particle_size: 0.1,
            reservoir_size: 256,
        }
    }
}
