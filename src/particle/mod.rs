//! Particle storage and lifecycle.
//!
//! A [`ParticlePool`] owns a fixed array of [`Particle`] slots split into a
//! living prefix and a free suffix. Particles are identified only by their
//! current slot, which changes whenever another particle dies, so callers
//! never hold on to indices across an update.

mod instance;
mod motion;
mod pool;
mod reservoir;

use glam::{Vec3, Vec4};
pub use instance::ParticleInstance;
pub use motion::{Drift, MotionRule};
pub use pool::ParticlePool;
pub use reservoir::{
    RandomSpawnSampler, SpawnParams, SpawnReservoir, SpawnSampler,
};

/// One simulated particle.
///
/// Slots are reused, never individually allocated; a particle's lifetime is
/// bounded by its `life` counter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// World-space position.
    pub position: Vec3,
    /// World-space velocity in units per second.
    pub velocity: Vec3,
    /// Remaining life in seconds. The particle dies once this drops below 0.
    pub life: f32,
    /// Linear RGBA color, each channel in `[0, 1]`.
    pub color: Vec4,
    /// Billboard size in world units.
    pub size: f32,
    /// Squared distance to the camera, refreshed every update.
    pub camera_distance_sq: f32,
}

impl Particle {
    /// Pack the render-relevant fields into the GPU upload format.
    #[must_use]
    pub fn to_instance(&self) -> ParticleInstance {
        ParticleInstance::new(self.position, self.size, self.color)
    }
}
