//! Pluggable per-particle integration step.

use super::Particle;

/// Advances one living particle by `dt` seconds.
///
/// Called by [`ParticlePool::update`](super::ParticlePool::update) for every
/// particle that survived its life decrement, so effects can change
/// kinematics without touching the pool. Any `FnMut(&mut Particle, f32)`
/// closure is a motion rule.
pub trait MotionRule {
    /// Integrate `particle` over `dt`.
    fn advance(&mut self, particle: &mut Particle, dt: f32);
}

impl<F: FnMut(&mut Particle, f32)> MotionRule for F {
    fn advance(&mut self, particle: &mut Particle, dt: f32) {
        self(particle, dt);
    }
}

/// Straight-line motion: `position += velocity * dt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Drift;

impl MotionRule for Drift {
    fn advance(&mut self, particle: &mut Particle, dt: f32) {
        particle.position += particle.velocity * dt;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn drift_integrates_velocity() {
        let mut p = Particle {
            velocity: Vec3::new(1.0, -2.0, 0.5),
            ..Default::default()
        };
        Drift.advance(&mut p, 0.5);
        assert_eq!(p.position, Vec3::new(0.5, -1.0, 0.25));
    }

    #[test]
    fn closures_are_motion_rules() {
        let gravity = Vec3::new(0.0, -9.8, 0.0);
        let mut falling = |p: &mut Particle, dt: f32| {
            p.velocity += gravity * dt;
            p.position += p.velocity * dt;
        };
        let mut p = Particle::default();
        falling.advance(&mut p, 1.0);
        assert_eq!(p.velocity, gravity);
        assert_eq!(p.position, gravity);
    }
}
