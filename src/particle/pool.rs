//! Fixed-capacity particle pool with an alive/dead partition.
//!
//! `slots[..living]` are alive, `slots[living..]` are free for reuse.
//! Spawning activates slots at the boundary, dying particles are swapped
//! with the last living one, so both are O(1) per particle and the partition
//! holds after every call.

use glam::{Vec3, Vec4};

use super::{MotionRule, Particle, ParticleInstance};

/// Owns every particle slot the effect will ever use.
pub struct ParticlePool {
    slots: Vec<Particle>,
    /// Also the index of the first dead slot.
    living: usize,
    /// Reused upload staging, sized to capacity up front.
    staging: Vec<ParticleInstance>,
}

impl ParticlePool {
    /// Allocate `capacity` dead slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        log::info!(
            "particle pool: {capacity} slots ({} KiB staging)",
            capacity * size_of::<ParticleInstance>() / 1024
        );
        Self {
            slots: vec![Particle::default(); capacity],
            living: 0,
            staging: Vec::with_capacity(capacity),
        }
    }

    /// Activate up to `count` dead slots with the given attributes.
    ///
    /// Returns how many were spawned: `min(count, dead_count())`. A full
    /// pool silently spawns nothing. `life` is clamped to at least 0 (NaN
    /// counts as 0), `size` and color channels to `[0, 1]`.
    pub fn spawn(
        &mut self,
        count: usize,
        position: Vec3,
        velocity: Vec3,
        life: f32,
        color: Vec4,
        size: f32,
    ) -> usize {
        let spawned = count.min(self.dead_count());
        if spawned < count {
            log::trace!(
                "particle pool full: spawned {spawned} of {count} requested"
            );
        }

        let particle = Particle {
            position,
            velocity,
            // `max` also maps NaN to 0
            life: life.max(0.0),
            color: color.clamp(Vec4::ZERO, Vec4::ONE),
            size: size.clamp(0.0, 1.0),
            camera_distance_sq: 0.0,
        };
        let upper = self.living + spawned;
        self.slots[self.living..upper].fill(particle);
        self.living = upper;

        spawned
    }

    /// Age every living particle by `dt`, remove the dead, move the rest.
    ///
    /// A particle whose life drops below zero is swapped with the last
    /// living particle and the living count shrinks; the swapped-in
    /// particle is examined at the same index before moving on. Survivors
    /// are advanced by `motion` and get their camera distance refreshed.
    ///
    /// Spawn order among living particles is not preserved, so slot indices
    /// are meaningless across calls.
    pub fn update(
        &mut self,
        dt: f32,
        camera_position: Vec3,
        motion: &mut impl MotionRule,
    ) {
        let mut i = 0;
        while i < self.living {
            let p = &mut self.slots[i];
            p.life -= dt;
            if p.life < 0.0 {
                self.living -= 1;
                self.slots.swap(i, self.living);
                // Re-examine i: it now holds the old tail
            } else {
                motion.advance(p, dt);
                p.camera_distance_sq =
                    p.position.distance_squared(camera_position);
                i += 1;
            }
        }
    }

    /// Sort living particles farthest-first and pack them for upload.
    ///
    /// Back-to-front order lets alpha-blended billboards composite without a
    /// depth-sorted pass. The full sort is O(n log n) in living particles
    /// every frame. The returned slice is valid until the next mutation.
    pub fn stage_for_render(&mut self) -> &[ParticleInstance] {
        self.slots[..self.living].sort_unstable_by(|a, b| {
            b.camera_distance_sq.total_cmp(&a.camera_distance_sq)
        });

        self.staging.clear();
        self.staging.extend(
            self.slots[..self.living].iter().map(Particle::to_instance),
        );
        &self.staging
    }

    /// Forget every particle. Slots are not cleared.
    pub fn reset(&mut self) {
        self.living = 0;
    }

    /// The living prefix, in current slot order.
    pub fn alive(&self) -> &[Particle] {
        &self.slots[..self.living]
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of living particles.
    pub fn living_count(&self) -> usize {
        self.living
    }

    /// Number of free slots.
    pub fn dead_count(&self) -> usize {
        self.slots.len() - self.living
    }

    /// Whether no particle is alive.
    pub fn is_empty(&self) -> bool {
        self.living == 0
    }
}
