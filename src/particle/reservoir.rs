//! Precomputed start parameters for emitted particles.
//!
//! Drawing fresh random numbers for every emitted pixel (tens of thousands
//! per frame) is wasteful. Instead a small cyclic reservoir is refilled once
//! per frame and each spawn takes the next entry.

use glam::Vec3;
use rand::Rng;

use crate::options::EmissionOptions;

/// Start life and velocity for one particle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpawnParams {
    /// Initial life in seconds.
    pub life: f32,
    /// Initial velocity.
    pub velocity: Vec3,
}

/// Produces start parameters. Any `FnMut() -> SpawnParams` closure is a
/// sampler.
pub trait SpawnSampler {
    /// Draw one set of start parameters.
    fn sample(&mut self) -> SpawnParams;
}

impl<F: FnMut() -> SpawnParams> SpawnSampler for F {
    fn sample(&mut self) -> SpawnParams {
        self()
    }
}

/// Default sampler: a randomized direction around
/// [`EmissionOptions::direction`] and a randomized life.
pub struct RandomSpawnSampler<'a, R: Rng> {
    options: &'a EmissionOptions,
    rng: R,
}

impl<'a, R: Rng> RandomSpawnSampler<'a, R> {
    /// Sampler drawing from `rng` with the given tuning.
    pub fn new(options: &'a EmissionOptions, rng: R) -> Self {
        Self { options, rng }
    }
}

impl<R: Rng> SpawnSampler for RandomSpawnSampler<'_, R> {
    fn sample(&mut self) -> SpawnParams {
        let o = self.options;
        let random_dir = Vec3::new(
            self.rng.random_range(-1.0..=1.0),
            self.rng.random_range(-1.0..=1.0),
            self.rng.random_range(-1.0..=1.0),
        );
        let base = Vec3::from_array(o.direction);
        let t = Vec3::from_array(o.randomness);
        // Per-axis lerp toward the random direction
        let direction = base + (random_dir - base) * t;

        SpawnParams {
            life: o.life + self.rng.random::<f32>() * o.life_randomness,
            velocity: direction.normalize_or_zero() * o.speed,
        }
    }
}

/// Cyclic array of [`SpawnParams`], refreshed once per frame.
pub struct SpawnReservoir {
    entries: Vec<SpawnParams>,
    /// Next entry handed out. Persists across refreshes.
    cursor: usize,
}

impl SpawnReservoir {
    /// Reservoir of `size` entries (at least one), all zeroed until the
    /// first refresh.
    #[must_use]
    pub fn new(size: usize) -> Self {
        if size == 0 {
            log::warn!("spawn reservoir size 0 requested, using 1");
        }
        Self {
            entries: vec![SpawnParams::default(); size.max(1)],
            cursor: 0,
        }
    }

    /// Refill every entry from `sampler`.
    pub fn refresh(&mut self, sampler: &mut impl SpawnSampler) {
        for entry in &mut self.entries {
            *entry = sampler.sample();
        }
    }

    /// Take the next entry, wrapping around at the end.
    pub fn next_params(&mut self) -> SpawnParams {
        let params = self.entries[self.cursor];
        self.cursor = (self.cursor + 1) % self.entries.len();
        params
    }

    /// All entries in storage order.
    pub fn entries(&self) -> &[SpawnParams] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; a reservoir holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn next_params_cycles() {
        let mut reservoir = SpawnReservoir::new(3);
        let mut n = 0.0;
        reservoir.refresh(&mut || {
            n += 1.0;
            SpawnParams {
                life: n,
                velocity: Vec3::ZERO,
            }
        });

        let lives: Vec<f32> =
            (0..7).map(|_| reservoir.next_params().life).collect();
        assert_eq!(lives, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn cursor_survives_refresh() {
        let mut reservoir = SpawnReservoir::new(2);
        reservoir.refresh(&mut || SpawnParams {
            life: 1.0,
            velocity: Vec3::ZERO,
        });
        let _ = reservoir.next_params();
        reservoir.refresh(&mut || SpawnParams {
            life: 2.0,
            velocity: Vec3::X,
        });
        assert_eq!(reservoir.next_params().velocity, Vec3::X);
    }

    #[test]
    fn zero_size_is_clamped() {
        let mut reservoir = SpawnReservoir::new(0);
        assert_eq!(reservoir.len(), 1);
        assert!(!reservoir.is_empty());
        assert_eq!(reservoir.next_params(), SpawnParams::default());
    }

    #[test]
    fn random_sampler_respects_speed_and_life_range() {
        let options = EmissionOptions::default();
        let mut sampler =
            RandomSpawnSampler::new(&options, StdRng::seed_from_u64(7));
        let base = Vec3::from_array(options.direction).normalize();

        for _ in 0..256 {
            let params = sampler.sample();
            assert!((params.velocity.length() - options.speed).abs() < 1e-3);
            assert!(params.life >= options.life);
            assert!(params.life <= options.life + options.life_randomness);
            // 15% randomness keeps the spray close to the base direction
            assert!(params.velocity.normalize().dot(base) > 0.8);
        }
    }

    #[test]
    fn zero_randomness_is_deterministic() {
        let options = EmissionOptions {
            randomness: [0.0; 3],
            life_randomness: 0.0,
            ..Default::default()
        };
        let mut sampler =
            RandomSpawnSampler::new(&options, StdRng::seed_from_u64(1));
        let params = sampler.sample();
        let expected =
            Vec3::from_array(options.direction).normalize() * options.speed;
        assert!(params.velocity.abs_diff_eq(expected, 1e-5));
        assert_eq!(params.life, options.life);
    }
}
