//! Per-frame orchestration of a dissolve particle effect.
//!
//! [`DissolveEffect`] owns every CPU-side piece (pool, reservoir, scanner,
//! driver, motion rule, RNG) and exposes the frame as a sequence of steps
//! the host interleaves with its own rendering:
//!
//! 1. [`DissolveEffect::begin_frame`] advances the threshold, refreshes the
//!    spawn reservoir, and returns the uniforms for the screen and capture
//!    passes.
//! 2. The host draws the removed band into an
//!    [`OffscreenCapture`](crate::capture::OffscreenCapture) and reads it
//!    back.
//! 3. [`DissolveEffect::emit`] turns the captured frame into particles.
//! 4. [`DissolveEffect::simulate`] ages, moves and prunes particles.
//! 5. [`DissolveEffect::stage`] (or [`DissolveEffect::upload`]) produces the
//!    farthest-first instance data for the billboard draw.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::camera::CameraView;
use crate::capture::CapturedFrame;
use crate::dissolve::{DissolveDriver, DissolveUniform};
use crate::emission::EmissionScanner;
use crate::gpu::orphan_buffer::OrphaningBuffer;
use crate::gpu::render_context::RenderContext;
use crate::options::Options;
use crate::particle::{
    Drift, MotionRule, ParticleInstance, ParticlePool, RandomSpawnSampler,
    SpawnReservoir,
};

/// Uniforms for the two object passes of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePasses {
    /// Main framebuffer pass; `None` once the object is fully dissolved.
    pub screen: Option<DissolveUniform>,
    /// Offscreen capture pass; `None` when nothing was removed this frame,
    /// in which case capture and emission can be skipped.
    pub capture: Option<DissolveUniform>,
}

/// A dissolving object's particle effect.
pub struct DissolveEffect<M: MotionRule = Drift> {
    options: Options,
    pool: ParticlePool,
    reservoir: SpawnReservoir,
    scanner: EmissionScanner,
    driver: DissolveDriver,
    motion: M,
    rng: StdRng,
}

impl DissolveEffect<Drift> {
    /// Effect with straight-line particle motion, seeded from the OS.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self::with_motion(options, Drift)
    }

    /// Deterministic effect for reproducible runs.
    #[must_use]
    pub fn with_seed(options: Options, seed: u64) -> Self {
        let mut effect = Self::new(options);
        effect.rng = StdRng::seed_from_u64(seed);
        effect
    }
}

impl<M: MotionRule> DissolveEffect<M> {
    /// Effect whose particles move by `motion`.
    pub fn with_motion(options: Options, motion: M) -> Self {
        let pool = ParticlePool::new(options.particles.max_particles);
        let reservoir = SpawnReservoir::new(options.emission.reservoir_size);
        let scanner = EmissionScanner::new(&options.emission);
        let driver = DissolveDriver::new(&options.dissolve);
        Self {
            options,
            pool,
            reservoir,
            scanner,
            driver,
            motion,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Begin dissolving.
    pub fn start(&mut self) {
        self.driver.start();
    }

    /// Advance the threshold by `dt` seconds, refresh the spawn reservoir,
    /// and return this frame's pass uniforms.
    pub fn begin_frame(&mut self, dt: f32) -> FramePasses {
        let _ = self.driver.tick(dt);

        let mut sampler =
            RandomSpawnSampler::new(&self.options.emission, &mut self.rng);
        self.reservoir.refresh(&mut sampler);

        FramePasses {
            screen: self.driver.screen_uniform(),
            capture: self
                .driver
                .is_removing()
                .then(|| self.driver.capture_uniform()),
        }
    }

    /// Spawn particles from the captured removed band. Returns how many
    /// were spawned.
    pub fn emit(
        &mut self,
        frame: &CapturedFrame,
        camera: &impl CameraView,
    ) -> usize {
        let inverse = camera.view_projection().inverse();
        self.scanner
            .emit(frame, &inverse, &mut self.reservoir, &mut self.pool)
    }

    /// Age, move and prune particles; refresh their camera distances.
    pub fn simulate(&mut self, dt: f32, camera: &impl CameraView) {
        self.pool.update(dt, camera.position(), &mut self.motion);
    }

    /// Living particles packed farthest-first.
    pub fn stage(&mut self) -> &[ParticleInstance] {
        self.pool.stage_for_render()
    }

    /// Stage and upload into `buffer`, orphaning its previous storage.
    /// Returns the instance count for the draw call.
    pub fn upload(
        &mut self,
        context: &RenderContext,
        buffer: &mut OrphaningBuffer,
    ) -> u32 {
        let instances = self.pool.stage_for_render();
        let _ =
            buffer.orphan_and_upload(&context.device, &context.queue, instances);
        instances.len() as u32
    }

    /// Drop every particle and rearm the driver. Calling twice is the same
    /// as calling once.
    pub fn reset(&mut self) {
        self.pool.reset();
        self.driver.rearm();
    }

    /// Apply new tuning. Pool capacity is fixed at construction, so
    /// `particles.max_particles` only takes effect on a new effect. Changed
    /// emission settings refill the spawn reservoir right away.
    pub fn set_options(&mut self, options: Options) {
        if options.particles != self.options.particles {
            log::warn!("pool capacity changes require a new effect");
        }
        // The reservoir never holds fewer than one entry
        let size = options.emission.reservoir_size.max(1);
        let resized = size != self.reservoir.len();
        if resized {
            self.reservoir = SpawnReservoir::new(size);
        }
        if resized || options.emission != self.options.emission {
            let mut sampler =
                RandomSpawnSampler::new(&options.emission, &mut self.rng);
            self.reservoir.refresh(&mut sampler);
        }
        self.scanner.set_particle_size(options.emission.particle_size);
        self.driver.set_rate(options.dissolve.rate);
        self.options = options;
    }

    /// Current tuning.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The particle pool.
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// The threshold driver.
    pub fn driver(&self) -> &DissolveDriver {
        &self.driver
    }

    /// Mutable access to the threshold driver, e.g. for
    /// [`DissolveDriver::set_threshold`].
    pub fn driver_mut(&mut self) -> &mut DissolveDriver {
        &mut self.driver
    }

    /// The motion rule.
    pub fn motion_mut(&mut self) -> &mut M {
        &mut self.motion
    }
}
