//! Headless dissolve demo.
//!
//! Usage: `dissolve-fx [options.toml]`. A missing options file is created
//! with the defaults. The demo checks the GPU capture/readback path when an
//! adapter is available, then dissolves a synthetic object on the CPU and
//! logs the particle counts. Run with `RUST_LOG=info` (or `debug` for
//! per-frame emission stats).

use std::path::Path;

use dissolve_fx::camera::{Camera, CameraView};
use dissolve_fx::capture::{CapturedFrame, OffscreenCapture};
use dissolve_fx::effect::DissolveEffect;
use dissolve_fx::error::DissolveError;
use dissolve_fx::gpu::orphan_buffer::OrphaningBuffer;
use dissolve_fx::gpu::render_context::RenderContext;
use dissolve_fx::options::Options;
use dissolve_fx::particle::ParticleInstance;
use dissolve_fx::util::frame_timing::FrameTiming;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const DT: f32 = 1.0 / 60.0;
const MAX_FRAMES: u32 = 2000;

/// Stand-in for the scene's object: a per-pixel dissolve noise value and a
/// fixed depth for every covered pixel.
struct SyntheticObject {
    noise: Vec<Option<f32>>,
    stored_depth: f32,
}

impl SyntheticObject {
    /// A disc covering the middle of the frame, centered on the camera
    /// target.
    fn new(camera: &Camera, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (cx, cy) = (WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0);
        let radius = HEIGHT as f32 * 0.4;
        let noise = (0..WIDTH * HEIGHT)
            .map(|i| {
                let x = (i % WIDTH) as f32 - cx;
                let y = (i / WIDTH) as f32 - cy;
                let covered = x * x + y * y <= radius * radius;
                covered.then(|| rng.random::<f32>())
            })
            .collect();

        let clip = camera.view_projection() * camera.target.extend(1.0);
        let ndc_z = clip.z / clip.w;
        Self {
            noise,
            stored_depth: ndc_z.max(0.0).sqrt(),
        }
    }

    /// What the capture pass would produce: every covered pixel whose noise
    /// falls in `[lower, upper)`.
    fn render_band(&self, frame: &mut CapturedFrame, lower: f32, upper: f32) {
        *frame = CapturedFrame::blank(WIDTH, HEIGHT);
        for (i, noise) in self.noise.iter().enumerate() {
            if let Some(n) = *noise {
                if (lower..upper).contains(&n) {
                    let shade = (64.0 + n * 191.0) as u8;
                    let rgba = [shade, shade / 2, 255 - shade, 255];
                    frame.set_pixel(i, rgba, self.stored_depth);
                }
            }
        }
    }
}

/// Run one capture round-trip on the GPU and upload staged particles.
fn check_gpu_path(
    context: &RenderContext,
    effect: &mut DissolveEffect,
) -> Result<(), DissolveError> {
    let mut capture =
        OffscreenCapture::new(&context.device, context.width, context.height)?;

    let mut encoder = context.create_encoder();
    // Nothing drawn: the readback must come back as pure background
    OffscreenCapture::unbind(capture.bind(&mut encoder));
    capture.request_transfer(context, encoder)?;
    let frame = capture.read_frame(&context.device)?;

    let camera = demo_camera(effect.options());
    let spawned = effect.emit(frame, &camera);
    log::info!(
        "gpu capture {}x{} read back, {spawned} particles from an empty frame",
        frame.width(),
        frame.height()
    );

    let mut instances = OrphaningBuffer::new(
        &context.device,
        "Particle Instance Buffer",
        effect.options().particles.max_particles.min(65_536)
            * size_of::<ParticleInstance>(),
        wgpu::BufferUsages::VERTEX,
    );
    let count = effect.upload(context, &mut instances);
    log::info!(
        "uploaded {count} instances ({} byte buffer)",
        instances.capacity()
    );
    Ok(())
}

fn demo_camera(options: &Options) -> Camera {
    Camera::new(
        Vec3::new(0.0, 1.5, 6.0),
        Vec3::ZERO,
        WIDTH as f32 / HEIGHT as f32,
        &options.camera,
    )
}

fn run(options: Options) -> Result<(), DissolveError> {
    let mut effect = DissolveEffect::with_seed(options, 0x5eed);

    match pollster::block_on(RenderContext::headless(WIDTH, HEIGHT)) {
        Ok(context) => check_gpu_path(&context, &mut effect)?,
        Err(e) => log::warn!("skipping GPU capture check: {e}"),
    }

    let camera = demo_camera(effect.options());
    let object = SyntheticObject::new(&camera, 7);
    let mut frame = CapturedFrame::blank(WIDTH, HEIGHT);
    let mut timing = FrameTiming::new(0);
    let mut peak = 0;

    effect.start();
    for frame_index in 0..MAX_FRAMES {
        let passes = effect.begin_frame(DT);
        if let Some(band) = passes.capture {
            object.render_band(&mut frame, band.lower_bound, band.threshold);
            let _ = effect.emit(&frame, &camera);
        }
        effect.simulate(DT, &camera);
        let _ = effect.stage();
        let _ = timing.end_frame();

        let pool = effect.pool();
        peak = peak.max(pool.living_count());
        if frame_index % 60 == 0 {
            log::info!(
                "frame {frame_index}: threshold {:.3}, {} living, {} free, {:.0} fps",
                effect.driver().threshold(),
                pool.living_count(),
                pool.dead_count(),
                timing.fps()
            );
        }
        if effect.driver().is_complete() && pool.is_empty() {
            log::info!(
                "dissolve finished after {} frames, peak {peak} particles",
                timing.frame_count()
            );
            return Ok(());
        }
    }

    log::info!(
        "stopped after {MAX_FRAMES} frames with {} particles left",
        effect.pool().living_count()
    );
    Ok(())
}

fn load_options(path: Option<&str>) -> Result<Options, DissolveError> {
    let Some(path) = path.map(Path::new) else {
        return Ok(Options::default());
    };
    if path.exists() {
        log::info!("loading options from {}", path.display());
        Options::load(path)
    } else {
        let options = Options::default();
        options.save(path)?;
        log::info!("wrote default options to {}", path.display());
        Ok(options)
    }
}

fn main() {
    env_logger::init();

    let arg = std::env::args().nth(1);
    let options = match load_options(arg.as_deref()) {
        Ok(options) => options,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(options) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
