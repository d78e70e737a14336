//! Screen-space to world-space particle emission.
//!
//! [`EmissionScanner`] walks a [`CapturedFrame`], skips background pixels,
//! and unprojects every remaining pixel through the inverse
//! view-projection matrix into a [`SpawnRequest`]. Start life and velocity
//! come from the per-frame [`SpawnReservoir`].

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::capture::CapturedFrame;
use crate::options::EmissionOptions;
use crate::particle::{ParticlePool, SpawnReservoir};

/// Two RGBA8 pixels per scanned word.
const WORD_BYTES: usize = 8;
const PIXEL_BYTES: usize = 4;

/// One particle to be spawned from a captured pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    /// Pixel position in normalized device coordinates.
    pub ndc: Vec2,
    /// Unprojected world-space position.
    pub position: Vec3,
    /// Start velocity from the reservoir.
    pub velocity: Vec3,
    /// Start life from the reservoir.
    pub life: f32,
    /// Pixel RGB in `[0, 1]`, alpha fixed at 1.
    pub color: Vec4,
    /// Particle size.
    pub size: f32,
}

/// Converts captured pixels into spawn requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionScanner {
    particle_size: f32,
}

impl EmissionScanner {
    /// Scanner emitting particles of [`EmissionOptions::particle_size`].
    #[must_use]
    pub fn new(options: &EmissionOptions) -> Self {
        Self {
            particle_size: options.particle_size,
        }
    }

    /// Size given to every emitted particle.
    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    /// Change the emitted particle size.
    pub fn set_particle_size(&mut self, size: f32) {
        self.particle_size = size;
    }

    /// Scan `frame` and hand each spawn request to `sink`, in pixel order.
    ///
    /// Color is the only liveness signal: a pixel whose RGB is all zero is
    /// background and never emits, whatever its depth. Each emitted pixel
    /// consumes the next reservoir entry. Returns the number of requests.
    pub fn scan_with(
        &self,
        frame: &CapturedFrame,
        inverse_view_projection: &Mat4,
        reservoir: &mut SpawnReservoir,
        mut sink: impl FnMut(SpawnRequest),
    ) -> usize {
        let ctx = PixelContext {
            frame,
            inverse_view_projection,
            particle_size: self.particle_size,
        };
        let mut emitted = 0;

        let mut words = frame.color_bytes().chunks_exact(WORD_BYTES);
        for (word_index, word) in words.by_ref().enumerate() {
            // Two background pixels in one compare
            if bytemuck::pod_read_unaligned::<u64>(word) == 0 {
                continue;
            }
            for (half, pixel) in word.chunks_exact(PIXEL_BYTES).enumerate() {
                let index = word_index * 2 + half;
                if let Some(request) = ctx.request(index, pixel, reservoir) {
                    sink(request);
                    emitted += 1;
                }
            }
        }

        // Odd pixel count leaves one pixel outside the last word
        let tail = words.remainder();
        if tail.len() == PIXEL_BYTES {
            let index = frame.pixel_count() - 1;
            if let Some(request) = ctx.request(index, tail, reservoir) {
                sink(request);
                emitted += 1;
            }
        }

        emitted
    }

    /// Scan `frame` and collect every spawn request.
    pub fn scan(
        &self,
        frame: &CapturedFrame,
        inverse_view_projection: &Mat4,
        reservoir: &mut SpawnReservoir,
    ) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        let _ = self.scan_with(
            frame,
            inverse_view_projection,
            reservoir,
            |request| requests.push(request),
        );
        requests
    }

    /// Scan `frame` and spawn one particle per request into `pool`.
    ///
    /// Returns how many particles were actually spawned; requests beyond
    /// the pool's free slots are dropped by the pool.
    pub fn emit(
        &self,
        frame: &CapturedFrame,
        inverse_view_projection: &Mat4,
        reservoir: &mut SpawnReservoir,
        pool: &mut ParticlePool,
    ) -> usize {
        let mut spawned = 0;
        let requested = self.scan_with(
            frame,
            inverse_view_projection,
            reservoir,
            |r| {
                spawned +=
                    pool.spawn(1, r.position, r.velocity, r.life, r.color, r.size);
            },
        );
        log::debug!(
            "emission: {requested} pixels, {spawned} spawned, {} living",
            pool.living_count()
        );
        spawned
    }
}

struct PixelContext<'a> {
    frame: &'a CapturedFrame,
    inverse_view_projection: &'a Mat4,
    particle_size: f32,
}

impl PixelContext<'_> {
    fn request(
        &self,
        index: usize,
        pixel: &[u8],
        reservoir: &mut SpawnReservoir,
    ) -> Option<SpawnRequest> {
        let [r, g, b] = [pixel[0], pixel[1], pixel[2]];
        if r == 0 && g == 0 && b == 0 {
            return None;
        }

        let ndc = pixel_ndc(index, self.frame.width(), self.frame.height());
        let depth = self.frame.depth()[index];
        let params = reservoir.next_params();

        Some(SpawnRequest {
            ndc,
            position: unproject(self.inverse_view_projection, ndc, depth),
            velocity: params.velocity,
            life: params.life,
            color: Vec4::new(
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
                1.0,
            ),
            size: self.particle_size,
        })
    }
}

/// NDC of the pixel at linear `index`, row 0 at the bottom.
///
/// `x = 2 * (index % width) / width - 1`,
/// `y = 2 * (index / width) / height - 1`.
#[must_use]
pub fn pixel_ndc(index: usize, width: u32, height: u32) -> Vec2 {
    let w = width as usize;
    let column = (index % w) as f32;
    let row = (index / w) as f32;
    Vec2::new(
        2.0 * column / width as f32 - 1.0,
        2.0 * row / height as f32 - 1.0,
    )
}

/// World-space point for a pixel at `ndc` with stored `depth`.
///
/// The captured depth is the square root of NDC z, so it is squared back
/// before the inverse transform and perspective divide.
#[must_use]
pub fn unproject(inverse_view_projection: &Mat4, ndc: Vec2, depth: f32) -> Vec3 {
    let world =
        *inverse_view_projection * Vec4::new(ndc.x, ndc.y, depth * depth, 1.0);
    world.xyz() / world.w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, CameraView};
    use crate::options::CameraOptions;
    use crate::particle::SpawnParams;

    fn fixed_reservoir() -> SpawnReservoir {
        let mut reservoir = SpawnReservoir::new(2);
        let mut n = 0.0;
        reservoir.refresh(&mut || {
            n += 1.0;
            SpawnParams {
                life: n,
                velocity: Vec3::Y * n,
            }
        });
        reservoir
    }

    fn scanner() -> EmissionScanner {
        EmissionScanner::new(&EmissionOptions::default())
    }

    #[test]
    fn single_pixel_in_two_by_two_frame() {
        let mut frame = CapturedFrame::blank(2, 2);
        frame.set_pixel(1, [255, 128, 0, 255], 0.5);

        let requests =
            scanner().scan(&frame, &Mat4::IDENTITY, &mut fixed_reservoir());
        assert_eq!(requests.len(), 1);
        let request = requests[0];
        assert_eq!(request.ndc, Vec2::new(0.0, -1.0));
        // Identity transform: depth is squared into z
        assert!(request
            .position
            .abs_diff_eq(Vec3::new(0.0, -1.0, 0.25), 1e-6));
        assert!(request
            .color
            .abs_diff_eq(Vec4::new(1.0, 128.0 / 255.0, 0.0, 1.0), 1e-6));
        assert_eq!(request.life, 1.0);
        assert_eq!(request.size, 0.1);
    }

    #[test]
    fn background_frame_yields_nothing() {
        let mut frame = CapturedFrame::blank(16, 9);
        for i in 0..frame.pixel_count() {
            // Valid depth does not make a background pixel live
            frame.set_pixel(i, [0, 0, 0, 0], 0.3);
        }
        let mut reservoir = fixed_reservoir();
        assert!(scanner()
            .scan(&frame, &Mat4::IDENTITY, &mut reservoir)
            .is_empty());
        // No reservoir entries consumed
        assert_eq!(reservoir.next_params().life, 1.0);
    }

    #[test]
    fn alpha_alone_is_not_live() {
        let mut frame = CapturedFrame::blank(2, 1);
        frame.set_pixel(0, [0, 0, 0, 255], 0.5);
        frame.set_pixel(1, [0, 0, 1, 0], 0.5);

        let requests =
            scanner().scan(&frame, &Mat4::IDENTITY, &mut fixed_reservoir());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ndc, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn odd_pixel_count_scans_trailing_pixel() {
        let mut frame = CapturedFrame::blank(3, 1);
        frame.set_pixel(2, [10, 20, 30, 255], 0.0);

        let requests =
            scanner().scan(&frame, &Mat4::IDENTITY, &mut fixed_reservoir());
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .ndc
            .abs_diff_eq(Vec2::new(2.0 * 2.0 / 3.0 - 1.0, -1.0), 1e-6));
    }

    #[test]
    fn reservoir_entries_cycle_per_spawn() {
        let mut frame = CapturedFrame::blank(3, 1);
        for i in 0..3 {
            frame.set_pixel(i, [1, 1, 1, 255], 0.5);
        }
        let lives: Vec<f32> = scanner()
            .scan(&frame, &Mat4::IDENTITY, &mut fixed_reservoir())
            .iter()
            .map(|r| r.life)
            .collect();
        assert_eq!(lives, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn unprojection_round_trips_world_point() {
        let camera = Camera::new(
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::ZERO,
            4.0 / 3.0,
            &CameraOptions::default(),
        );
        let view_projection = camera.view_projection();
        let inverse = view_projection.inverse();

        for point in [
            Vec3::ZERO,
            Vec3::new(0.5, -0.3, 0.2),
            Vec3::new(-1.0, 0.8, -1.5),
        ] {
            let clip = view_projection * point.extend(1.0);
            let ndc = clip.xyz() / clip.w;
            let stored_depth = ndc.z.sqrt();
            let back = unproject(&inverse, ndc.truncate(), stored_depth);
            assert!(back.abs_diff_eq(point, 1e-3), "{back} != {point}");
        }
    }

    #[test]
    fn emit_spawns_into_pool_until_full() {
        let mut frame = CapturedFrame::blank(4, 1);
        for i in 0..4 {
            frame.set_pixel(i, [200, 100, 50, 255], 0.5);
        }
        let mut pool = ParticlePool::new(3);
        let spawned = scanner().emit(
            &frame,
            &Mat4::IDENTITY,
            &mut fixed_reservoir(),
            &mut pool,
        );
        assert_eq!(spawned, 3);
        assert_eq!(pool.living_count(), 3);
        assert_eq!(pool.alive()[0].size, 0.1);
        assert_eq!(pool.alive()[0].color.w, 1.0);
    }

    #[test]
    fn pixel_ndc_spans_the_frame() {
        assert_eq!(pixel_ndc(0, 4, 2), Vec2::new(-1.0, -1.0));
        assert_eq!(pixel_ndc(3, 4, 2), Vec2::new(0.5, -1.0));
        assert_eq!(pixel_ndc(4, 4, 2), Vec2::new(-1.0, 0.0));
    }
}
