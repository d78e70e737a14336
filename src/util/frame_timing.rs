use web_time::{Duration, Instant};

/// Frame clock: per-frame `dt` for the simulation, smoothed FPS, and
/// optional frame limiting.
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Upper bound on the `dt` handed to the simulation, in seconds
    max_dt: f32,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
    frames: u64,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };

        Self {
            target_fps,
            min_frame_duration,
            last_frame: Instant::now(),
            max_dt: 0.25,
            smoothed_fps: 60.0,
            smoothing: 0.05,
            frames: 0,
        }
    }

    /// Clamp every returned `dt` to at most `max_dt` seconds. A blocking
    /// readback stall then ages particles by one long frame, not by the
    /// whole stall.
    #[must_use]
    pub fn with_max_dt(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt.max(0.0);
        self
    }

    /// Returns true if enough time has passed since the last frame to
    /// render the next one.
    pub fn should_render(&self) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Close the current frame. Returns the elapsed time in seconds,
    /// clamped to the max dt, for [`DissolveEffect::begin_frame`] and
    /// [`DissolveEffect::simulate`].
    ///
    /// [`DissolveEffect::begin_frame`]: crate::effect::DissolveEffect::begin_frame
    /// [`DissolveEffect::simulate`]: crate::effect::DissolveEffect::simulate
    pub fn end_frame(&mut self) -> f32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frames += 1;

        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
        frame_time.min(self.max_dt)
    }

    /// Get the current FPS (smoothed)
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }

    /// Frames closed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_always_renders() {
        assert!(FrameTiming::new(0).should_render());
    }

    #[test]
    fn dt_is_clamped() {
        let mut timing = FrameTiming::new(0).with_max_dt(0.0);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(timing.end_frame(), 0.0);
        assert_eq!(timing.frame_count(), 1);
    }

    #[test]
    fn dt_tracks_elapsed_time() {
        let mut timing = FrameTiming::new(0);
        std::thread::sleep(Duration::from_millis(5));
        let dt = timing.end_frame();
        assert!((0.005..=0.25).contains(&dt));
        assert!(timing.fps() > 0.0);
    }
}
