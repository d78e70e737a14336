//! Dissolve threshold state machine.
//!
//! While dissolving, the threshold sweeps from 0 to 1 at a fixed rate. The
//! surface noise of a dissolving object is compared against it in the
//! fragment shader: fragments below the current threshold are gone, and the
//! ones between the previous and current threshold were removed this frame
//! and are drawn into the offscreen capture to become particles.

use crate::options::DissolveOptions;

/// Whether the threshold is advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DissolveState {
    /// Waiting for [`DissolveDriver::start`].
    #[default]
    Idle,
    /// Threshold advances every tick.
    Dissolving,
}

/// Per-draw dissolve parameters, laid out for a WGSL uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DissolveUniform {
    /// Upper threshold.
    pub threshold: f32,
    /// Lower threshold, only used when `invert` is set.
    pub lower_bound: f32,
    /// 0: keep fragments at or above `threshold`.
    /// 1: keep fragments in `[lower_bound, threshold)`.
    pub invert: u32,
    pub(crate) _pad: u32,
}

impl DissolveUniform {
    /// Uniform for drawing the intact part of the surface.
    #[must_use]
    pub fn intact(threshold: f32) -> Self {
        Self {
            threshold,
            lower_bound: 0.0,
            invert: 0,
            _pad: 0,
        }
    }

    /// Uniform for drawing only the band removed between two thresholds.
    #[must_use]
    pub fn removed_band(lower_bound: f32, threshold: f32) -> Self {
        Self {
            threshold,
            lower_bound,
            invert: 1,
            _pad: 0,
        }
    }
}

/// Advances the dissolve threshold and derives the uniforms for the screen
/// and capture passes.
#[derive(Debug, Clone, PartialEq)]
pub struct DissolveDriver {
    state: DissolveState,
    threshold: f32,
    previous_threshold: f32,
    /// Threshold units per second.
    rate: f32,
}

impl DissolveDriver {
    /// Idle driver at threshold 0.
    #[must_use]
    pub fn new(options: &DissolveOptions) -> Self {
        Self {
            state: DissolveState::Idle,
            threshold: 0.0,
            previous_threshold: 0.0,
            rate: options.rate.max(0.0),
        }
    }

    /// Begin dissolving. No-op if already dissolving.
    pub fn start(&mut self) {
        if self.state == DissolveState::Idle {
            log::debug!("dissolve started at threshold {}", self.threshold);
            self.state = DissolveState::Dissolving;
        }
    }

    /// Advance one frame. The previous threshold becomes the current one,
    /// and while dissolving the current one grows by `rate * dt`, clamped to
    /// `[0, 1]`. A negative `dt` does not move it backwards. Returns the new
    /// threshold.
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.previous_threshold = self.threshold;
        if self.state == DissolveState::Dissolving {
            let step = (self.rate * dt).max(0.0);
            self.threshold = (self.threshold + step).clamp(0.0, 1.0);
            if self.is_complete() && self.previous_threshold < 1.0 {
                log::debug!("dissolve complete");
            }
        }
        self.threshold
    }

    /// Set the threshold directly (clamped to `[0, 1]`); the old value
    /// becomes the previous threshold.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.previous_threshold = self.threshold;
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    /// Back to idle at threshold 0.
    pub fn rearm(&mut self) {
        *self = Self {
            rate: self.rate,
            ..Self::new(&DissolveOptions::default())
        };
    }

    /// Change the advance rate. Negative rates are clamped to 0.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(0.0);
    }

    /// Threshold units per second.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// `true` once the threshold reached 1. Stays set until [`Self::rearm`].
    pub fn is_complete(&self) -> bool {
        self.threshold >= 1.0
    }

    /// `(previous, current)` thresholds bounding the fragments removed by
    /// the last tick.
    pub fn removal_band(&self) -> (f32, f32) {
        (self.previous_threshold, self.threshold)
    }

    /// `true` if the last tick removed any part of the surface.
    pub fn is_removing(&self) -> bool {
        self.previous_threshold < self.threshold
    }

    /// Current threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Threshold before the last tick.
    pub fn previous_threshold(&self) -> f32 {
        self.previous_threshold
    }

    /// Current state.
    pub fn state(&self) -> DissolveState {
        self.state
    }

    /// Uniform for the main framebuffer pass, `None` once the object is
    /// fully dissolved and should not be drawn at all.
    pub fn screen_uniform(&self) -> Option<DissolveUniform> {
        (!self.is_complete()).then(|| DissolveUniform::intact(self.threshold))
    }

    /// Uniform for the offscreen capture pass.
    pub fn capture_uniform(&self) -> DissolveUniform {
        DissolveUniform::removed_band(self.previous_threshold, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(rate: f32) -> DissolveDriver {
        DissolveDriver::new(&DissolveOptions { rate })
    }

    #[test]
    fn idle_driver_does_not_advance() {
        let mut d = driver(0.5);
        assert_eq!(d.tick(1.0), 0.0);
        assert_eq!(d.state(), DissolveState::Idle);
        assert!(!d.is_removing());
    }

    #[test]
    fn threshold_advances_and_clamps() {
        let mut d = driver(0.25);
        d.start();
        assert_eq!(d.tick(1.0), 0.25);
        assert_eq!(d.tick(2.0), 0.75);
        assert_eq!(d.removal_band(), (0.25, 0.75));
        assert_eq!(d.tick(4.0), 1.0);
        assert!(d.is_complete());
        // Terminal, no automatic reset
        assert_eq!(d.tick(1.0), 1.0);
        assert_eq!(d.state(), DissolveState::Dissolving);
        assert!(!d.is_removing());
    }

    #[test]
    fn threshold_is_monotonic() {
        let mut d = driver(0.1);
        d.start();
        let mut last = 0.0;
        for _ in 0..50 {
            let t = d.tick(0.3);
            assert!(t >= last);
            assert!((0.0..=1.0).contains(&t));
            last = t;
        }
        assert!(d.is_complete());
    }

    #[test]
    fn negative_rate_never_rewinds() {
        let mut d = driver(0.5);
        d.start();
        assert_eq!(d.tick(1.0), 0.5);
        d.set_rate(-0.5);
        assert_eq!(d.rate(), 0.0);
        assert_eq!(d.tick(1.0), 0.5);
        assert_eq!(d.tick(-1.0), 0.5);

        let mut from_options = driver(-2.0);
        from_options.start();
        assert_eq!(from_options.rate(), 0.0);
        assert_eq!(from_options.tick(1.0), 0.0);
    }

    #[test]
    fn negative_dt_never_rewinds() {
        let mut d = driver(0.5);
        d.start();
        assert_eq!(d.tick(1.0), 0.5);
        assert_eq!(d.tick(-1.0), 0.5);
        assert!(!d.is_removing());
        assert_eq!(d.tick(0.5), 0.75);
    }

    #[test]
    fn set_threshold_shifts_previous() {
        let mut d = driver(0.1);
        d.set_threshold(0.4);
        d.set_threshold(1.7);
        assert_eq!(d.removal_band(), (0.4, 1.0));
        d.set_threshold(-3.0);
        assert_eq!(d.threshold(), 0.0);
    }

    #[test]
    fn rearm_keeps_rate() {
        let mut d = driver(0.5);
        d.start();
        let _ = d.tick(3.0);
        d.rearm();
        assert_eq!(d.state(), DissolveState::Idle);
        assert_eq!(d.removal_band(), (0.0, 0.0));
        d.start();
        assert_eq!(d.tick(1.0), 0.5);
    }

    #[test]
    fn pass_uniforms() {
        let mut d = driver(0.5);
        d.start();
        let _ = d.tick(1.0);
        assert_eq!(d.screen_uniform(), Some(DissolveUniform::intact(0.5)));
        let capture = d.capture_uniform();
        assert_eq!((capture.lower_bound, capture.threshold), (0.0, 0.5));
        assert_eq!(capture.invert, 1);

        let _ = d.tick(1.0);
        assert_eq!(d.screen_uniform(), None);
        assert_eq!(size_of::<DissolveUniform>(), 16);
    }
}
