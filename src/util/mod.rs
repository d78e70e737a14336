//! Shared utilities.

/// Frame clock feeding `dt` into the effect.
pub mod frame_timing;
