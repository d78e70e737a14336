//! GPU resource management utilities.
//!
//! Provides wgpu device initialization, the orphaning upload buffer used for
//! particle instances, and staging buffers for texture readback.

/// Streaming buffer that reallocates its storage before every upload.
pub mod orphan_buffer;
/// Texture-to-CPU readback through mappable staging buffers.
pub mod readback;
/// wgpu device and queue initialization.
pub mod render_context;
