//! Camera used to unproject captured pixels and order particles by depth.

/// Core camera struct and the read-only [`core::CameraView`] interface.
pub mod core;

pub use self::core::{Camera, CameraView};
