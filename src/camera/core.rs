use glam::{Mat4, Vec3};

use crate::options::CameraOptions;

/// Read-only camera queries consumed by emission and the distance sort.
pub trait CameraView {
    /// Eye position in world space.
    fn position(&self) -> Vec3;
    /// Combined projection * view matrix (wgpu `[0, 1]` depth range).
    fn view_projection(&self) -> Mat4;
}

/// Perspective camera defined by eye position, target, and projection
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Camera {
    /// Camera at `eye` looking at `target` with projection from `options`.
    #[must_use]
    pub fn new(
        eye: Vec3,
        target: Vec3,
        aspect: f32,
        options: &CameraOptions,
    ) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            aspect,
            fovy: options.fovy,
            znear: options.znear,
            zfar: options.zfar,
        }
    }

    /// Build the view matrix.
    pub fn build_view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Build the projection matrix.
    pub fn build_projection(&self) -> Mat4 {
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        )
    }

    /// Build the combined view-projection matrix.
    pub fn build_matrix(&self) -> Mat4 {
        self.build_projection() * self.build_view()
    }
}

impl CameraView for Camera {
    fn position(&self) -> Vec3 {
        self.eye
    }

    fn view_projection(&self) -> Mat4 {
        self.build_matrix()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4Swizzles;

    use super::*;

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            16.0 / 9.0,
            &CameraOptions::default(),
        )
    }

    #[test]
    fn target_projects_to_screen_center() {
        let cam = camera();
        let clip = cam.view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.xyz() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 10.0));
    }
}
