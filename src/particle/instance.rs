//! GPU upload record for one living particle, drawn as an instanced billboard.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Per-instance record uploaded for the billboard draw.
///
/// Layout is part of the vertex-buffer contract and must not change without
/// updating the particle shader:
///
/// | field      | offset | format      |
/// |------------|--------|-------------|
/// | `position` | 0      | `f32 x 3`   |
/// | `size`     | 12     | `f32`       |
/// | `color`    | 16     | `unorm8 x 4`|
///
/// Stride is 20 bytes. `position` and `size` are read together as one
/// `Float32x4` attribute.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// World-space center of the billboard.
    pub position: [f32; 3],
    /// Billboard size in world units.
    pub size: f32,
    /// RGBA, normalized to `[0, 255]`.
    pub color: [u8; 4],
}

impl ParticleInstance {
    /// Byte offset of `position`.
    pub const POSITION_OFFSET: u64 = 0;
    /// Byte offset of `size`.
    pub const SIZE_OFFSET: u64 = 12;
    /// Byte offset of `color`.
    pub const COLOR_OFFSET: u64 = 16;
    /// Distance between consecutive instances.
    pub const STRIDE: u64 = 20;

    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        // Position, Size
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: Self::POSITION_OFFSET,
            shader_location: 1,
        },
        // Color
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Unorm8x4,
            offset: Self::COLOR_OFFSET,
            shader_location: 2,
        },
    ];

    /// Pack a particle. Color channels are clamped to `[0, 1]` first.
    #[must_use]
    pub fn new(position: Vec3, size: f32, color: Vec4) -> Self {
        let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
        Self {
            position: position.to_array(),
            size,
            color: [c.x as u8, c.y as u8, c.z as u8, c.w as u8],
        }
    }

    /// Instance-stepped vertex layout. Location 0 is left for the quad
    /// corner buffer.
    #[must_use]
    pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::offset_of;

    use super::*;

    #[test]
    fn field_offsets_match_vertex_layout() {
        assert_eq!(
            offset_of!(ParticleInstance, position) as u64,
            ParticleInstance::POSITION_OFFSET
        );
        assert_eq!(
            offset_of!(ParticleInstance, size) as u64,
            ParticleInstance::SIZE_OFFSET
        );
        assert_eq!(
            offset_of!(ParticleInstance, color) as u64,
            ParticleInstance::COLOR_OFFSET
        );
        assert_eq!(
            size_of::<ParticleInstance>() as u64,
            ParticleInstance::STRIDE
        );
        assert_eq!(
            ParticleInstance::vertex_buffer_layout().array_stride,
            ParticleInstance::STRIDE
        );
    }

    #[test]
    fn color_is_clamped_and_quantized() {
        let inst = ParticleInstance::new(
            Vec3::new(1.0, 2.0, 3.0),
            0.5,
            Vec4::new(1.5, 0.5, -1.0, 1.0),
        );
        assert_eq!(inst.color, [255, 128, 0, 255]);
        assert_eq!(inst.position, [1.0, 2.0, 3.0]);

        let bytes: &[u8] = bytemuck::bytes_of(&inst);
        assert_eq!(&bytes[16..20], &[255, 128, 0, 255]);
    }
}
