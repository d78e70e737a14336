//! CPU-side copy of one captured color + depth frame, rows stored bottom first.

use crate::error::DissolveError;
use crate::gpu::readback::ReadbackLayout;

/// One frame of CPU-visible color and depth, row 0 at the bottom.
///
/// Overwritten every frame by [`OffscreenCapture`](super::OffscreenCapture);
/// read-only to the scanner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapturedFrame {
    width: u32,
    height: u32,
    /// RGBA8, 4 bytes per pixel.
    color: Vec<u8>,
    /// One depth sample per pixel.
    depth: Vec<f32>,
}

impl CapturedFrame {
    /// Wrap existing buffers.
    ///
    /// # Errors
    ///
    /// [`DissolveError::FrameSize`] unless `color` holds
    /// `width * height * 4` bytes and `depth` holds `width * height`
    /// samples.
    pub fn new(
        width: u32,
        height: u32,
        color: Vec<u8>,
        depth: Vec<f32>,
    ) -> Result<Self, DissolveError> {
        let pixels = width as usize * height as usize;
        if color.len() != pixels * 4 {
            return Err(DissolveError::FrameSize {
                expected: pixels * 4,
                actual: color.len(),
            });
        }
        if depth.len() != pixels {
            return Err(DissolveError::FrameSize {
                expected: pixels,
                actual: depth.len(),
            });
        }
        Ok(Self {
            width,
            height,
            color,
            depth,
        })
    }

    /// A frame of background pixels (black, transparent) at far depth.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![0; pixels * 4],
            depth: vec![1.0; pixels],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA8 color bytes, row-major, bottom row first.
    pub fn color_bytes(&self) -> &[u8] {
        &self.color
    }

    /// Depth samples, row-major, bottom row first.
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    /// Overwrite one pixel's color and depth. Out-of-range indices are
    /// ignored.
    pub fn set_pixel(&mut self, index: usize, rgba: [u8; 4], depth: f32) {
        if index < self.pixel_count() {
            self.color[index * 4..index * 4 + 4].copy_from_slice(&rgba);
            self.depth[index] = depth;
        }
    }

    /// Refill color from padded, top-row-first staging bytes.
    pub(crate) fn fill_color(&mut self, layout: ReadbackLayout, bytes: &[u8]) {
        self.resize(layout.width, layout.height);
        self.color.clear();
        for row in layout.rows_bottom_up(bytes) {
            self.color.extend_from_slice(row);
        }
    }

    /// Refill depth from padded, top-row-first `f32` staging bytes.
    pub(crate) fn fill_depth(&mut self, layout: ReadbackLayout, bytes: &[u8]) {
        self.resize(layout.width, layout.height);
        self.depth.clear();
        for row in layout.rows_bottom_up(bytes) {
            self.depth.extend(
                row.chunks_exact(4).map(bytemuck::pod_read_unaligned::<f32>),
            );
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_buffers_are_rejected() {
        let err = CapturedFrame::new(2, 2, vec![0; 15], vec![0.0; 4])
            .unwrap_err();
        assert!(matches!(
            err,
            DissolveError::FrameSize {
                expected: 16,
                actual: 15
            }
        ));
        assert!(CapturedFrame::new(2, 2, vec![0; 16], vec![0.0; 3]).is_err());
        assert!(CapturedFrame::new(2, 2, vec![0; 16], vec![0.0; 4]).is_ok());
    }

    #[test]
    fn staging_bytes_are_unpadded_and_flipped() {
        let color_layout = ReadbackLayout::new(2, 2, 4);
        let mut staged = vec![0_u8; color_layout.buffer_size() as usize];
        // Top-left pixel in texture space is red
        staged[..4].copy_from_slice(&[255, 0, 0, 255]);

        let depth_layout = ReadbackLayout::new(2, 2, 4);
        let mut staged_depth = vec![0_u8; depth_layout.buffer_size() as usize];
        staged_depth[..4].copy_from_slice(&0.25_f32.to_le_bytes());

        let mut frame = CapturedFrame::default();
        frame.fill_color(color_layout, &staged);
        frame.fill_depth(depth_layout, &staged_depth);

        assert_eq!(frame.width(), 2);
        assert_eq!(frame.color_bytes().len(), 16);
        assert_eq!(frame.depth().len(), 4);
        // ...which is pixel 2 once row 0 is the bottom row
        assert_eq!(&frame.color_bytes()[8..12], &[255, 0, 0, 255]);
        assert_eq!(frame.depth()[2], 0.25);
        assert_eq!(frame.depth()[0], 0.0);
    }

    #[test]
    fn set_pixel_ignores_out_of_range() {
        let mut frame = CapturedFrame::blank(2, 1);
        frame.set_pixel(1, [1, 2, 3, 4], 0.5);
        frame.set_pixel(2, [9, 9, 9, 9], 0.5);
        assert_eq!(frame.color_bytes(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(frame.depth(), &[1.0, 0.5]);
    }
}
