//! Offscreen color + depth target with CPU readback.
//!
//! The scene renders the fragments removed this frame into the capture
//! target, then the target is copied into two staging buffers (color and
//! depth), mapped, and converted into a [`CapturedFrame`] for the emission
//! scanner. Mapping blocks until the copy completes, so readback costs one
//! transfer per frame on the calling thread.

mod frame;

pub use frame::CapturedFrame;

use crate::error::DissolveError;
use crate::gpu::readback::{ReadbackBuffer, ReadbackLayout};
use crate::gpu::render_context::RenderContext;

/// Clear color of the capture target. Pixels still black after drawing are
/// background and never emit.
pub const BACKGROUND: wgpu::Color = wgpu::Color::TRANSPARENT;
/// Color attachment format (raw bytes, no sRGB conversion on readback).
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Depth attachment format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const COLOR_STAGING: &str = "Capture Color Staging";
const DEPTH_STAGING: &str = "Capture Depth Staging";

/// Offscreen render target plus its two readback staging buffers.
pub struct OffscreenCapture {
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    color_staging: ReadbackBuffer,
    depth_staging: ReadbackBuffer,
    /// Reused every frame
    frame: CapturedFrame,
    width: u32,
    height: u32,
}

impl OffscreenCapture {
    /// Create the target and staging buffers.
    ///
    /// # Errors
    ///
    /// [`DissolveError::InvalidTarget`] if either dimension is zero or
    /// exceeds the device's 2D texture limit.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<Self, DissolveError> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            let err = DissolveError::InvalidTarget { width, height, max };
            log::error!("{err}");
            return Err(err);
        }

        let (color_texture, color_view) = create_attachment(
            device,
            "Capture Color Texture",
            width,
            height,
            COLOR_FORMAT,
        );
        let (depth_texture, depth_view) = create_attachment(
            device,
            "Capture Depth Texture",
            width,
            height,
            DEPTH_FORMAT,
        );

        // Both formats are 4 bytes per texel
        let layout = ReadbackLayout::new(width, height, 4);
        let color_staging = ReadbackBuffer::new(device, COLOR_STAGING, layout);
        let depth_staging = ReadbackBuffer::new(device, DEPTH_STAGING, layout);

        log::info!(
            "offscreen capture {width}x{height}: {} KiB staging per buffer",
            layout.buffer_size() / 1024
        );

        Ok(Self {
            color_texture,
            color_view,
            depth_texture,
            depth_view,
            color_staging,
            depth_staging,
            frame: CapturedFrame::blank(width, height),
            width,
            height,
        })
    }

    /// Begin a render pass into the capture target.
    ///
    /// Color is cleared to [`BACKGROUND`], depth to 1.0, and the viewport
    /// covers the whole target. Draw the removed fragments into the returned
    /// pass, then [`Self::unbind`] it.
    pub fn bind<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
    ) -> wgpu::RenderPass<'e> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Capture Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(BACKGROUND),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            ..Default::default()
        });
        pass.set_viewport(
            0.0,
            0.0,
            self.width as f32,
            self.height as f32,
            0.0,
            1.0,
        );
        pass
    }

    /// End the capture pass. The next pass on the main framebuffer sets its
    /// own target and viewport.
    pub fn unbind(pass: wgpu::RenderPass<'_>) {
        drop(pass);
    }

    /// Encode copies of both attachments into their staging buffers and
    /// submit `encoder` (which should already hold the capture pass).
    ///
    /// # Errors
    ///
    /// [`DissolveError::BufferBusy`] if a staging buffer from the previous
    /// frame was never unmapped.
    pub fn request_transfer(
        &mut self,
        context: &RenderContext,
        mut encoder: wgpu::CommandEncoder,
    ) -> Result<(), DissolveError> {
        self.color_staging.transfer(
            &mut encoder,
            &self.color_texture,
            wgpu::TextureAspect::All,
        )?;
        self.depth_staging.transfer(
            &mut encoder,
            &self.depth_texture,
            wgpu::TextureAspect::DepthOnly,
        )?;
        context.submit(encoder);
        Ok(())
    }

    /// Map the color staging buffer, waiting for the transfer.
    ///
    /// Read it with [`ReadbackBuffer::read`]; call [`Self::unmap`] before
    /// the next transfer.
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] if no transfer was requested.
    pub fn capture_color(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<&ReadbackBuffer, DissolveError> {
        self.color_staging.map(device)?;
        Ok(&self.color_staging)
    }

    /// Map the depth staging buffer, waiting for the transfer.
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] if no transfer was requested.
    pub fn capture_depth(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<&ReadbackBuffer, DissolveError> {
        self.depth_staging.map(device)?;
        Ok(&self.depth_staging)
    }

    /// Release both staging buffers for the next transfer.
    pub fn unmap(&mut self) {
        self.color_staging.unmap();
        self.depth_staging.unmap();
    }

    /// Map both staging buffers, convert them into the reusable
    /// [`CapturedFrame`] and unmap.
    ///
    /// Both staging buffers are unmapped whether or not the read succeeds,
    /// so a failed frame never blocks the next transfer.
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] if no transfer was requested,
    /// or any mapping failure.
    pub fn read_frame(
        &mut self,
        device: &wgpu::Device,
    ) -> Result<&CapturedFrame, DissolveError> {
        let filled = self.fill_frame(device);
        self.unmap();
        filled?;
        Ok(&self.frame)
    }

    fn fill_frame(&mut self, device: &wgpu::Device) -> Result<(), DissolveError> {
        self.color_staging.map(device)?;
        self.depth_staging.map(device)?;

        let layout = self.color_staging.layout();
        self.color_staging
            .read(|bytes| self.frame.fill_color(layout, bytes))?;
        let layout = self.depth_staging.layout();
        self.depth_staging
            .read(|bytes| self.frame.fill_depth(layout, bytes))
    }

    /// The last frame produced by [`Self::read_frame`].
    pub fn frame(&self) -> &CapturedFrame {
        &self.frame
    }

    /// Color attachment view, e.g. for a debug overlay.
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    /// Target width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

fn create_attachment(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::readback::ReadbackState;

    /// Tests below skip themselves on machines without a GPU adapter.
    fn context() -> Option<RenderContext> {
        pollster::block_on(RenderContext::headless(8, 4)).ok()
    }

    #[test]
    fn zero_sized_target_is_rejected() {
        let Some(context) = context() else { return };
        assert!(matches!(
            OffscreenCapture::new(&context.device, 0, 4),
            Err(DissolveError::InvalidTarget { width: 0, .. })
        ));
    }

    #[test]
    fn failed_read_leaves_both_buffers_reusable() {
        let Some(context) = context() else { return };
        let mut capture = OffscreenCapture::new(&context.device, 8, 4).unwrap();

        // Only color gets a transfer, so mapping depth fails after color
        // was already mapped
        let mut encoder = context.create_encoder();
        capture
            .color_staging
            .transfer(&mut encoder, &capture.color_texture, wgpu::TextureAspect::All)
            .unwrap();
        context.submit(encoder);

        assert!(matches!(
            capture.read_frame(&context.device),
            Err(DissolveError::ReadBeforeTransfer { .. })
        ));
        assert_eq!(capture.color_staging.state(), ReadbackState::Idle);
        assert_eq!(capture.depth_staging.state(), ReadbackState::Idle);

        let mut encoder = context.create_encoder();
        OffscreenCapture::unbind(capture.bind(&mut encoder));
        capture.request_transfer(&context, encoder).unwrap();
        let frame = capture.read_frame(&context.device).unwrap();
        assert_eq!(frame.pixel_count(), 32);
        assert!(frame.color_bytes().iter().all(|&b| b == 0));
        assert!(frame.depth().iter().all(|&d| d == 1.0));
    }
}
