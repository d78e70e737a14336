//! CPU readback of rendered textures through a mappable staging buffer
//!
//! A transfer copies a whole texture into the staging buffer; mapping waits
//! for the GPU and exposes the bytes; unmapping hands the buffer back for
//! the next transfer. The sequence is enforced by [`ReadbackState`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::DissolveError;

/// Row layout of a texture copied into a staging buffer.
///
/// wgpu requires `bytes_per_row` to be a multiple of
/// [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`], so every row carries trailing
/// padding that readers must skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadbackLayout {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// Size of one texel in bytes.
    pub bytes_per_pixel: u32,
    /// Row pitch in the staging buffer, padded to the copy alignment.
    pub padded_bytes_per_row: u32,
}

impl ReadbackLayout {
    /// Layout for a `width` x `height` texture of `bytes_per_pixel` texels.
    #[must_use]
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        let unpadded = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        Self {
            width,
            height,
            bytes_per_pixel,
            padded_bytes_per_row: unpadded.div_ceil(align) * align,
        }
    }

    /// Meaningful bytes per row (no padding).
    #[must_use]
    pub fn unpadded_bytes_per_row(&self) -> u32 {
        self.width * self.bytes_per_pixel
    }

    /// Total staging buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> u64 {
        u64::from(self.padded_bytes_per_row) * u64::from(self.height)
    }

    /// Rows of `bytes` with padding stripped, bottom row first.
    ///
    /// wgpu textures put row 0 at the top; the emission math expects row 0
    /// at the bottom, so readers walk the rows in reverse.
    pub fn rows_bottom_up<'a>(
        &self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = &'a [u8]> + 'a {
        let pitch = self.padded_bytes_per_row as usize;
        let row_len = self.unpadded_bytes_per_row() as usize;
        bytes
            .chunks_exact(pitch)
            .take(self.height as usize)
            .rev()
            .map(move |row| &row[..row_len])
    }
}

/// Where a staging buffer is in its transfer/map/unmap cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadbackState {
    /// Nothing transferred since the last unmap.
    #[default]
    Idle,
    /// A texture copy has been submitted; mapping may begin.
    Transferred,
    /// Contents are CPU-visible; must be unmapped before the next transfer.
    Mapped,
}

impl ReadbackState {
    /// State after encoding a new transfer.
    ///
    /// # Errors
    ///
    /// [`DissolveError::BufferBusy`] while the buffer is still mapped.
    pub fn begin_transfer(
        self,
        buffer: &'static str,
    ) -> Result<Self, DissolveError> {
        match self {
            Self::Idle | Self::Transferred => Ok(Self::Transferred),
            Self::Mapped => Err(DissolveError::BufferBusy { buffer }),
        }
    }

    /// Whether a map request is needed, or the buffer is already mapped.
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] if nothing was transferred.
    pub fn begin_map(self, buffer: &'static str) -> Result<bool, DissolveError> {
        match self {
            Self::Transferred => Ok(true),
            Self::Mapped => Ok(false),
            Self::Idle => Err(DissolveError::ReadBeforeTransfer { buffer }),
        }
    }

    /// State after a map attempt. A failed map drops the transfer, so the
    /// buffer needs a fresh transfer before it can be mapped again.
    #[must_use]
    pub fn after_map(mapped: bool) -> Self {
        if mapped {
            Self::Mapped
        } else {
            Self::Idle
        }
    }

    /// Check that mapped bytes may be read.
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] unless the buffer is mapped.
    pub fn ensure_mapped(self, buffer: &'static str) -> Result<(), DissolveError> {
        if self == Self::Mapped {
            Ok(())
        } else {
            Err(DissolveError::ReadBeforeTransfer { buffer })
        }
    }
}

/// A `COPY_DST | MAP_READ` staging buffer sized for one texture.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    label: &'static str,
    layout: ReadbackLayout,
    state: ReadbackState,
    /// Flag set by callback when buffer mapping is complete
    map_complete: Arc<AtomicBool>,
    /// Set by the callback whatever the outcome
    map_settled: Arc<AtomicBool>,
}

impl ReadbackBuffer {
    /// Allocate a staging buffer for textures with the given layout.
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        layout: ReadbackLayout,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: layout.buffer_size(),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            label,
            layout,
            state: ReadbackState::Idle,
            map_complete: Arc::new(AtomicBool::new(false)),
            map_settled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Encode a copy of `texture` (the given aspect) into this buffer.
    ///
    /// The copy only happens once the encoder is submitted; map after that.
    ///
    /// # Errors
    ///
    /// [`DissolveError::BufferBusy`] if the previous contents are still
    /// mapped.
    pub fn transfer(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        aspect: wgpu::TextureAspect,
    ) -> Result<(), DissolveError> {
        self.state = self
            .state
            .begin_transfer(self.label)
            .inspect_err(|e| log::error!("{e}"))?;

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.layout.padded_bytes_per_row),
                    rows_per_image: Some(self.layout.height),
                },
            },
            wgpu::Extent3d {
                width: self.layout.width,
                height: self.layout.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Map the buffer for reading, blocking until the transfer completes.
    ///
    /// No timeout: a stalled driver stalls the caller.
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] if nothing was transferred,
    /// [`DissolveError::Poll`] / [`DissolveError::MapFailed`] if the GPU
    /// wait or the mapping itself fails. After a failure the buffer is back
    /// to [`ReadbackState::Idle`] with no map request outstanding.
    pub fn map(&mut self, device: &wgpu::Device) -> Result<(), DissolveError> {
        if !self.state.begin_map(self.label).inspect_err(|e| {
            log::error!("{e}");
        })? {
            return Ok(());
        }

        self.map_complete.store(false, Ordering::SeqCst);
        self.map_settled.store(false, Ordering::SeqCst);
        let map_complete = Arc::clone(&self.map_complete);
        let map_settled = Arc::clone(&self.map_settled);
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                if result.is_ok() {
                    map_complete.store(true, Ordering::SeqCst);
                }
                map_settled.store(true, Ordering::SeqCst);
            });

        let polled = device.poll(wgpu::PollType::Wait);
        let mapped = polled.is_ok() && self.map_complete.load(Ordering::SeqCst);
        self.state = ReadbackState::after_map(mapped);
        if mapped {
            return Ok(());
        }

        // Cancel a pending request, or drop a mapping the failed poll raced
        if !self.map_settled.load(Ordering::SeqCst)
            || self.map_complete.load(Ordering::SeqCst)
        {
            self.buffer.unmap();
        }
        let err = match polled {
            Err(e) => DissolveError::Poll(e),
            Ok(_) => DissolveError::MapFailed {
                buffer: self.label,
                source: wgpu::BufferAsyncError,
            },
        };
        log::error!("{err}");
        Err(err)
    }

    /// Run `f` over the mapped bytes (padded rows, top row first).
    ///
    /// # Errors
    ///
    /// [`DissolveError::ReadBeforeTransfer`] unless [`Self::map`] succeeded
    /// since the last transfer.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, DissolveError> {
        self.state.ensure_mapped(self.label).inspect_err(|e| {
            log::error!("{e}");
        })?;
        let view = self.buffer.slice(..).get_mapped_range();
        let out = f(&view[..]);
        drop(view);
        Ok(out)
    }

    /// Release the mapping so the buffer can receive the next transfer.
    pub fn unmap(&mut self) {
        if self.state == ReadbackState::Mapped {
            self.buffer.unmap();
        }
        self.state = ReadbackState::Idle;
    }

    /// Current position in the transfer/map/unmap cycle.
    pub fn state(&self) -> ReadbackState {
        self.state
    }

    /// Row layout of the staged texture.
    pub fn layout(&self) -> ReadbackLayout {
        self.layout
    }

    /// Debug label, also used in error messages.
    pub fn label(&self) -> &'static str {
        self.label
    }
}
