//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the dissolve-fx crate.
#[derive(Debug)]
pub enum DissolveError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// The offscreen capture target cannot be created at this size.
    InvalidTarget {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
        /// Largest 2D texture dimension the device supports.
        max: u32,
    },
    /// A staging buffer was mapped or read before any transfer into it.
    ReadBeforeTransfer {
        /// Label of the offending staging buffer.
        buffer: &'static str,
    },
    /// A staging buffer was re-used while its previous contents were still
    /// mapped.
    BufferBusy {
        /// Label of the offending staging buffer.
        buffer: &'static str,
    },
    /// The GPU failed to map a staging buffer for reading.
    MapFailed {
        /// Label of the staging buffer.
        buffer: &'static str,
        /// Underlying wgpu error.
        source: wgpu::BufferAsyncError,
    },
    /// Waiting on the device failed.
    Poll(wgpu::PollError),
    /// A captured frame whose buffers do not match its dimensions.
    FrameSize {
        /// Expected length of the offending buffer.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Generic I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for DissolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::InvalidTarget { width, height, max } => write!(
                f,
                "offscreen target {width}x{height} is incomplete (max \
                 dimension {max})"
            ),
            Self::ReadBeforeTransfer { buffer } => {
                write!(f, "can't read '{buffer}' before a pixel transfer")
            }
            Self::BufferBusy { buffer } => {
                write!(f, "'{buffer}' is still mapped; unmap it first")
            }
            Self::MapFailed { buffer, source } => {
                write!(f, "failed to map '{buffer}': {source}")
            }
            Self::Poll(e) => write!(f, "device poll failed: {e}"),
            Self::FrameSize { expected, actual } => write!(
                f,
                "captured frame buffer has {actual} elements, expected \
                 {expected}"
            ),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for DissolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::MapFailed { source, .. } => Some(source),
            Self::Poll(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for DissolveError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<wgpu::PollError> for DissolveError {
    fn from(e: wgpu::PollError) -> Self {
        Self::Poll(e)
    }
}

impl From<std::io::Error> for DissolveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
