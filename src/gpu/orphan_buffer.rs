//! Streaming GPU buffer with orphan-before-write semantics
//!
//! Every upload replaces the buffer's storage with a fresh allocation before
//! writing, so the CPU never waits on a draw from an earlier frame that is
//! still reading the old storage. The old allocation is released by wgpu
//! once the GPU is done with it.

/// A vertex/storage buffer that is orphaned on every upload.
///
/// Capacity only grows (2x strategy, like a `Vec`); each upload allocates
/// fresh storage of the current capacity.
pub struct OrphaningBuffer {
    buffer: wgpu::Buffer,
    capacity: usize, // Capacity in bytes
    len: usize,      // Bytes written by the last upload
    usage: wgpu::BufferUsages,
    label: String,
}

impl OrphaningBuffer {
    /// Buffer with the given initial byte capacity.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = initial_capacity.max(64); // Minimum 64 bytes
        let buffer = allocate(device, label, capacity, usage);

        Self {
            buffer,
            capacity,
            len: 0,
            usage,
            label: label.to_owned(),
        }
    }

    /// Orphan the current storage and upload `data` into a fresh
    /// allocation.
    ///
    /// Returns `true` if capacity grew (bind groups referencing the buffer
    /// need recreation either way, since the handle changes).
    pub fn orphan_and_upload<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        let data_bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = data_bytes.len();

        let grew = needed > self.capacity;
        if grew {
            // 2x growth, minimum 1KB
            self.capacity = (needed * 2).max(self.capacity + 1024);
            log::debug!(
                "{}: growing to {} bytes",
                self.label,
                self.capacity
            );
        }

        // Same-size reallocation; contents are "don't care" until written.
        self.buffer = allocate(device, &self.label, self.capacity, self.usage);

        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, data_bytes);
        }
        self.len = needed;

        grew
    }

    /// The current storage. Changes on every upload.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bytes written by the last upload.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the last upload was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn allocate(
    device: &wgpu::Device,
    label: &str,
    capacity: usize,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: capacity as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
