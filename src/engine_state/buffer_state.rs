//! # Buffer State Module
//!
//! This module is the seam between the chunk geometry code and the GPU. Buffers are
//! created, sized and written through the [`GpuBackend`] trait, referenced by name
//! (static string), and every backend tracks usage analytics per buffer.
//!
//! ## Backends
//!
//! * [`BufferState`]: host-memory buffers. Used for headless sessions and tests, where the
//!   written bytes can be read back and checked.
//! * [`WgpuBackend`]: real GPU buffers on a caller-provided `wgpu::Device` and `wgpu::Queue`.
//!
//! ## Bounds
//!
//! A write that would cross the end of its buffer is refused with
//! [`BufferError::OutOfBounds`] before anything is copied. Callers decide whether that is
//! fatal; the geometry arena logs it and skips the copy.

use std::collections::HashMap;

use log::{debug, trace};
use wgpu::{Buffer, BufferUsages, Device, Queue};

/// Errors raised by buffer operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BufferError {
    /// No buffer with this name was created.
    #[error("buffer '{0}' does not exist")]
    UnknownBuffer(&'static str),
    /// The write would cross the end of the buffer.
    #[error("write of {len} bytes at offset {offset} exceeds buffer '{name}' of {size} bytes")]
    OutOfBounds {
        /// Buffer name.
        name: &'static str,
        /// Requested byte offset.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Buffer size.
        size: u64,
    },
    /// Offset or length violates the copy alignment.
    #[error("write at offset {offset} with {len} bytes to '{name}' is not {alignment}-byte aligned")]
    Unaligned {
        /// Buffer name.
        name: &'static str,
        /// Requested byte offset.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Required alignment.
        alignment: u64,
    },
}

/// Analytics data for a buffer
///
/// Tracks memory allocation, usage, and write operations for a buffer
/// to help identify optimization opportunities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Highest byte written so far
    pub used_memory: u64,
    /// Number of times the buffer has been written to
    pub times_written: u64,
}

impl BufferAnalytics {
    fn new(allocated_memory: u64) -> Self {
        Self {
            allocated_memory,
            ..Self::default()
        }
    }

    fn check_write(&self, name: &'static str, offset: u64, len: u64) -> Result<(), BufferError> {
        let alignment = wgpu::COPY_BUFFER_ALIGNMENT;
        if offset % alignment != 0 || len % alignment != 0 {
            return Err(BufferError::Unaligned {
                name,
                offset,
                len,
                alignment,
            });
        }
        match offset.checked_add(len) {
            Some(end) if end <= self.allocated_memory => Ok(()),
            _ => Err(BufferError::OutOfBounds {
                name,
                offset,
                len,
                size: self.allocated_memory,
            }),
        }
    }

    fn record_write(&mut self, offset: u64, len: u64) {
        self.used_memory = self.used_memory.max(offset + len);
        self.times_written += 1;
    }
}

/// The operations the geometry arena needs from a GPU.
pub trait GpuBackend {
    /// Creates (or recreates) a zeroed buffer of `size` bytes.
    fn create_buffer(&mut self, name: &'static str, size: u64, usage: BufferUsages);

    /// Size of a buffer in bytes, `None` if it does not exist.
    fn buffer_size(&self, name: &'static str) -> Option<u64>;

    /// Copies `data` into the buffer at `offset`.
    fn write_buffer(&mut self, name: &'static str, offset: u64, data: &[u8]) -> Result<(), BufferError>;

    /// Analytics for a buffer.
    fn analytics(&self, name: &'static str) -> Option<BufferAnalytics>;
}

/// Host-memory buffers with the same bounds rules as the GPU.
///
/// # Examples
///
/// ```ignore
/// let mut buffer_state = BufferState::new();
/// buffer_state.create_buffer("vertex_buffer", 1024, wgpu::BufferUsages::VERTEX);
/// buffer_state.write_buffer("vertex_buffer", 0, &[0u8; 36])?;
/// assert_eq!(buffer_state.get_total_used_memory(), 36);
/// ```
#[derive(Debug, Default)]
pub struct BufferState {
    buffers: HashMap<&'static str, Vec<u8>>,
    buffer_analytics: HashMap<&'static str, BufferAnalytics>,
}

impl BufferState {
    /// Creates a buffer state with no buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads back a buffer's contents.
    pub fn read_buffer(&self, buffer_name: &'static str) -> Option<&[u8]> {
        self.buffers.get(buffer_name).map(Vec::as_slice)
    }

    /// Gets the total allocated memory across all buffers
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .map(|analytics| analytics.allocated_memory)
            .sum()
    }

    /// Gets the total used memory across all buffers
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .map(|analytics| analytics.used_memory)
            .sum()
    }
}

impl GpuBackend for BufferState {
    fn create_buffer(&mut self, name: &'static str, size: u64, usage: BufferUsages) {
        debug!("Creating host buffer '{}' ({} bytes, {:?})", name, size, usage);
        self.buffers.insert(name, vec![0; size as usize]);
        self.buffer_analytics.insert(name, BufferAnalytics::new(size));
    }

    fn buffer_size(&self, name: &'static str) -> Option<u64> {
        self.buffer_analytics
            .get(name)
            .map(|analytics| analytics.allocated_memory)
    }

    fn write_buffer(&mut self, name: &'static str, offset: u64, data: &[u8]) -> Result<(), BufferError> {
        let analytics = self
            .buffer_analytics
            .get_mut(name)
            .ok_or(BufferError::UnknownBuffer(name))?;
        let buffer = self
            .buffers
            .get_mut(name)
            .ok_or(BufferError::UnknownBuffer(name))?;

        let len = data.len() as u64;
        analytics.check_write(name, offset, len)?;

        let start = offset as usize;
        buffer[start..start + data.len()].copy_from_slice(data);
        analytics.record_write(offset, len);
        trace!("Wrote {} bytes to '{}' at {}", len, name, offset);
        Ok(())
    }

    fn analytics(&self, name: &'static str) -> Option<BufferAnalytics> {
        self.buffer_analytics.get(name).copied()
    }
}

/// GPU buffers on a wgpu device.
pub struct WgpuBackend {
    /// The device buffers are created on
    pub device: Device,
    /// The queue writes are submitted to
    pub queue: Queue,
    buffers: HashMap<&'static str, Buffer>,
    buffer_analytics: HashMap<&'static str, BufferAnalytics>,
}

impl WgpuBackend {
    /// Wraps an existing device and queue.
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            buffer_analytics: HashMap::new(),
        }
    }

    /// Gets a buffer by name.
    pub fn get_buffer(&self, buffer_name: &'static str) -> Option<&Buffer> {
        self.buffers.get(buffer_name)
    }
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(&mut self, name: &'static str, size: u64, usage: BufferUsages) {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(name),
            size,
            usage,
            mapped_at_creation: false,
        });
        debug!("Creating GPU buffer '{}' ({} bytes, {:?})", name, size, usage);
        self.buffers.insert(name, buffer);
        self.buffer_analytics.insert(name, BufferAnalytics::new(size));
    }

    fn buffer_size(&self, name: &'static str) -> Option<u64> {
        self.buffers.get(name).map(Buffer::size)
    }

    fn write_buffer(&mut self, name: &'static str, offset: u64, data: &[u8]) -> Result<(), BufferError> {
        let buffer = self.buffers.get(name).ok_or(BufferError::UnknownBuffer(name))?;
        let analytics = self
            .buffer_analytics
            .get_mut(name)
            .ok_or(BufferError::UnknownBuffer(name))?;

        let len = data.len() as u64;
        analytics.check_write(name, offset, len)?;

        self.queue.write_buffer(buffer, offset, data);
        analytics.record_write(offset, len);
        Ok(())
    }

    fn analytics(&self, name: &'static str) -> Option<BufferAnalytics> {
        self.buffer_analytics.get(name).copied()
    }
}
