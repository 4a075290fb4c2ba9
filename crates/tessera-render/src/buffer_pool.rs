//! Pool of GPU buffers reused across frames by temporary batches.
//!
//! Buffers are bucketed by usage. A request takes the smallest free buffer of
//! that usage that fits; otherwise a new buffer is created, rounded up to the
//! next power of two for better reuse.
//!
//! `queue.write_buffer` lands before the whole submission executes, so a
//! buffer drawn from this frame must not be rewritten until the frame is
//! submitted. Recycled buffers therefore wait in flight until
//! [`BufferPool::next_frame`].
//!
//! ```ignore
//! use tessera_render::*;
//!
//! let mut pool = BufferPool::new(256);
//!
//! let buffer = pool.borrow(ctx.as_ref(), wgpu::BufferUsages::VERTEX, 4096);
//! ctx.write_buffer(&buffer, 0, &data);
//!
//! // Return it once the frame's draws are recorded
//! pool.recycle(wgpu::BufferUsages::VERTEX, buffer);
//!
//! // After queue.submit()
//! pool.next_frame();
//! ```

use ahash::AHashMap;

use tessera_core::profiling::profile_function;
use tessera_test_utils::{GpuBuffer, RenderContext};

/// Pooled GPU buffers, bucketed by usage.
#[derive(Debug)]
pub struct BufferPool {
    /// Available buffers per usage.
    available: AHashMap<wgpu::BufferUsages, Vec<GpuBuffer>>,
    /// Recycled this frame, still read by recorded draws.
    in_flight: Vec<(wgpu::BufferUsages, GpuBuffer)>,
    min_size: u64,
    hits: u64,
    misses: u64,
}

impl BufferPool {
    /// Create an empty pool whose new buffers are at least `min_size` bytes.
    pub fn new(min_size: u64) -> Self {
        Self {
            available: AHashMap::new(),
            in_flight: Vec::new(),
            min_size: min_size.max(4),
            hits: 0,
            misses: 0,
        }
    }

    /// Take a buffer of `usage` holding at least `size` bytes.
    ///
    /// `COPY_DST` is always added to `usage` so the buffer can be written.
    pub fn borrow(
        &mut self,
        context: &dyn RenderContext,
        usage: wgpu::BufferUsages,
        size: u64,
    ) -> GpuBuffer {
        profile_function!();
        let usage = usage | wgpu::BufferUsages::COPY_DST;

        if let Some(buffers) = self.available.get_mut(&usage) {
            // Smallest buffer that fits
            let mut best_idx = None;
            let mut best_size = u64::MAX;
            for (idx, buffer) in buffers.iter().enumerate() {
                if buffer.size() >= size && buffer.size() < best_size {
                    best_idx = Some(idx);
                    best_size = buffer.size();
                }
            }

            if let Some(idx) = best_idx {
                self.hits += 1;
                return buffers.swap_remove(idx);
            }
        }

        self.misses += 1;
        let rounded_size = size.next_power_of_two().max(self.min_size);
        tracing::debug!(
            "Buffer pool miss: creating {:?} buffer of {} bytes for {} requested",
            usage,
            rounded_size,
            size
        );
        context.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pooled Batch Buffer"),
            size: rounded_size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Return a buffer borrowed with `usage`. It becomes available again
    /// after the next [`next_frame`](Self::next_frame).
    pub fn recycle(&mut self, usage: wgpu::BufferUsages, buffer: GpuBuffer) {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        self.in_flight.push((usage, buffer));
    }

    /// Make the buffers recycled since the last call available again.
    ///
    /// Call once the frame that drew from them has been submitted.
    pub fn next_frame(&mut self) {
        for (usage, buffer) in self.in_flight.drain(..) {
            self.available.entry(usage).or_default().push(buffer);
        }
    }

    /// Destroy every available and in-flight buffer.
    pub fn clear(&mut self, context: &dyn RenderContext) {
        let in_flight = self.in_flight.drain(..).map(|(_, buffer)| buffer);
        let available = self.available.drain().flat_map(|(_, buffers)| buffers);
        for buffer in in_flight.chain(available) {
            context.destroy_buffer(&buffer);
        }
    }

    /// Number of available buffers.
    pub fn available_count(&self) -> usize {
        self.available.values().map(Vec::len).sum()
    }

    /// Number of recycled buffers waiting for [`next_frame`](Self::next_frame).
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Total size of available buffers.
    pub fn total_available_size(&self) -> u64 {
        self.available
            .values()
            .flatten()
            .map(GpuBuffer::size)
            .sum()
    }

    /// Borrows served from the pool.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Borrows that created a new buffer.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
