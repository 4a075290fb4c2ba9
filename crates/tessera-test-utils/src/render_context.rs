//! Trait abstracting GPU resource operations for testing.
//!
//! The `RenderContext` trait covers the resource side of the batch pipeline
//! (buffer creation, uploads, destruction, storage bindings). Draw calls go
//! through [`DrawRecorder`](crate::DrawRecorder).

use crate::gpu_types::*;
use wgpu::BufferDescriptor;

/// Trait abstracting GPU resource creation and operations.
///
/// # Lifetime Considerations
///
/// This trait does NOT use lifetimes because:
/// 1. All returned types are owned (not borrowed from Device)
/// 2. GPU resources use reference counting internally
/// 3. Resources live until dropped
///
/// This makes the trait object-safe and easy to mock.
///
/// # Example
///
/// ```rust,no_run
/// use tessera_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload_vertices(ctx: &dyn RenderContext, bytes: &[u8]) {
///     let buffer = ctx.create_buffer(&BufferDescriptor {
///         label: Some("vertices"),
///         size: bytes.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     ctx.write_buffer(&buffer, 0, bytes);
/// }
/// ```
pub trait RenderContext: Send + Sync {
    /// Create a GPU buffer.
    ///
    /// Returns an owned `GpuBuffer` which can be either real or mock.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer.
    ///
    /// For real buffers, this maps to `queue.write_buffer()`, which stages the
    /// data and never waits for the GPU to finish reading previous contents.
    /// For mock buffers, this records the operation for test verification.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Release the GPU memory of a buffer immediately.
    ///
    /// Any later use of the buffer is invalid.
    fn destroy_buffer(&self, buffer: &GpuBuffer);

    /// Create a bind group exposing `size` bytes of `buffer` at binding 0 of
    /// `layout`, used for shader-storage streams.
    fn create_storage_bind_group(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
        size: u64,
    ) -> GpuBindGroup;
}
