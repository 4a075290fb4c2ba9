//! Mock implementations of [`RenderContext`] and [`DrawRecorder`] for testing.
//!
//! The context records resource operations and keeps the bytes written to
//! each mock buffer; the pass records every state change and draw call.

use std::ops::Range;

use crate::{draw_recorder::DrawRecorder, gpu_types::*, render_context::RenderContext};
use parking_lot::Mutex;
use wgpu::*;

/// Records a GPU resource operation for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        buffer_id: usize,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    DestroyBuffer {
        buffer_id: usize,
    },
    CreateBindGroup {
        bind_group_id: usize,
        buffer_id: usize,
        label: Option<String>,
    },
}

/// Mock buffers stored in the context.
#[derive(Debug, Clone)]
struct MockBuffer {
    size: u64,
    usage: BufferUsages,
    contents: Vec<u8>,
    destroyed: bool,
}

/// Mock implementation of RenderContext for testing.
///
/// # Borrow Checking Pattern: Interior Mutability
///
/// Methods take `&self` but need to mutate internal state (record calls).
/// `parking_lot::Mutex` keeps the type `Send + Sync`, as the trait requires.
///
/// # Example
///
/// ```rust
/// use tessera_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
///
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 1024,
///     usage: BufferUsages::VERTEX,
///     mapped_at_creation: false,
/// });
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
pub struct MockRenderContext {
    /// Recorded calls for verification
    calls: Mutex<Vec<RenderCall>>,

    /// Mock buffers (we don't create real GPU buffers)
    buffers: Mutex<Vec<MockBuffer>>,

    next_bind_group_id: Mutex<usize>,
}

impl MockRenderContext {
    /// Create a new mock render context.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            next_bind_group_id: Mutex::new(0),
        }
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// Count buffer creations.
    pub fn count_buffer_creates(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::CreateBuffer { .. }))
            .count()
    }

    /// Count buffer creations whose usage contains `usage`.
    pub fn count_buffer_creates_with(&self, usage: BufferUsages) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| {
                matches!(call, RenderCall::CreateBuffer { usage: u, .. } if u.contains(usage))
            })
            .count()
    }

    /// Count buffer write operations.
    pub fn count_buffer_writes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::WriteBuffer { .. }))
            .count()
    }

    /// Count buffer destructions.
    pub fn count_buffer_destroys(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::DestroyBuffer { .. }))
            .count()
    }

    /// Count bind group creations.
    pub fn count_bind_group_creates(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::CreateBindGroup { .. }))
            .count()
    }

    /// Bytes currently held by a mock buffer.
    pub fn buffer_contents(&self, buffer_id: usize) -> Option<Vec<u8>> {
        self.buffers.lock().get(buffer_id).map(|b| b.contents.clone())
    }

    /// Usage flags a mock buffer was created with.
    pub fn buffer_usage(&self, buffer_id: usize) -> Option<BufferUsages> {
        self.buffers.lock().get(buffer_id).map(|b| b.usage)
    }

    /// Whether a mock buffer has been destroyed.
    pub fn is_destroyed(&self, buffer_id: usize) -> bool {
        self.buffers
            .lock()
            .get(buffer_id)
            .is_some_and(|b| b.destroyed)
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let mut buffers = self.buffers.lock();
        let id = buffers.len();

        buffers.push(MockBuffer {
            size: desc.size,
            usage: desc.usage,
            contents: vec![0; desc.size as usize],
            destroyed: false,
        });

        self.calls.lock().push(RenderCall::CreateBuffer {
            buffer_id: id,
            size: desc.size,
            usage: desc.usage,
        });

        GpuBuffer::mock(id, desc.size)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        {
            let mut buffers = self.buffers.lock();
            let mock = &mut buffers[buffer_id];
            assert!(!mock.destroyed, "write to destroyed mock buffer {buffer_id}");
            let end = offset as usize + data.len();
            assert!(
                end as u64 <= mock.size,
                "write of {} bytes at {} exceeds mock buffer {} of size {}",
                data.len(),
                offset,
                buffer_id,
                mock.size
            );
            mock.contents[offset as usize..end].copy_from_slice(data);
        }

        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        self.buffers.lock()[buffer_id].destroyed = true;
        self.calls.lock().push(RenderCall::DestroyBuffer { buffer_id });
    }

    fn create_storage_bind_group(
        &self,
        label: Option<&str>,
        _layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
        _size: u64,
    ) -> GpuBindGroup {
        let mut id = self.next_bind_group_id.lock();
        let bind_group_id = *id;
        *id += 1;

        self.calls.lock().push(RenderCall::CreateBindGroup {
            bind_group_id,
            buffer_id: buffer.mock_id().unwrap_or(usize::MAX),
            label: label.map(|s| s.to_string()),
        });

        GpuBindGroup::mock(bind_group_id)
    }
}

/// Records a pass command for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    SetPipeline {
        pipeline_id: Option<usize>,
    },
    SetBindGroup {
        index: u32,
        bind_group_id: Option<usize>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer_id: Option<usize>,
        size: u64,
    },
    SetIndexBuffer {
        buffer_id: Option<usize>,
        format: IndexFormat,
        size: u64,
    },
    SetPushConstants {
        offset: u32,
        data: Vec<u8>,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
    MultiDrawIndirect {
        buffer_id: Option<usize>,
        offset: u64,
        count: u32,
    },
    MultiDrawIndexedIndirect {
        buffer_id: Option<usize>,
        offset: u64,
        count: u32,
    },
    PushDebugGroup(String),
    PopDebugGroup,
}

/// Mock render pass recording every command it receives.
#[derive(Debug, Default)]
pub struct MockRenderPass {
    calls: Vec<DrawCall>,
}

impl MockRenderPass {
    /// Create an empty pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded commands, in order.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Number of direct draw calls (`draw` + `draw_indexed`).
    pub fn count_direct_draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Draw { .. } | DrawCall::DrawIndexed { .. }))
            .count()
    }

    /// Number of indirect multi-draw calls.
    pub fn count_indirect_draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    DrawCall::MultiDrawIndirect { .. } | DrawCall::MultiDrawIndexedIndirect { .. }
                )
            })
            .count()
    }

    /// Draw-issuing calls only, in order.
    pub fn draws(&self) -> Vec<DrawCall> {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    DrawCall::Draw { .. }
                        | DrawCall::DrawIndexed { .. }
                        | DrawCall::MultiDrawIndirect { .. }
                        | DrawCall::MultiDrawIndexedIndirect { .. }
                )
            })
            .cloned()
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl DrawRecorder for MockRenderPass {
    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        self.calls.push(DrawCall::SetPipeline {
            pipeline_id: pipeline.mock_id(),
        });
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup) {
        self.calls.push(DrawCall::SetBindGroup {
            index,
            bind_group_id: bind_group.mock_id(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, size: u64) {
        self.calls.push(DrawCall::SetVertexBuffer {
            slot,
            buffer_id: buffer.mock_id(),
            size,
        });
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: IndexFormat, size: u64) {
        self.calls.push(DrawCall::SetIndexBuffer {
            buffer_id: buffer.mock_id(),
            format,
            size,
        });
    }

    fn set_push_constants(&mut self, offset: u32, data: &[u8]) {
        self.calls.push(DrawCall::SetPushConstants {
            offset,
            data: data.to_vec(),
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.calls.push(DrawCall::Draw {
            vertices,
            instances,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.calls.push(DrawCall::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    fn multi_draw_indirect(&mut self, buffer: &GpuBuffer, offset: u64, count: u32) {
        self.calls.push(DrawCall::MultiDrawIndirect {
            buffer_id: buffer.mock_id(),
            offset,
            count,
        });
    }

    fn multi_draw_indexed_indirect(&mut self, buffer: &GpuBuffer, offset: u64, count: u32) {
        self.calls.push(DrawCall::MultiDrawIndexedIndirect {
            buffer_id: buffer.mock_id(),
            offset,
            count,
        });
    }

    fn push_debug_group(&mut self, label: &str) {
        self.calls.push(DrawCall::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.calls.push(DrawCall::PopDebugGroup);
    }
}
