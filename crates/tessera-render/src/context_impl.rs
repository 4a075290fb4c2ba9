//! Implementation of the RenderContext trait for GraphicsContext.
//!
//! This lets the batch pipeline run against a real device or, in tests,
//! against MockRenderContext.

use std::num::NonZeroU64;

use crate::graphics::GraphicsContext;
use tessera_test_utils::{GpuBindGroup, GpuBindGroupLayout, GpuBuffer, RenderContext};
use wgpu::BufferDescriptor;

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let buffer = self.device.create_buffer(desc);
        GpuBuffer::from_wgpu(buffer)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let wgpu_buffer = buffer.as_wgpu();
        self.queue.write_buffer(wgpu_buffer, offset, data);
    }

    fn destroy_buffer(&self, buffer: &GpuBuffer) {
        buffer.as_wgpu().destroy();
    }

    fn create_storage_bind_group(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
        size: u64,
    ) -> GpuBindGroup {
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: layout.as_wgpu(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: buffer.as_wgpu(),
                    offset: 0,
                    size: NonZeroU64::new(size),
                }),
            }],
        });
        GpuBindGroup::from_wgpu(bind_group)
    }
}
