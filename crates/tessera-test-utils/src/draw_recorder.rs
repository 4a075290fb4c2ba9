//! Trait abstracting the draw-side of a render pass.
//!
//! Implemented for `wgpu::RenderPass` and, with the `mock` feature, for
//! [`MockRenderPass`](crate::MockRenderPass).

use std::ops::Range;

use crate::gpu_types::*;

/// Shader stages that see push constants pushed through [`DrawRecorder`].
pub const PUSH_CONSTANT_STAGES: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX_FRAGMENT;

/// Records state changes and draw calls into a pass.
///
/// Object-safe so the renderer can be written once against
/// `&mut dyn DrawRecorder`.
pub trait DrawRecorder {
    /// Bind a render pipeline.
    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline);

    /// Bind a bind group at `index`.
    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup);

    /// Bind the first `size` bytes of `buffer` to vertex slot `slot`.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, size: u64);

    /// Bind the first `size` bytes of `buffer` as the index buffer.
    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat, size: u64);

    /// Write push constant bytes at `offset` for [`PUSH_CONSTANT_STAGES`].
    fn set_push_constants(&mut self, offset: u32, data: &[u8]);

    /// Non-indexed direct draw.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Indexed direct draw.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Issue `count` non-indexed draws read from `buffer` starting at `offset`.
    fn multi_draw_indirect(&mut self, buffer: &GpuBuffer, offset: u64, count: u32);

    /// Issue `count` indexed draws read from `buffer` starting at `offset`.
    fn multi_draw_indexed_indirect(&mut self, buffer: &GpuBuffer, offset: u64, count: u32);

    /// Open a debug marker group.
    fn push_debug_group(&mut self, label: &str);

    /// Close the innermost debug marker group.
    fn pop_debug_group(&mut self);
}

impl DrawRecorder for wgpu::RenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        wgpu::RenderPass::set_pipeline(self, pipeline.as_wgpu());
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup) {
        wgpu::RenderPass::set_bind_group(self, index, bind_group.as_wgpu(), &[]);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, size: u64) {
        wgpu::RenderPass::set_vertex_buffer(self, slot, buffer.as_wgpu().slice(..size));
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat, size: u64) {
        wgpu::RenderPass::set_index_buffer(self, buffer.as_wgpu().slice(..size), format);
    }

    fn set_push_constants(&mut self, offset: u32, data: &[u8]) {
        wgpu::RenderPass::set_push_constants(self, PUSH_CONSTANT_STAGES, offset, data);
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        wgpu::RenderPass::draw(self, vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        wgpu::RenderPass::draw_indexed(self, indices, base_vertex, instances);
    }

    fn multi_draw_indirect(&mut self, buffer: &GpuBuffer, offset: u64, count: u32) {
        wgpu::RenderPass::multi_draw_indirect(self, buffer.as_wgpu(), offset, count);
    }

    fn multi_draw_indexed_indirect(&mut self, buffer: &GpuBuffer, offset: u64, count: u32) {
        wgpu::RenderPass::multi_draw_indexed_indirect(self, buffer.as_wgpu(), offset, count);
    }

    fn push_debug_group(&mut self, label: &str) {
        wgpu::RenderPass::push_debug_group(self, label);
    }

    fn pop_debug_group(&mut self) {
        wgpu::RenderPass::pop_debug_group(self);
    }
}
