//! Vertex input state shared by batches with identical layouts.
//!
//! A [`VertexInputState`] owns the attribute lists of the vertex slot and, for
//! instanced batches, the instance slot. Pipelines built for a batch use
//! [`VertexInputState::buffer_layouts`] so their vertex inputs match what the
//! renderer binds.

use std::sync::Arc;

use ahash::HashMap;

use tessera_core::profiling::profile_function;

use crate::layout::VertexLayout;

/// Vertex buffer slot of the per-vertex stream.
pub const VERTEX_SLOT: u32 = 0;
/// Vertex buffer slot of the per-instance stream.
pub const INSTANCE_SLOT: u32 = 1;

/// Cache key: the vertex layout and the optional instance layout.
pub type VertexStateKey = (VertexLayout, Option<VertexLayout>);

/// Attribute lists for the vertex and instance slots.
///
/// Shader locations are assigned in order, instance attributes continuing
/// after the last vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInputState {
    vertex_stride: u64,
    vertex_attributes: Vec<wgpu::VertexAttribute>,
    instance_stride: u64,
    instance_attributes: Option<Vec<wgpu::VertexAttribute>>,
}

impl VertexInputState {
    pub fn new(vertex: &VertexLayout, instance: Option<&VertexLayout>) -> Self {
        let vertex_attributes = vertex.attributes(0);
        let next_location = vertex_attributes.len() as u32;
        Self {
            vertex_stride: vertex.stride() as u64,
            vertex_attributes,
            instance_stride: instance.map_or(0, |layout| layout.stride() as u64),
            instance_attributes: instance.map(|layout| layout.attributes(next_location)),
        }
    }

    pub fn vertex_attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.vertex_attributes
    }

    pub fn instance_attributes(&self) -> Option<&[wgpu::VertexAttribute]> {
        self.instance_attributes.as_deref()
    }

    pub fn is_instanced(&self) -> bool {
        self.instance_attributes.is_some()
    }

    /// Layouts for `wgpu::VertexState::buffers`, indexed by slot.
    pub fn buffer_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        let mut layouts = vec![wgpu::VertexBufferLayout {
            array_stride: self.vertex_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.vertex_attributes,
        }];
        if let Some(attributes) = &self.instance_attributes {
            layouts.push(wgpu::VertexBufferLayout {
                array_stride: self.instance_stride,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes,
            });
        }
        layouts
    }
}

/// Shares one [`VertexInputState`] per layout combination.
#[derive(Debug, Default)]
pub struct VertexStateCache {
    cache: HashMap<VertexStateKey, Arc<VertexInputState>>,
}

impl VertexStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shared state for these layouts, creating it on first use.
    pub fn get_or_create(
        &mut self,
        vertex: &VertexLayout,
        instance: Option<&VertexLayout>,
    ) -> Arc<VertexInputState> {
        profile_function!();
        let key = (vertex.clone(), instance.cloned());
        if let Some(state) = self.cache.get(&key) {
            return Arc::clone(state);
        }

        let state = Arc::new(VertexInputState::new(vertex, instance));
        self.cache.insert(key, Arc::clone(&state));
        state
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
