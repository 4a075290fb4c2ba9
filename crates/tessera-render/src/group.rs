//! The set of holders one logical draw writes into.

use std::sync::Arc;

use ahash::AHashMap;

use crate::batch::Batch;
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::holder::{IndexDataHolder, StreamDataHolder, VertexDataHolder};

/// Holders for one batch, filled once and handed to the preparer by value.
///
/// The vertex holder always exists. Index, instance and storage holders are
/// created on first access, so their presence tells the preparer which
/// streams were used.
///
/// # Example
///
/// ```rust
/// use tessera_render::{Batch, BatchConfig, BatchDataGroup, DrawMode, VertexLayout};
/// use glam::Vec3;
///
/// # fn main() -> tessera_render::BatchResult<()> {
/// let batch = Batch::new(
///     "points",
///     VertexLayout::new().with_element(wgpu::VertexFormat::Float32x3),
///     DrawMode::POINTS,
/// )
/// .build();
///
/// let mut group = BatchDataGroup::new(batch, &BatchConfig::default());
/// group.vertices().arena().put_vec3(Vec3::ZERO)?;
/// group.vertices().end_element()?;
/// assert_eq!(group.vertex_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BatchDataGroup {
    batch: Arc<Batch>,
    vertices: VertexDataHolder,
    indices: Option<IndexDataHolder>,
    instances: Option<StreamDataHolder>,
    storage: AHashMap<String, StreamDataHolder>,
    index_capacity: usize,
    instance_capacity: usize,
    storage_capacity: usize,
}

impl BatchDataGroup {
    pub fn new(batch: Arc<Batch>, config: &BatchConfig) -> Self {
        let vertices =
            VertexDataHolder::new(batch.vertex_layout.stride(), config.vertex_arena_capacity);
        Self {
            batch,
            vertices,
            indices: None,
            instances: None,
            storage: AHashMap::new(),
            index_capacity: config.index_arena_capacity,
            instance_capacity: config.instance_arena_capacity,
            storage_capacity: config.storage_arena_capacity,
        }
    }

    pub fn batch(&self) -> &Arc<Batch> {
        &self.batch
    }

    #[inline]
    pub fn vertices(&mut self) -> &mut VertexDataHolder {
        &mut self.vertices
    }

    /// Index holder, created in the batch's index format on first use.
    pub fn indices(&mut self) -> &mut IndexDataHolder {
        let format = self.batch.index_format;
        let capacity = self.index_capacity;
        self.indices
            .get_or_insert_with(|| IndexDataHolder::new(format, capacity))
    }

    /// Instance holder. Fails when the batch has no instance layout.
    pub fn instances(&mut self) -> BatchResult<&mut StreamDataHolder> {
        let Some(layout) = &self.batch.instance_layout else {
            return Err(BatchError::MissingInstanceLayout);
        };
        let stride = layout.stride();
        let capacity = self.instance_capacity;
        Ok(self
            .instances
            .get_or_insert_with(|| StreamDataHolder::new("instance", stride, capacity)))
    }

    /// Holder of the storage stream `name`. Fails for names the batch does
    /// not declare.
    pub fn storage(&mut self, name: &str) -> BatchResult<&mut StreamDataHolder> {
        let Some(layout) = self.batch.storage_layout(name) else {
            return Err(BatchError::UnknownStorageStream {
                name: name.to_string(),
            });
        };
        let stride = layout.stride;
        let capacity = self.storage_capacity;
        Ok(self
            .storage
            .entry(name.to_string())
            .or_insert_with(|| StreamDataHolder::new("storage", stride, capacity)))
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.count()
    }

    pub fn has_indices(&self) -> bool {
        self.indices.is_some()
    }

    pub fn has_instances(&self) -> bool {
        self.instances.is_some()
    }

    pub(crate) fn into_parts(self) -> GroupParts {
        GroupParts {
            batch: self.batch,
            vertices: self.vertices,
            indices: self.indices,
            instances: self.instances,
            storage: self.storage,
        }
    }
}

/// A group taken apart by the preparer.
pub(crate) struct GroupParts {
    pub batch: Arc<Batch>,
    pub vertices: VertexDataHolder,
    pub indices: Option<IndexDataHolder>,
    pub instances: Option<StreamDataHolder>,
    pub storage: AHashMap<String, StreamDataHolder>,
}
