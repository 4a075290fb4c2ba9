//! Shared index block for quad batches.
//!
//! Every quad batch uses the same index pattern, so one block of `0,1,2, 2,3,0`
//! indices (offset by 4 per quad) is shared by reference. When a batch needs
//! more quads than the current block holds, a new, larger block replaces it.
//! Blocks are immutable once built: a prepared buffer that holds an older
//! block keeps a complete, valid block for as long as it lives.

use std::sync::{Arc, OnceLock};

use tessera_test_utils::{GpuBuffer, RenderContext};

/// Indices of one quad, relative to its first vertex.
pub const QUAD_INDEX_PATTERN: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Build indices for `quads` quads.
pub fn generate_quad_indices(quads: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(quads as usize * 6);
    for quad in 0..quads {
        let base = quad * 4;
        indices.extend(QUAD_INDEX_PATTERN.iter().map(|i| base + i));
    }
    indices
}

/// An immutable block of quad indices with a lazily uploaded GPU copy.
#[derive(Debug)]
pub struct QuadIndexBlock {
    quads: u32,
    indices: Vec<u32>,
    gpu: OnceLock<GpuBuffer>,
}

impl QuadIndexBlock {
    fn new(quads: u32) -> Self {
        Self {
            quads,
            indices: generate_quad_indices(quads),
            gpu: OnceLock::new(),
        }
    }

    /// Number of quads the block covers.
    pub fn quad_capacity(&self) -> u32 {
        self.quads
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// The block's GPU index buffer, uploaded on first request.
    ///
    /// The buffer belongs to the block, never to a pool.
    pub fn gpu_buffer(&self, context: &dyn RenderContext) -> &GpuBuffer {
        self.gpu.get_or_init(|| {
            let bytes = self.bytes();
            let buffer = context.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Shared Quad Indices"),
                size: bytes.len() as u64,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            context.write_buffer(&buffer, 0, bytes);
            tracing::debug!("Uploaded shared quad index block ({} quads)", self.quads);
            buffer
        })
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.get().is_some()
    }
}

/// Grows the shared quad block on demand. Never shrinks.
#[derive(Debug)]
pub struct QuadIndexCache {
    current: Option<Arc<QuadIndexBlock>>,
    initial_quads: u32,
}

impl QuadIndexCache {
    pub fn new(initial_quads: u32) -> Self {
        Self {
            current: None,
            initial_quads,
        }
    }

    /// A block covering at least `quads` quads.
    ///
    /// Grows to `max(quads, 2 * current)` when the current block is too small.
    pub fn ensure(&mut self, quads: u32) -> Arc<QuadIndexBlock> {
        match &self.current {
            Some(block) if block.quads >= quads => block.clone(),
            current => {
                let size = match current {
                    Some(block) => quads.max(block.quads.saturating_mul(2)),
                    None => quads.max(self.initial_quads),
                };
                tracing::debug!("Growing shared quad index block to {} quads", size);
                let block = Arc::new(QuadIndexBlock::new(size));
                self.current = Some(block.clone());
                block
            }
        }
    }

    /// Quads covered by the current block (0 before first use).
    pub fn capacity(&self) -> u32 {
        self.current.as_ref().map_or(0, |block| block.quads)
    }

    /// Drop the cache's reference to the current block.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern() {
        assert_eq!(
            generate_quad_indices(2),
            vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]
        );
    }

    #[test]
    fn test_ensure_reuses_block() {
        let mut cache = QuadIndexCache::new(16);
        let a = cache.ensure(4);
        let b = cache.ensure(16);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.quad_capacity(), 16);
    }

    #[test]
    fn test_growth_doubles_or_satisfies() {
        let mut cache = QuadIndexCache::new(4);
        let small = cache.ensure(1);
        assert_eq!(small.quad_capacity(), 4);

        let doubled = cache.ensure(5);
        assert_eq!(doubled.quad_capacity(), 8);

        let large = cache.ensure(100);
        assert_eq!(large.quad_capacity(), 100);
        assert_eq!(cache.capacity(), 100);

        // Older blocks stay intact for holders that still reference them.
        assert_eq!(small.indices().len(), 24);
        assert_eq!(doubled.indices()[42..48], [28, 29, 30, 30, 31, 28]);
    }
}
