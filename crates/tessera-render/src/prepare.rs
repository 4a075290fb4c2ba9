//! Turns a filled [`BatchDataGroup`] into a [`PreparedBuffer`].
//!
//! Preparation validates the group, resolves index data (explicit, shared
//! quad block, or optimized) and derives the draw commands. It never touches
//! the GPU.

use std::sync::Arc;

use ahash::AHashMap;

use tessera_core::profiling::{profile_function, profile_scope};

use crate::batch::Batch;
use crate::command::{DrawCommand, DrawIndexedIndirect, DrawIndirect};
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::group::{BatchDataGroup, GroupParts};
use crate::holder::IndexFormat;
use crate::meshopt::{MeshOptimizer, optimize_mesh};
use crate::quad_cache::{QuadIndexBlock, QuadIndexCache, generate_quad_indices};

/// Index data of a prepared buffer.
#[derive(Debug, Clone)]
pub enum IndexData {
    /// Indices owned by this buffer.
    Owned { format: IndexFormat, bytes: Vec<u8> },
    /// The first `count` indices of a shared quad block.
    SharedQuads {
        block: Arc<QuadIndexBlock>,
        count: u32,
    },
}

impl IndexData {
    pub fn format(&self) -> IndexFormat {
        match self {
            IndexData::Owned { format, .. } => *format,
            IndexData::SharedQuads { .. } => IndexFormat::Uint32,
        }
    }

    /// Number of indices drawn.
    pub fn count(&self) -> u32 {
        match self {
            IndexData::Owned { format, bytes } => (bytes.len() / format.size()) as u32,
            IndexData::SharedQuads { count, .. } => *count,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, IndexData::SharedQuads { .. })
    }
}

/// CPU-side result of preparing a group, consumed once by the realizer.
#[derive(Debug)]
pub struct PreparedBuffer {
    pub(crate) batch: Arc<Batch>,
    pub(crate) vertices: Vec<u8>,
    pub(crate) vertex_count: u32,
    pub(crate) instances: Option<Vec<u8>>,
    pub(crate) instance_count: u32,
    pub(crate) indices: Option<IndexData>,
    pub(crate) storage: AHashMap<String, Vec<u8>>,
    pub(crate) commands: Vec<DrawCommand>,
}

impl PreparedBuffer {
    pub fn batch(&self) -> &Arc<Batch> {
        &self.batch
    }

    pub fn vertices(&self) -> &[u8] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn instances(&self) -> Option<&[u8]> {
        self.instances.as_deref()
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn indices(&self) -> Option<&IndexData> {
        self.indices.as_ref()
    }

    pub fn storage(&self, name: &str) -> Option<&[u8]> {
        self.storage.get(name).map(Vec::as_slice)
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Total CPU bytes this buffer will upload, excluding shared quad indices.
    pub fn byte_size(&self) -> usize {
        let indices = match &self.indices {
            Some(IndexData::Owned { bytes, .. }) => bytes.len(),
            _ => 0,
        };
        self.vertices.len()
            + self.instances.as_ref().map_or(0, Vec::len)
            + indices
            + self.storage.values().map(Vec::len).sum::<usize>()
    }
}

fn validate(parts: &GroupParts) -> BatchResult<()> {
    let mode = parts.batch.mode;

    parts.vertices.check_complete()?;
    if let Some(indices) = &parts.indices {
        indices.check_complete()?;
    }
    if let Some(instances) = &parts.instances {
        instances.check_complete()?;
    }
    for holder in parts.storage.values() {
        holder.check_complete()?;
    }

    if mode.is_indexed() && parts.indices.is_none() && !mode.is_quads() {
        return Err(BatchError::MissingIndexHolder);
    }
    if !mode.is_indexed() && parts.indices.is_some() {
        return Err(BatchError::UnexpectedIndexHolder);
    }
    if mode.is_connected() != parts.vertices.has_breakpoints() {
        return Err(BatchError::ConnectedMismatch {
            connected: mode.is_connected(),
        });
    }
    if mode.is_instanced() != parts.instances.is_some() {
        return Err(BatchError::InstancingMismatch {
            instanced: mode.is_instanced(),
        });
    }

    let vertex_count = parts.vertices.count();
    if let Some(&last) = parts.vertices.breakpoints().last()
        && last != vertex_count
    {
        return Err(BatchError::UnterminatedPrimitive { last, vertex_count });
    }
    if mode.is_indexed() && mode.is_connected() {
        return Err(BatchError::IndexedConnected);
    }
    if mode.is_quads() && vertex_count % 4 != 0 {
        return Err(BatchError::IncompleteQuads { vertex_count });
    }

    Ok(())
}

fn check_optimizable(parts: &GroupParts) -> BatchResult<()> {
    let mode = parts.batch.mode;
    if !mode.is_triangle_list() {
        return Err(BatchError::OptimizeRequiresTriangles {
            primitive: mode.primitive,
        });
    }
    if parts.vertices.has_breakpoints() {
        return Err(BatchError::OptimizeWithBreakpoints);
    }
    if let Some(indices) = &parts.indices
        && indices.format() != IndexFormat::Uint32
    {
        return Err(BatchError::OptimizeRequiresU32Indices);
    }

    let index_count = match &parts.indices {
        Some(indices) => indices.count(),
        None if mode.is_quads() => 0,
        None => parts.vertices.count(),
    };
    if index_count % 3 != 0 {
        return Err(BatchError::OptimizeIncompleteTriangles { index_count });
    }
    Ok(())
}

fn read_u32_indices(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Validate and consume `group`.
///
/// With `optimize` set, triangle lists are deduplicated and reordered
/// through `optimizer`; the result is always drawn indexed.
///
/// # Example
///
/// ```rust
/// use tessera_render::{
///     Batch, BatchConfig, BatchDataGroup, DefaultMeshOptimizer, DrawCommand, DrawMode,
///     QuadIndexCache, VertexLayout, prepare,
/// };
/// use glam::Vec3;
///
/// # fn main() -> tessera_render::BatchResult<()> {
/// let config = BatchConfig::default();
/// let layout = VertexLayout::new().with_element(wgpu::VertexFormat::Float32x3);
/// let batch = Batch::new("lines", layout, DrawMode::LINES).build();
/// let mut group = BatchDataGroup::new(batch, &config);
/// for x in [0.0, 1.0] {
///     group.vertices().arena().put_vec3(Vec3::new(x, 0.0, 0.0))?;
///     group.vertices().end_element()?;
/// }
///
/// let mut quads = QuadIndexCache::new(config.initial_quad_capacity);
/// let prepared = prepare(group, false, &mut quads, &DefaultMeshOptimizer::default(), &config)?;
/// assert!(matches!(prepared.commands(), [DrawCommand::Arrays(cmd)] if cmd.vertex_count == 2));
/// # Ok(())
/// # }
/// ```
pub fn prepare(
    group: BatchDataGroup,
    optimize: bool,
    quad_cache: &mut QuadIndexCache,
    optimizer: &dyn MeshOptimizer,
    config: &BatchConfig,
) -> BatchResult<PreparedBuffer> {
    profile_function!();

    let parts = group.into_parts();
    validate(&parts)?;
    if optimize {
        check_optimizable(&parts)?;
    }

    let GroupParts {
        batch,
        vertices,
        indices: index_holder,
        instances: instance_holder,
        storage: storage_holders,
    } = parts;
    let mode = batch.mode;

    let mut vertex_count = vertices.count();
    let (mut vertex_bytes, breakpoints) = vertices.into_parts();

    let explicit = index_holder.map(|holder| (holder.format(), holder.into_bytes()));

    let indices = if optimize {
        profile_scope!("optimize_mesh");
        let source = match explicit {
            Some((_, bytes)) => Some(read_u32_indices(&bytes)),
            None if mode.is_quads() => Some(generate_quad_indices(vertex_count / 4)),
            None => None,
        };
        let mesh = optimize_mesh(
            optimizer,
            &vertex_bytes,
            vertex_count,
            &batch.vertex_layout,
            source,
            config.overdraw_threshold,
        )?;
        vertex_bytes = mesh.vertices;
        vertex_count = mesh.vertex_count;
        Some(IndexData::Owned {
            format: IndexFormat::Uint32,
            bytes: bytemuck::cast_slice(&mesh.indices).to_vec(),
        })
    } else {
        match explicit {
            Some((format, bytes)) => Some(IndexData::Owned { format, bytes }),
            None if mode.is_quads() => {
                let quads = vertex_count / 4;
                Some(IndexData::SharedQuads {
                    block: quad_cache.ensure(quads),
                    count: quads * 6,
                })
            }
            None => None,
        }
    };

    let instance_count = instance_holder.as_ref().map_or(1, |holder| holder.count());
    let instances = instance_holder.map(|holder| holder.into_bytes());

    let commands = match &indices {
        Some(index_data) => vec![DrawCommand::Elements(DrawIndexedIndirect::new(
            index_data.count(),
            instance_count,
            0,
            0,
            0,
        ))],
        None if !breakpoints.is_empty() => breakpoints
            .windows(2)
            .map(|run| {
                DrawCommand::Arrays(DrawIndirect::new(run[1] - run[0], instance_count, run[0], 0))
            })
            .collect(),
        None => vec![DrawCommand::Arrays(DrawIndirect::new(
            vertex_count,
            instance_count,
            0,
            0,
        ))],
    };

    let storage = storage_holders
        .into_iter()
        .map(|(name, holder)| (name, holder.into_bytes()))
        .collect();

    tracing::trace!(
        "Prepared batch '{}': {} vertices, {} commands",
        batch.label,
        vertex_count,
        commands.len()
    );

    Ok(PreparedBuffer {
        batch,
        vertices: vertex_bytes,
        vertex_count,
        instances,
        instance_count,
        indices,
        storage,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_mode::{DrawMode, Primitive};
    use crate::layout::VertexLayout;
    use crate::meshopt::DefaultMeshOptimizer;
    use glam::Vec3;

    fn layout() -> VertexLayout {
        VertexLayout::new().with_element(wgpu::VertexFormat::Float32x3)
    }

    fn group(mode: DrawMode, vertices: u32) -> BatchDataGroup {
        let batch = Batch::new("test", layout(), mode).build();
        let mut group = BatchDataGroup::new(batch, &BatchConfig::default());
        for i in 0..vertices {
            let arena = group.vertices().arena();
            arena.put_vec3(Vec3::new(i as f32, (i % 2) as f32, 0.0)).unwrap();
            group.vertices().end_element().unwrap();
        }
        group
    }

    fn run(group: BatchDataGroup, optimize: bool) -> BatchResult<PreparedBuffer> {
        let config = BatchConfig::default();
        let mut cache = QuadIndexCache::new(config.initial_quad_capacity);
        prepare(
            group,
            optimize,
            &mut cache,
            &DefaultMeshOptimizer::default(),
            &config,
        )
    }

    #[test]
    fn test_empty_group_draws_zero_vertices() {
        let prepared = run(group(DrawMode::TRIANGLES, 0), false).unwrap();
        assert_eq!(
            prepared.commands(),
            &[DrawCommand::Arrays(DrawIndirect::new(0, 1, 0, 0))]
        );
        assert!(prepared.vertices().is_empty());
    }

    #[test]
    fn test_connected_runs() {
        let mut g = group(DrawMode::LINE_STRIP, 3);
        g.vertices().end_connected_primitive();
        for _ in 0..4 {
            g.vertices().arena().put_vec3(Vec3::ONE).unwrap();
            g.vertices().end_element().unwrap();
        }
        g.vertices().end_connected_primitive();
        assert_eq!(g.vertices().breakpoints(), &[0, 3, 7]);

        let prepared = run(g, false).unwrap();
        assert_eq!(
            prepared.commands(),
            &[
                DrawCommand::Arrays(DrawIndirect::new(3, 1, 0, 0)),
                DrawCommand::Arrays(DrawIndirect::new(4, 1, 3, 0)),
            ]
        );
    }

    #[test]
    fn test_quads_share_block() {
        let prepared = run(group(DrawMode::QUADS, 8), false).unwrap();
        let Some(IndexData::SharedQuads { block, count }) = prepared.indices() else {
            panic!("expected shared quad indices");
        };
        assert_eq!(*count, 12);
        assert!(block.quad_capacity() >= 2);
        assert_eq!(
            prepared.commands(),
            &[DrawCommand::Elements(DrawIndexedIndirect::new(12, 1, 0, 0, 0))]
        );
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            run(group(DrawMode::INDEXED_TRIANGLES, 3), false).unwrap_err(),
            BatchError::MissingIndexHolder
        );

        let mut g = group(DrawMode::TRIANGLES, 3);
        g.indices().put_triangle(0, 1, 2).unwrap();
        assert_eq!(run(g, false).unwrap_err(), BatchError::UnexpectedIndexHolder);

        assert_eq!(
            run(group(DrawMode::LINE_STRIP, 2), false).unwrap_err(),
            BatchError::ConnectedMismatch { connected: true }
        );

        assert_eq!(
            run(group(DrawMode::QUADS, 6), false).unwrap_err(),
            BatchError::IncompleteQuads { vertex_count: 6 }
        );

        let mut g = group(DrawMode::LINE_STRIP, 2);
        g.vertices().end_connected_primitive();
        g.vertices().arena().put_vec3(Vec3::ZERO).unwrap();
        g.vertices().end_element().unwrap();
        assert_eq!(
            run(g, false).unwrap_err(),
            BatchError::UnterminatedPrimitive {
                last: 2,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_unfinished_element() {
        let mut g = group(DrawMode::POINTS, 0);
        g.vertices().arena().put_f32(1.0).unwrap();
        assert_eq!(
            run(g, false).unwrap_err(),
            BatchError::MissingEndElement { stream: "vertex" }
        );
    }

    #[test]
    fn test_instancing_mismatch() {
        let batch = Batch::new("inst", layout(), DrawMode::TRIANGLES.instanced())
            .with_instance_layout(VertexLayout::new().with_element(wgpu::VertexFormat::Float32x4))
            .build();
        let group = BatchDataGroup::new(batch, &BatchConfig::default());
        assert_eq!(
            run(group, false).unwrap_err(),
            BatchError::InstancingMismatch { instanced: true }
        );
    }

    #[test]
    fn test_instance_count() {
        let batch = Batch::new("inst", layout(), DrawMode::TRIANGLES.instanced())
            .with_instance_layout(VertexLayout::new().with_element(wgpu::VertexFormat::Float32x4))
            .build();
        let mut group = BatchDataGroup::new(batch, &BatchConfig::default());
        for _ in 0..3 {
            group.vertices().arena().put_vec3(Vec3::ZERO).unwrap();
            group.vertices().end_element().unwrap();
        }
        for _ in 0..5 {
            let instances = group.instances().unwrap();
            instances.arena().put_vec4(glam::Vec4::ONE).unwrap();
            instances.end_element().unwrap();
        }

        let prepared = run(group, false).unwrap();
        assert_eq!(prepared.instance_count(), 5);
        assert_eq!(prepared.instances().map(<[u8]>::len), Some(80));
        assert_eq!(
            prepared.commands(),
            &[DrawCommand::Arrays(DrawIndirect::new(3, 5, 0, 0))]
        );
    }

    #[test]
    fn test_optimize_preconditions() {
        assert!(matches!(
            run(group(DrawMode::LINES, 2), true).unwrap_err(),
            BatchError::OptimizeRequiresTriangles {
                primitive: Primitive::Lines
            }
        ));

        let batch = Batch::new("u16", layout(), DrawMode::INDEXED_TRIANGLES)
            .with_index_format(IndexFormat::Uint16)
            .build();
        let mut group = BatchDataGroup::new(batch, &BatchConfig::default());
        for _ in 0..3 {
            group.vertices().arena().put_vec3(Vec3::ZERO).unwrap();
            group.vertices().end_element().unwrap();
        }
        group.indices().put_triangle(0, 1, 2).unwrap();
        assert_eq!(
            run(group, true).unwrap_err(),
            BatchError::OptimizeRequiresU32Indices
        );
    }

    #[test]
    fn test_optimize_rejects_partial_triangles() {
        let batch = Batch::new("tris", layout(), DrawMode::INDEXED_TRIANGLES).build();
        let mut indexed = BatchDataGroup::new(batch, &BatchConfig::default());
        for _ in 0..3 {
            indexed.vertices().arena().put_vec3(Vec3::ZERO).unwrap();
            indexed.vertices().end_element().unwrap();
        }
        indexed.indices().put_indices(&[0, 1, 2, 0]).unwrap();
        assert_eq!(
            run(indexed, true).unwrap_err(),
            BatchError::OptimizeIncompleteTriangles { index_count: 4 }
        );

        let err = run(group(DrawMode::TRIANGLES, 4), true).unwrap_err();
        assert_eq!(err, BatchError::OptimizeIncompleteTriangles { index_count: 4 });
        assert_eq!(err.kind(), crate::error::ErrorKind::OptimizerPrecondition);
    }

    #[test]
    fn test_optimized_quads_get_own_indices() {
        let prepared = run(group(DrawMode::QUADS, 8), true).unwrap();
        let Some(IndexData::Owned { format, bytes }) = prepared.indices() else {
            panic!("expected owned indices");
        };
        assert_eq!(*format, IndexFormat::Uint32);
        assert_eq!(bytes.len(), 12 * 4);
        assert_eq!(prepared.vertex_count(), 8);
    }
}
