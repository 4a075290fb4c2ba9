//! The object that owns the batch pipeline's long-lived state.

use std::sync::Arc;

use glam::{Mat4, Vec4};

use tessera_core::profiling::profile_function;
use tessera_test_utils::{DrawRecorder, RenderContext};

use crate::batch::Batch;
use crate::buffer_pool::BufferPool;
use crate::config::BatchConfig;
use crate::error::BatchResult;
use crate::group::BatchDataGroup;
use crate::meshopt::{DefaultMeshOptimizer, MeshOptimizer};
use crate::prepare::{PreparedBuffer, prepare};
use crate::quad_cache::QuadIndexCache;
use crate::realize::{BufferLifetime, BuiltBuffer, realize};
use crate::renderer::render;
use crate::stats::FrameStats;
use crate::vertex_state::VertexStateCache;

/// Owns the buffer pool, the shared quad index block, the vertex state cache
/// and the mesh optimizer, and runs the prepare/realize/render/reclaim cycle.
///
/// Belongs to the render thread. Everything it creates lazily (pool buffers,
/// quad blocks, vertex states) lives until [`BatchContext::shutdown`] or drop.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tessera_render::{Batch, BatchConfig, BatchContext, DrawMode, VertexLayout};
/// use tessera_test_utils::{MockRenderContext, MockRenderPass};
/// use glam::{Mat4, Vec3};
///
/// # fn main() -> tessera_render::BatchResult<()> {
/// let render_context = Arc::new(MockRenderContext::new());
/// let mut batches = BatchContext::new(render_context, BatchConfig::default());
/// let layout = VertexLayout::new().with_element(wgpu::VertexFormat::Float32x3);
/// let batch = Batch::new("tri", layout, DrawMode::TRIANGLES).build();
///
/// let mut group = batches.create_group(batch);
/// for p in [Vec3::ZERO, Vec3::X, Vec3::Y] {
///     group.vertices().arena().put_vec3(p)?;
///     group.vertices().end_element()?;
/// }
///
/// let mut pass = MockRenderPass::new();
/// batches.draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)?;
/// assert_eq!(pass.count_direct_draws(), 1);
/// # Ok(())
/// # }
/// ```
pub struct BatchContext {
    render_context: Arc<dyn RenderContext>,
    config: BatchConfig,
    pool: BufferPool,
    quad_cache: QuadIndexCache,
    vertex_states: VertexStateCache,
    optimizer: Box<dyn MeshOptimizer>,
    color_modifier: Option<Vec4>,
    stats: FrameStats,
    pool_counters: (u64, u64),
}

impl BatchContext {
    pub fn new(render_context: Arc<dyn RenderContext>, config: BatchConfig) -> Self {
        let optimizer = Box::new(DefaultMeshOptimizer::new(config.vertex_cache_size));
        Self {
            render_context,
            pool: BufferPool::new(config.min_pooled_buffer_size),
            quad_cache: QuadIndexCache::new(config.initial_quad_capacity),
            vertex_states: VertexStateCache::new(),
            optimizer,
            color_modifier: None,
            stats: FrameStats::default(),
            pool_counters: (0, 0),
            config,
        }
    }

    /// Replace the mesh optimizer.
    pub fn with_optimizer(mut self, optimizer: Box<dyn MeshOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn render_context(&self) -> &Arc<dyn RenderContext> {
        &self.render_context
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn quad_cache(&self) -> &QuadIndexCache {
        &self.quad_cache
    }

    /// Start filling a group for `batch` with the configured arena sizes.
    pub fn create_group(&self, batch: Arc<Batch>) -> BatchDataGroup {
        BatchDataGroup::new(batch, &self.config)
    }

    /// Validate and consume `group`. See [`prepare`](crate::prepare()).
    pub fn prepare(
        &mut self,
        group: BatchDataGroup,
        optimize: bool,
    ) -> BatchResult<PreparedBuffer> {
        let prepared = prepare(
            group,
            optimize,
            &mut self.quad_cache,
            self.optimizer.as_ref(),
            &self.config,
        )?;
        self.stats.batches_prepared += 1;
        Ok(prepared)
    }

    /// Upload `prepared` with the given lifetime.
    pub fn realize(&mut self, prepared: PreparedBuffer, lifetime: BufferLifetime) -> BuiltBuffer {
        let built = realize(
            prepared,
            lifetime,
            self.render_context.as_ref(),
            &mut self.pool,
            &mut self.vertex_states,
        );
        self.stats.bytes_uploaded += built.uploaded_bytes();
        built
    }

    /// Draw `built` with the current color modifier.
    pub fn render(
        &mut self,
        pass: &mut dyn DrawRecorder,
        built: &BuiltBuffer,
        model: &Mat4,
    ) -> BatchResult<()> {
        render(pass, built, model, self.color_modifier)?;
        match built.commands().len() {
            0 => {}
            1 => self.stats.direct_draws += 1,
            _ => self.stats.indirect_draws += 1,
        }
        Ok(())
    }

    /// Release the buffers of `built`.
    pub fn reclaim(&mut self, built: BuiltBuffer) {
        built.reclaim(self.render_context.as_ref(), &mut self.pool);
    }

    /// Prepare, realize as temporary, draw and reclaim `group` in one go.
    ///
    /// The temporary buffers are reclaimed even when drawing fails.
    pub fn draw_immediate(
        &mut self,
        pass: &mut dyn DrawRecorder,
        group: BatchDataGroup,
        optimize: bool,
        model: &Mat4,
    ) -> BatchResult<()> {
        profile_function!();
        let prepared = self.prepare(group, optimize)?;
        let built = self.realize(prepared, BufferLifetime::Temporary);
        let result = self.render(pass, &built, model);
        self.reclaim(built);
        result
    }

    /// Color modifier pushed to programs that receive one. `None` pushes nothing.
    pub fn set_color_modifier(&mut self, color: Option<Vec4>) {
        self.color_modifier = color;
    }

    pub fn color_modifier(&self) -> Option<Vec4> {
        self.color_modifier
    }

    /// Statistics of the frame so far.
    pub fn stats(&self) -> FrameStats {
        let mut stats = self.stats;
        stats.pool_hits = self.pool.hits() - self.pool_counters.0;
        stats.pool_misses = self.pool.misses() - self.pool_counters.1;
        stats
    }

    /// Finish the frame: log and reset the statistics, and hand temporary
    /// buffers reclaimed this frame back to the pool.
    ///
    /// Call after the frame's command buffers have been submitted.
    pub fn end_frame(&mut self) -> FrameStats {
        let stats = self.stats();
        tracing::debug!(
            "Batch frame: {} prepared, {} bytes uploaded, pool {}/{} hit/miss, \
             {} direct, {} indirect",
            stats.batches_prepared,
            stats.bytes_uploaded,
            stats.pool_hits,
            stats.pool_misses,
            stats.direct_draws,
            stats.indirect_draws
        );
        self.pool.next_frame();
        self.stats = FrameStats::default();
        self.pool_counters = (self.pool.hits(), self.pool.misses());
        stats
    }

    /// Destroy pooled buffers and drop the shared caches.
    ///
    /// Built buffers still alive keep their own buffers; the context stays
    /// usable and recreates its caches on demand.
    pub fn shutdown(&mut self) {
        tracing::debug!(
            "Shutting down batch context: {} pooled buffers, {} bytes",
            self.pool.available_count(),
            self.pool.total_available_size()
        );
        self.pool.clear(self.render_context.as_ref());
        self.quad_cache.clear();
        self.vertex_states.clear();
    }
}

impl Drop for BatchContext {
    fn drop(&mut self) {
        self.pool.clear(self.render_context.as_ref());
    }
}

impl std::fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchContext")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("quad_cache", &self.quad_cache)
            .field("vertex_states", &self.vertex_states.len())
            .field("color_modifier", &self.color_modifier)
            .field("stats", &self.stats)
            .finish()
    }
}
