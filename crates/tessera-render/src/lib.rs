//! Tessera Render - immediate-mode batch assembly for wgpu
//!
//! Geometry is written element by element into growable byte arenas, then
//! turned into GPU draws in four steps:
//!
//! 1. **Fill** a [`BatchDataGroup`]: vertex, index, instance and named
//!    storage streams, each checked against its layout's stride.
//! 2. **Prepare** it into a [`PreparedBuffer`]: validation, index resolution
//!    (explicit, shared quad block, or mesh-optimized) and draw commands.
//! 3. **Realize** it into a [`BuiltBuffer`]: pooled buffers for one frame, or
//!    exactly sized buffers kept until reclaimed.
//! 4. **Render** it into any [`DrawRecorder`](tessera_test_utils::DrawRecorder),
//!    then **reclaim** it.
//!
//! [`BatchContext`] owns the state shared between batches and runs the cycle.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_render::{Batch, BatchConfig, BatchContext, BufferLifetime, DrawMode, VertexLayout};
//! use tessera_test_utils::{MockRenderContext, MockRenderPass};
//! use glam::{Mat4, Vec3};
//!
//! # fn main() -> tessera_render::BatchResult<()> {
//! let mut batches = BatchContext::new(Arc::new(MockRenderContext::new()), BatchConfig::default());
//! let quads = Batch::new("quads", VertexLayout::position_color(), DrawMode::QUADS).build();
//!
//! let mut group = batches.create_group(quads);
//! for corner in [Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y] {
//!     let vertices = group.vertices();
//!     vertices.arena().put_vec3(corner)?.put_u32(0xffff_ffff)?;
//!     vertices.end_element()?;
//! }
//!
//! let prepared = batches.prepare(group, false)?;
//! let built = batches.realize(prepared, BufferLifetime::Permanent);
//!
//! let mut pass = MockRenderPass::new();
//! batches.render(&mut pass, &built, &Mat4::IDENTITY)?;
//! batches.reclaim(built);
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod batch;
pub mod buffer_pool;
pub mod command;
pub mod config;
pub mod context;
mod context_impl;
pub mod draw_mode;
pub mod error;
pub mod features;
pub mod graphics;
pub mod group;
pub mod holder;
pub mod layout;
pub mod meshopt;
pub mod prepare;
pub mod quad_cache;
pub mod realize;
mod reclaim;
pub mod renderer;
pub mod stats;
pub mod vertex_state;

pub use arena::{ArenaBuilder, OwnedArena, decode_f16, encode_f16};
pub use batch::{
    Batch, BatchHooks, BatchProgram, COLOR_MODIFIER_PUSH_OFFSET, MODEL_MATRIX_PUSH_OFFSET,
    PUSH_CONSTANT_SIZE, StorageSlot,
};
pub use buffer_pool::BufferPool;
pub use command::{DrawCommand, DrawIndexedIndirect, DrawIndirect};
pub use config::BatchConfig;
pub use context::BatchContext;
pub use draw_mode::{DrawMode, DrawModeFlags, Primitive};
pub use error::{BatchError, BatchResult, ErrorKind, GraphicsError};
pub use features::GpuFeatures;
pub use graphics::{GraphicsContext, GraphicsContextDescriptor};
pub use group::BatchDataGroup;
pub use holder::{IndexDataHolder, IndexFormat, StreamDataHolder, VertexDataHolder};
pub use layout::{StorageLayout, VertexElement, VertexLayout};
pub use meshopt::{DefaultMeshOptimizer, MeshOptimizer, OptimizedMesh, optimize_mesh};
pub use prepare::{IndexData, PreparedBuffer, prepare};
pub use quad_cache::{QuadIndexBlock, QuadIndexCache};
pub use realize::{BufferLifetime, BuiltBuffer, realize};
pub use renderer::render;
pub use stats::FrameStats;
pub use vertex_state::{VertexInputState, VertexStateCache};
