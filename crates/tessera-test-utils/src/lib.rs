//! Test utilities for Tessera.
//!
//! This crate provides the GPU abstraction seams of the batch pipeline and
//! their mock implementations.
//!
//! # Overview
//!
//! - [`RenderContext`] - Trait abstracting GPU resource operations
//! - [`DrawRecorder`] - Trait abstracting render pass commands
//! - `MockRenderContext` / `MockRenderPass` - Recording mocks (requires `mock` feature)
//! - GPU wrapper types (`GpuBuffer`, `GpuRenderPipeline`, ...) - Can be real or mock
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use tessera_test_utils::{DrawRecorder, MockRenderContext, MockRenderPass, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("test_buffer"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX,
//!     mapped_at_creation: false,
//! });
//!
//! let mut pass = MockRenderPass::new();
//! pass.set_vertex_buffer(0, &buffer, 1024);
//! pass.draw(0..3, 0..1);
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert_eq!(pass.count_direct_draws(), 1);
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! ## 1. No Lifetimes
//!
//! All GPU wrapper types are owned and use reference counting internally.
//!
//! ## 2. Interior Mutability
//!
//! `MockRenderContext` uses `Mutex` so `&self` methods can record calls.
//!
//! ## 3. Object Safety
//!
//! Both traits are object-safe (`dyn RenderContext`, `dyn DrawRecorder`).

pub mod draw_recorder;
pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

// Re-export main types at crate root
pub use draw_recorder::*;
pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
