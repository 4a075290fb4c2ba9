//! Error types for the batch pipeline.
//!
//! Every fatal condition has its own [`BatchError`] variant. [`BatchError::kind`]
//! groups them into the broad [`ErrorKind`] categories callers usually branch on.
//! An error aborts the batch being assembled; the group or prepared buffer it
//! came from should simply be dropped.

use thiserror::Error;

/// Broad category of a [`BatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller used the builder/holder/batch protocol incorrectly.
    ProtocolViolation,
    /// A fixed-capacity resource ran out of room.
    ResourceExhaustion,
    /// Mesh optimization was requested for data it cannot handle.
    OptimizerPrecondition,
    /// The system allocator refused to grow a buffer.
    AllocationFailure,
}

/// Errors raised while building, preparing, realizing or drawing a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("borrowed arena is full: {needed} bytes needed, {available} available")]
    ArenaFull { needed: usize, available: usize },
    #[error("failed to grow arena to {requested} bytes")]
    OutOfMemory { requested: usize },
    #[error("cursor position {position} is past arena capacity {capacity}")]
    InvalidCursor { position: usize, capacity: usize },
    #[error("alignment must be non-zero")]
    ZeroAlignment,
    #[error("{stream} stream has data written but no element was ended")]
    MissingEndElement { stream: &'static str },
    #[error(
        "{stream} element {element} has size mismatch: wrote {written} bytes, stride is {stride}"
    )]
    ElementSizeMismatch {
        stream: &'static str,
        element: u32,
        written: usize,
        stride: usize,
    },
    #[error("batch draws indexed but no index data was written")]
    MissingIndexHolder,
    #[error("index data was written for a non-indexed batch")]
    UnexpectedIndexHolder,
    #[error("connected draw mode does not match breakpoint presence (connected: {connected})")]
    ConnectedMismatch { connected: bool },
    #[error("instanced draw mode does not match instance data presence (instanced: {instanced})")]
    InstancingMismatch { instanced: bool },
    #[error("last connected primitive ends at {last} but {vertex_count} vertices were written")]
    UnterminatedPrimitive { last: u32, vertex_count: u32 },
    #[error("indexed draw modes cannot be connected")]
    IndexedConnected,
    #[error("quad batch has {vertex_count} vertices, not a multiple of 4")]
    IncompleteQuads { vertex_count: u32 },
    #[error("unknown storage stream '{name}'")]
    UnknownStorageStream { name: String },
    #[error("batch has no instance layout")]
    MissingInstanceLayout,
    #[error("index {index} does not fit in {format:?} indices")]
    IndexOverflow {
        index: u32,
        format: crate::holder::IndexFormat,
    },
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: u32 },
    #[error("mesh optimization requires 32-bit indices")]
    OptimizeRequiresU32Indices,
    #[error("mesh optimization requires a triangle list, got {primitive:?}")]
    OptimizeRequiresTriangles { primitive: crate::draw_mode::Primitive },
    #[error("mesh optimization cannot handle connected primitives")]
    OptimizeWithBreakpoints,
    #[error("mesh optimization needs whole triangles, got {index_count} indices")]
    OptimizeIncompleteTriangles { index_count: u32 },
    #[error("mesh optimization changed vertex count from {before} to {after}")]
    VertexDropped { before: u32, after: u32 },
    #[error("{count} draw commands but no command buffer was uploaded")]
    MissingCommandBuffer { count: usize },
}

impl BatchError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::ArenaFull { .. } => ErrorKind::ResourceExhaustion,
            BatchError::OutOfMemory { .. } => ErrorKind::AllocationFailure,
            BatchError::OptimizeRequiresU32Indices
            | BatchError::OptimizeRequiresTriangles { .. }
            | BatchError::OptimizeWithBreakpoints
            | BatchError::OptimizeIncompleteTriangles { .. }
            | BatchError::VertexDropped { .. } => ErrorKind::OptimizerPrecondition,
            _ => ErrorKind::ProtocolViolation,
        }
    }
}

/// Result alias used throughout the pipeline.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors raised while creating a [`GraphicsContext`](crate::GraphicsContext).
#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    DeviceCreation(String),
    #[error("required GPU features are not supported: {0:?}")]
    MissingFeatures(crate::features::GpuFeatures),
}
