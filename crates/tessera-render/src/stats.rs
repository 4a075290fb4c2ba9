/// Batch pipeline statistics for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Groups turned into prepared buffers.
    pub batches_prepared: u32,
    /// Bytes written to GPU buffers, including padding.
    pub bytes_uploaded: u64,
    /// Buffer requests served from the pool.
    pub pool_hits: u64,
    /// Buffer requests that created a new buffer.
    pub pool_misses: u64,
    /// Batches drawn with a single direct draw.
    pub direct_draws: u32,
    /// Batches drawn with one indirect multi-draw.
    pub indirect_draws: u32,
}
