//! Batch pipeline configuration.

/// Tunables for a [`BatchContext`](crate::BatchContext).
///
/// # Example
///
/// ```rust
/// use tessera_render::BatchConfig;
///
/// let config = BatchConfig::default()
///     .with_vertex_arena_capacity(256 * 1024)
///     .with_overdraw_threshold(1.01);
/// assert_eq!(config.vertex_arena_capacity, 256 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Initial size of the vertex arena of each group.
    pub vertex_arena_capacity: usize,
    /// Initial size of the index arena of each group.
    pub index_arena_capacity: usize,
    /// Initial size of the instance arena of each group.
    pub instance_arena_capacity: usize,
    /// Initial size of each storage arena of each group.
    pub storage_arena_capacity: usize,
    /// How much worse than the optimal vertex cache ratio a cluster may get
    /// before overdraw optimization starts a new one.
    pub overdraw_threshold: f32,
    /// Simulated post-transform vertex cache size.
    pub vertex_cache_size: usize,
    /// Smallest buffer the pool will create.
    pub min_pooled_buffer_size: u64,
    /// Number of quads the shared quad index block starts with.
    pub initial_quad_capacity: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            vertex_arena_capacity: 64 * 1024,
            index_arena_capacity: 16 * 1024,
            instance_arena_capacity: 4 * 1024,
            storage_arena_capacity: 4 * 1024,
            overdraw_threshold: 1.05,
            vertex_cache_size: 16,
            min_pooled_buffer_size: 256,
            initial_quad_capacity: 1024,
        }
    }
}

impl BatchConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertex_arena_capacity(mut self, capacity: usize) -> Self {
        self.vertex_arena_capacity = capacity;
        self
    }

    pub fn with_index_arena_capacity(mut self, capacity: usize) -> Self {
        self.index_arena_capacity = capacity;
        self
    }

    pub fn with_instance_arena_capacity(mut self, capacity: usize) -> Self {
        self.instance_arena_capacity = capacity;
        self
    }

    pub fn with_storage_arena_capacity(mut self, capacity: usize) -> Self {
        self.storage_arena_capacity = capacity;
        self
    }

    pub fn with_overdraw_threshold(mut self, threshold: f32) -> Self {
        self.overdraw_threshold = threshold;
        self
    }

    pub fn with_vertex_cache_size(mut self, size: usize) -> Self {
        self.vertex_cache_size = size;
        self
    }

    pub fn with_min_pooled_buffer_size(mut self, size: u64) -> Self {
        self.min_pooled_buffer_size = size;
        self
    }

    pub fn with_initial_quad_capacity(mut self, quads: u32) -> Self {
        self.initial_quad_capacity = quads;
        self
    }
}
