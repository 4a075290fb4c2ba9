//! Mesh optimization for indexed triangle lists.
//!
//! [`optimize_mesh`] runs the full sequence on a prepared batch:
//!
//! 1. Deduplicate byte-identical vertices and rewrite the indices.
//! 2. Reorder triangles for post-transform vertex cache reuse.
//! 3. Reorder clusters of triangles to reduce overdraw, keeping most of the
//!    cache locality from step 2.
//! 4. Reorder vertices in first-use order for fetch locality.
//!
//! Triangles are only ever reordered, never rotated or re-wound, so the set of
//! drawn triangles is unchanged apart from exact duplicates collapsing into the
//! same vertices.

use ahash::AHashMap;
use glam::Vec3;

use tessera_core::profiling::profile_function;

use crate::error::{BatchError, BatchResult};
use crate::layout::VertexLayout;

/// Remap entry of a vertex that no index references.
pub const UNUSED_VERTEX: u32 = u32::MAX;

/// Mesh optimization passes used by [`optimize_mesh`].
pub trait MeshOptimizer {
    /// Map every referenced vertex to the first byte-identical vertex.
    ///
    /// Returns the remap table (indexed by old vertex, [`UNUSED_VERTEX`] for
    /// unreferenced ones) and the number of unique vertices.
    fn generate_vertex_remap(
        &self,
        indices: &[u32],
        vertices: &[u8],
        vertex_count: usize,
        stride: usize,
    ) -> (Vec<u32>, usize);

    /// Rewrite indices through a remap table.
    fn remap_index_buffer(&self, indices: &mut [u32], remap: &[u32]);

    /// Build the deduplicated vertex buffer described by a remap table.
    fn remap_vertex_buffer(
        &self,
        vertices: &[u8],
        stride: usize,
        remap: &[u32],
        unique_count: usize,
    ) -> Vec<u8>;

    /// Reorder triangles for vertex cache reuse.
    fn optimize_vertex_cache(&self, indices: &mut [u32], vertex_count: usize);

    /// Reorder triangle clusters to reduce overdraw.
    ///
    /// `threshold` bounds how much worse than the cache-optimized order a
    /// cluster's cache miss ratio may become.
    fn optimize_overdraw(&self, indices: &mut [u32], positions: &[Vec3], threshold: f32);

    /// Reorder vertices in first-use order, rewriting the indices.
    ///
    /// Returns the new vertex buffer and its vertex count.
    fn optimize_vertex_fetch(
        &self,
        indices: &mut [u32],
        vertices: &[u8],
        vertex_count: usize,
        stride: usize,
    ) -> (Vec<u8>, usize);
}

/// Average cache misses per triangle of a FIFO cache of `cache_size` entries.
pub fn analyze_vertex_cache(indices: &[u32], vertex_count: usize, cache_size: usize) -> f32 {
    let triangles = indices.len() / 3;
    if triangles == 0 {
        return 0.0;
    }

    let mut cache = FifoCache::new(vertex_count, cache_size);
    let misses: u32 = indices.chunks_exact(3).map(|tri| cache.access(tri)).sum();
    misses as f32 / triangles as f32
}

/// FIFO cache simulation with timestamps.
struct FifoCache {
    timestamps: Vec<u32>,
    time: u32,
    size: u32,
}

impl FifoCache {
    fn new(vertex_count: usize, size: usize) -> Self {
        Self {
            timestamps: vec![0; vertex_count],
            time: size as u32 + 1,
            size: size as u32,
        }
    }

    /// Process a triangle and return how many of its vertices missed.
    fn access(&mut self, triangle: &[u32]) -> u32 {
        let mut misses = 0;
        for &vertex in triangle {
            let stamp = &mut self.timestamps[vertex as usize];
            if self.time - *stamp > self.size {
                *stamp = self.time;
                self.time += 1;
                misses += 1;
            }
        }
        misses
    }

    /// Invalidate every entry.
    fn flush(&mut self) {
        self.time += self.size + 1;
    }
}

const CACHE_DECAY_POWER: f32 = 1.5;
const LAST_TRIANGLE_SCORE: f32 = 0.75;
const VALENCE_BOOST_SCALE: f32 = 2.0;
const VALENCE_BOOST_POWER: f32 = 0.5;

fn vertex_score(cache_position: Option<usize>, remaining: u32, cache_size: usize) -> f32 {
    if remaining == 0 {
        return -1.0;
    }

    let cache_score = match cache_position {
        None => 0.0,
        Some(position) if position < 3 => LAST_TRIANGLE_SCORE,
        Some(position) => {
            let scaler = 1.0 / (cache_size - 3) as f32;
            (1.0 - (position - 3) as f32 * scaler).powf(CACHE_DECAY_POWER)
        }
    };

    cache_score + VALENCE_BOOST_SCALE * (remaining as f32).powf(-VALENCE_BOOST_POWER)
}

/// Pure Rust optimizer.
#[derive(Debug, Clone)]
pub struct DefaultMeshOptimizer {
    cache_size: usize,
}

impl DefaultMeshOptimizer {
    /// `cache_size` is the simulated post-transform cache size (at least 4).
    pub fn new(cache_size: usize) -> Self {
        Self {
            cache_size: cache_size.max(4),
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }
}

impl Default for DefaultMeshOptimizer {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MeshOptimizer for DefaultMeshOptimizer {
    fn generate_vertex_remap(
        &self,
        indices: &[u32],
        vertices: &[u8],
        vertex_count: usize,
        stride: usize,
    ) -> (Vec<u32>, usize) {
        let mut remap = vec![UNUSED_VERTEX; vertex_count];
        let mut table: AHashMap<&[u8], u32> = AHashMap::with_capacity(vertex_count);
        let mut unique = 0u32;

        for &index in indices {
            let vertex = index as usize;
            if remap[vertex] != UNUSED_VERTEX {
                continue;
            }
            let bytes = &vertices[vertex * stride..(vertex + 1) * stride];
            remap[vertex] = *table.entry(bytes).or_insert_with(|| {
                let id = unique;
                unique += 1;
                id
            });
        }

        (remap, unique as usize)
    }

    fn remap_index_buffer(&self, indices: &mut [u32], remap: &[u32]) {
        for index in indices {
            *index = remap[*index as usize];
        }
    }

    fn remap_vertex_buffer(
        &self,
        vertices: &[u8],
        stride: usize,
        remap: &[u32],
        unique_count: usize,
    ) -> Vec<u8> {
        let mut result = vec![0; unique_count * stride];
        for (vertex, &target) in remap.iter().enumerate() {
            if target == UNUSED_VERTEX {
                continue;
            }
            let target = target as usize;
            result[target * stride..(target + 1) * stride]
                .copy_from_slice(&vertices[vertex * stride..(vertex + 1) * stride]);
        }
        result
    }

    fn optimize_vertex_cache(&self, indices: &mut [u32], vertex_count: usize) {
        profile_function!();

        let triangle_count = indices.len() / 3;
        if triangle_count == 0 {
            return;
        }
        // Trailing indices that do not form a triangle stay where they are.
        let indices = &mut indices[..triangle_count * 3];
        let cache_size = self.cache_size;

        // Per-vertex triangle adjacency, compacted as triangles are emitted.
        let mut remaining = vec![0u32; vertex_count];
        for &index in indices.iter() {
            remaining[index as usize] += 1;
        }
        let mut offsets = vec![0usize; vertex_count + 1];
        for vertex in 0..vertex_count {
            offsets[vertex + 1] = offsets[vertex] + remaining[vertex] as usize;
        }
        let mut fill = offsets.clone();
        let mut adjacency = vec![0u32; indices.len()];
        for (triangle, corners) in indices.chunks_exact(3).enumerate() {
            for &vertex in corners {
                let slot = &mut fill[vertex as usize];
                adjacency[*slot] = triangle as u32;
                *slot += 1;
            }
        }

        let mut cache_position: Vec<Option<usize>> = vec![None; vertex_count];
        let mut scores: Vec<f32> = (0..vertex_count)
            .map(|v| vertex_score(None, remaining[v], cache_size))
            .collect();
        let triangle_score = |corners: &[u32], scores: &[f32]| -> f32 {
            corners.iter().map(|&v| scores[v as usize]).sum()
        };

        let mut emitted = vec![false; triangle_count];
        let mut output = Vec::with_capacity(indices.len());
        let mut cache: Vec<u32> = Vec::with_capacity(cache_size + 3);
        let mut next_cache: Vec<u32> = Vec::with_capacity(cache_size + 3);
        let mut cursor = 0;

        let mut best = (0..triangle_count).max_by(|&a, &b| {
            triangle_score(&indices[a * 3..a * 3 + 3], &scores)
                .total_cmp(&triangle_score(&indices[b * 3..b * 3 + 3], &scores))
        });

        for _ in 0..triangle_count {
            let triangle = match best {
                Some(triangle) => triangle,
                None => {
                    // Dead end: continue with the next triangle in input order.
                    while emitted[cursor] {
                        cursor += 1;
                    }
                    cursor
                }
            };

            emitted[triangle] = true;
            let corners = [
                indices[triangle * 3],
                indices[triangle * 3 + 1],
                indices[triangle * 3 + 2],
            ];
            output.extend_from_slice(&corners);

            for &vertex in &corners {
                let v = vertex as usize;
                let start = offsets[v];
                let end = start + remaining[v] as usize;
                if let Some(found) = adjacency[start..end]
                    .iter()
                    .position(|&t| t == triangle as u32)
                {
                    adjacency.swap(start + found, end - 1);
                }
                remaining[v] -= 1;
            }

            next_cache.clear();
            next_cache.extend_from_slice(&corners);
            next_cache.extend(cache.iter().copied().filter(|v| !corners.contains(v)));
            for &evicted in next_cache.iter().skip(cache_size) {
                let v = evicted as usize;
                cache_position[v] = None;
                scores[v] = vertex_score(None, remaining[v], cache_size);
            }
            next_cache.truncate(cache_size);
            std::mem::swap(&mut cache, &mut next_cache);

            for (position, &vertex) in cache.iter().enumerate() {
                let v = vertex as usize;
                cache_position[v] = Some(position);
                scores[v] = vertex_score(Some(position), remaining[v], cache_size);
            }

            best = None;
            let mut best_score = f32::NEG_INFINITY;
            for &vertex in &cache {
                let v = vertex as usize;
                let start = offsets[v];
                for &candidate in &adjacency[start..start + remaining[v] as usize] {
                    let c = candidate as usize;
                    let score = triangle_score(&indices[c * 3..c * 3 + 3], &scores);
                    if score > best_score {
                        best_score = score;
                        best = Some(c);
                    }
                }
            }
        }

        indices.copy_from_slice(&output);
    }

    fn optimize_overdraw(&self, indices: &mut [u32], positions: &[Vec3], threshold: f32) {
        profile_function!();

        let triangle_count = indices.len() / 3;
        let indices = &mut indices[..triangle_count * 3];
        if triangle_count == 0 {
            return;
        }

        // Hard boundaries: triangles whose three vertices all miss the cache.
        let mut cache = FifoCache::new(positions.len(), self.cache_size);
        let mut misses = Vec::with_capacity(triangle_count);
        let mut hard = Vec::new();
        for (triangle, corners) in indices.chunks_exact(3).enumerate() {
            let missed = cache.access(corners);
            if triangle == 0 || missed == 3 {
                hard.push(triangle);
            }
            misses.push(missed);
        }
        hard.push(triangle_count);

        // Soft boundaries: split a hard cluster once its running miss ratio is
        // back within `threshold` of the whole cluster's ratio.
        let mut clusters = Vec::new();
        for window in hard.windows(2) {
            let (start, end) = (window[0], window[1]);
            let cluster_misses: u32 = misses[start..end].iter().sum();
            let cluster_threshold = threshold * cluster_misses as f32 / (end - start) as f32;

            cache.flush();
            clusters.push(start);
            let mut sub_start = start;
            let mut running_misses = 0;
            for triangle in start..end {
                running_misses += cache.access(&indices[triangle * 3..triangle * 3 + 3]);
                let running_triangles = (triangle - sub_start + 1) as f32;
                let within = running_misses as f32 / running_triangles <= cluster_threshold;
                if triangle + 1 < end && within {
                    clusters.push(triangle + 1);
                    sub_start = triangle + 1;
                    running_misses = 0;
                    cache.flush();
                }
            }
        }
        clusters.push(triangle_count);

        let mesh_centroid = if positions.is_empty() {
            Vec3::ZERO
        } else {
            positions.iter().copied().sum::<Vec3>() / positions.len() as f32
        };

        let cluster_count = clusters.len() - 1;
        let mut sort_keys = Vec::with_capacity(cluster_count);
        for window in clusters.windows(2) {
            let mut centroid = Vec3::ZERO;
            let mut normal = Vec3::ZERO;
            let mut area_total = 0.0;
            for corners in indices[window[0] * 3..window[1] * 3].chunks_exact(3) {
                let p0 = positions[corners[0] as usize];
                let p1 = positions[corners[1] as usize];
                let p2 = positions[corners[2] as usize];
                let face = (p1 - p0).cross(p2 - p0);
                let area = face.length();
                centroid += (p0 + p1 + p2) / 3.0 * area;
                normal += face;
                area_total += area;
            }
            if area_total > 0.0 {
                centroid /= area_total;
            }
            let key = (centroid - mesh_centroid).dot(normal.normalize_or_zero());
            sort_keys.push(key);
        }

        // Clusters facing away from the mesh center come first.
        let mut order: Vec<usize> = (0..cluster_count).collect();
        order.sort_by(|&a, &b| sort_keys[b].total_cmp(&sort_keys[a]));

        let mut output = Vec::with_capacity(indices.len());
        for cluster in order {
            output.extend_from_slice(&indices[clusters[cluster] * 3..clusters[cluster + 1] * 3]);
        }
        indices.copy_from_slice(&output);

        tracing::trace!(
            "Overdraw optimization: {} hard clusters, {} clusters",
            hard.len() - 1,
            cluster_count
        );
    }

    fn optimize_vertex_fetch(
        &self,
        indices: &mut [u32],
        vertices: &[u8],
        vertex_count: usize,
        stride: usize,
    ) -> (Vec<u8>, usize) {
        let mut remap = vec![UNUSED_VERTEX; vertex_count];
        let mut result = Vec::with_capacity(vertices.len());
        let mut next = 0u32;

        for index in indices.iter_mut() {
            let vertex = *index as usize;
            if remap[vertex] == UNUSED_VERTEX {
                remap[vertex] = next;
                next += 1;
                result.extend_from_slice(&vertices[vertex * stride..(vertex + 1) * stride]);
            }
            *index = remap[vertex];
        }

        (result, next as usize)
    }
}

/// Result of [`optimize_mesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedMesh {
    pub vertices: Vec<u8>,
    pub indices: Vec<u32>,
    pub vertex_count: u32,
}

/// Read the `Float32x3` at `offset` of every vertex.
pub fn extract_positions(
    vertices: &[u8],
    vertex_count: usize,
    stride: usize,
    offset: usize,
) -> Vec<Vec3> {
    let read = |at: usize| {
        f32::from_le_bytes([vertices[at], vertices[at + 1], vertices[at + 2], vertices[at + 3]])
    };
    (0..vertex_count)
        .map(|vertex| {
            let base = vertex * stride + offset;
            Vec3::new(read(base), read(base + 4), read(base + 8))
        })
        .collect()
}

/// Deduplicate and reorder an indexed triangle list.
///
/// `indices` of `None` treats the vertices as an unindexed triangle list.
/// Overdraw optimization needs positions and is skipped when the layout has
/// no `Float32x3` attribute.
pub fn optimize_mesh(
    optimizer: &dyn MeshOptimizer,
    vertices: &[u8],
    vertex_count: u32,
    layout: &VertexLayout,
    indices: Option<Vec<u32>>,
    overdraw_threshold: f32,
) -> BatchResult<OptimizedMesh> {
    profile_function!();

    let stride = layout.stride();
    let count = vertex_count as usize;
    let mut indices = indices.unwrap_or_else(|| (0..vertex_count).collect());

    if indices.len() % 3 != 0 {
        return Err(BatchError::OptimizeIncompleteTriangles {
            index_count: indices.len() as u32,
        });
    }

    if let Some(&index) = indices.iter().find(|&&i| i >= vertex_count) {
        return Err(BatchError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }

    let (remap, unique) = optimizer.generate_vertex_remap(&indices, vertices, count, stride);
    optimizer.remap_index_buffer(&mut indices, &remap);
    let deduplicated = optimizer.remap_vertex_buffer(vertices, stride, &remap, unique);

    optimizer.optimize_vertex_cache(&mut indices, unique);

    match layout.position_offset() {
        Some(offset) => {
            let positions = extract_positions(&deduplicated, unique, stride, offset);
            optimizer.optimize_overdraw(&mut indices, &positions, overdraw_threshold);
        }
        None => {
            tracing::warn!(
                "Vertex layout has no Float32x3 position, skipping overdraw optimization"
            );
        }
    }

    let (vertices, fetched) =
        optimizer.optimize_vertex_fetch(&mut indices, &deduplicated, unique, stride);
    if fetched != unique {
        return Err(BatchError::VertexDropped {
            before: unique as u32,
            after: fetched as u32,
        });
    }

    tracing::debug!(
        "Optimized mesh: {} -> {} vertices, {} indices",
        vertex_count,
        unique,
        indices.len()
    );

    Ok(OptimizedMesh {
        vertices,
        indices,
        vertex_count: unique as u32,
    })
}
