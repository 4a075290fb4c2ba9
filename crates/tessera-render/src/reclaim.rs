//! Releasing the GPU buffers of a [`BuiltBuffer`].

use tessera_core::profiling::profile_function;
use tessera_test_utils::RenderContext;

use crate::buffer_pool::BufferPool;
use crate::realize::{BoundBuffer, BufferLifetime, BuiltBuffer};

impl BuiltBuffer {
    /// Release every buffer this built buffer owns.
    ///
    /// Temporary buffers go back to `pool`; permanent ones are destroyed. The
    /// shared quad index buffer is left alone either way, and the shared
    /// vertex input state is only dropped by reference.
    pub fn reclaim(self, context: &dyn RenderContext, pool: &mut BufferPool) {
        profile_function!();

        let BuiltBuffer {
            lifetime,
            vertex_array,
            storage,
            command_buffer,
            ..
        } = self;

        let owned = vertex_array
            .vertices
            .into_iter()
            .chain(vertex_array.instances)
            .chain(vertex_array.indices.map(|binding| binding.buffer))
            .chain(storage.into_iter().map(|binding| binding.buffer))
            .chain(command_buffer)
            .filter(|bound| !bound.shared);

        for BoundBuffer { buffer, usage, .. } in owned {
            match lifetime {
                BufferLifetime::Temporary => pool.recycle(usage, buffer),
                BufferLifetime::Permanent => context.destroy_buffer(&buffer),
            }
        }
    }
}
