//! Uploads a [`PreparedBuffer`] into GPU buffers.
//!
//! Two strategies exist. Temporary buffers are drawn for one frame: they
//! borrow pooled buffers and share vertex input state through the cache.
//! Permanent buffers are drawn many times: they get exactly sized buffers
//! and their own vertex input state, and are destroyed on reclaim.

use std::sync::Arc;

use tessera_core::profiling::{profile_function, profile_scope};
use tessera_test_utils::{GpuBindGroup, GpuBuffer, RenderContext};

use crate::batch::Batch;
use crate::buffer_pool::BufferPool;
use crate::command::{DrawCommand, encode_commands};
use crate::prepare::{IndexData, PreparedBuffer};
use crate::vertex_state::{VertexInputState, VertexStateCache};

/// `write_buffer` sizes and offsets must be multiples of this.
const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

/// Size bound for an empty vertex or index stream.
const PLACEHOLDER_SIZE: u64 = COPY_ALIGNMENT;

/// How long a built buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferLifetime {
    /// Drawn this frame, then returned to the pool.
    #[default]
    Temporary,
    /// Kept and drawn until explicitly reclaimed.
    Permanent,
}

/// A GPU buffer holding one stream.
#[derive(Debug, Clone)]
pub struct BoundBuffer {
    pub(crate) buffer: GpuBuffer,
    /// Bytes of stream data (the buffer may be larger). Empty streams are
    /// bound as a small unwritten buffer of `PLACEHOLDER_SIZE` bytes.
    pub(crate) size: u64,
    pub(crate) usage: wgpu::BufferUsages,
    /// Owned by someone else (the shared quad block); never recycled or destroyed.
    pub(crate) shared: bool,
}

impl BoundBuffer {
    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }
}

/// Index buffer plus its element format.
#[derive(Debug, Clone)]
pub struct IndexBinding {
    pub(crate) buffer: BoundBuffer,
    pub(crate) format: wgpu::IndexFormat,
}

impl IndexBinding {
    pub fn buffer(&self) -> &BoundBuffer {
        &self.buffer
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        self.format
    }
}

/// Vertex input state plus the buffers bound to it.
#[derive(Debug, Clone)]
pub struct VertexArray {
    pub(crate) state: Arc<VertexInputState>,
    pub(crate) vertices: Option<BoundBuffer>,
    pub(crate) instances: Option<BoundBuffer>,
    pub(crate) indices: Option<IndexBinding>,
}

impl VertexArray {
    pub fn state(&self) -> &Arc<VertexInputState> {
        &self.state
    }

    pub fn vertices(&self) -> Option<&BoundBuffer> {
        self.vertices.as_ref()
    }

    pub fn instances(&self) -> Option<&BoundBuffer> {
        self.instances.as_ref()
    }

    pub fn indices(&self) -> Option<&IndexBinding> {
        self.indices.as_ref()
    }
}

/// A storage stream bound for the program.
#[derive(Debug, Clone)]
pub struct StorageBinding {
    pub(crate) name: String,
    pub(crate) group: u32,
    pub(crate) buffer: BoundBuffer,
    pub(crate) bind_group: GpuBindGroup,
}

impl StorageBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn buffer(&self) -> &BoundBuffer {
        &self.buffer
    }

    pub fn bind_group(&self) -> &GpuBindGroup {
        &self.bind_group
    }
}

/// A batch ready to draw.
///
/// Draw it any number of times with [`render`](crate::render), then hand it to
/// [`BuiltBuffer::reclaim`] exactly once.
#[derive(Debug)]
pub struct BuiltBuffer {
    pub(crate) batch: Arc<Batch>,
    pub(crate) lifetime: BufferLifetime,
    pub(crate) vertex_array: VertexArray,
    pub(crate) storage: Vec<StorageBinding>,
    pub(crate) command_buffer: Option<BoundBuffer>,
    pub(crate) commands: Vec<DrawCommand>,
    pub(crate) uploaded_bytes: u64,
}

impl BuiltBuffer {
    pub fn batch(&self) -> &Arc<Batch> {
        &self.batch
    }

    pub fn lifetime(&self) -> BufferLifetime {
        self.lifetime
    }

    pub fn vertex_array(&self) -> &VertexArray {
        &self.vertex_array
    }

    pub fn storage(&self) -> &[StorageBinding] {
        &self.storage
    }

    pub fn command_buffer(&self) -> Option<&BoundBuffer> {
        self.command_buffer.as_ref()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Bytes written to the GPU when this buffer was realized.
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }
}

/// Creates and fills the buffers of one realization.
struct Uploader<'a> {
    context: &'a dyn RenderContext,
    pool: &'a mut BufferPool,
    lifetime: BufferLifetime,
    uploaded: u64,
}

impl Uploader<'_> {
    fn allocate(&mut self, label: &str, usage: wgpu::BufferUsages, size: u64) -> GpuBuffer {
        match self.lifetime {
            BufferLifetime::Temporary => self.pool.borrow(self.context, usage, size),
            BufferLifetime::Permanent => self.context.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        }
    }

    /// Upload `bytes`, or nothing when empty.
    fn upload(
        &mut self,
        label: &str,
        usage: wgpu::BufferUsages,
        bytes: &[u8],
    ) -> Option<BoundBuffer> {
        if bytes.is_empty() {
            return None;
        }

        let size = bytes.len() as u64;
        let padded = size.next_multiple_of(COPY_ALIGNMENT);
        let buffer = self.allocate(label, usage, padded);

        if padded == size {
            self.context.write_buffer(&buffer, 0, bytes);
        } else {
            let mut data = Vec::with_capacity(padded as usize);
            data.extend_from_slice(bytes);
            data.resize(padded as usize, 0);
            self.context.write_buffer(&buffer, 0, &data);
        }
        self.uploaded += padded;

        Some(BoundBuffer {
            buffer,
            size,
            usage,
            shared: false,
        })
    }

    /// Upload `bytes`, binding a placeholder when empty.
    ///
    /// The pipeline's vertex and index slots must be filled even for a
    /// zero-count draw.
    fn upload_or_placeholder(
        &mut self,
        label: &str,
        usage: wgpu::BufferUsages,
        bytes: &[u8],
    ) -> BoundBuffer {
        match self.upload(label, usage, bytes) {
            Some(buffer) => buffer,
            None => self.placeholder(label, usage),
        }
    }

    /// A buffer that is bound but never written or read.
    fn placeholder(&mut self, label: &str, usage: wgpu::BufferUsages) -> BoundBuffer {
        BoundBuffer {
            buffer: self.allocate(label, usage, PLACEHOLDER_SIZE),
            size: PLACEHOLDER_SIZE,
            usage,
            shared: false,
        }
    }
}

/// Upload `prepared` and build a drawable [`BuiltBuffer`].
///
/// The prepared CPU data is dropped once uploaded.
pub fn realize(
    prepared: PreparedBuffer,
    lifetime: BufferLifetime,
    context: &dyn RenderContext,
    pool: &mut BufferPool,
    vertex_states: &mut VertexStateCache,
) -> BuiltBuffer {
    profile_function!();

    let PreparedBuffer {
        batch,
        vertices,
        instances,
        indices,
        mut storage,
        commands,
        ..
    } = prepared;

    let instance_layout = batch.instance_layout.as_ref();
    let state = match lifetime {
        BufferLifetime::Temporary => {
            vertex_states.get_or_create(&batch.vertex_layout, instance_layout)
        }
        BufferLifetime::Permanent => {
            Arc::new(VertexInputState::new(&batch.vertex_layout, instance_layout))
        }
    };

    let mut uploader = Uploader {
        context,
        pool,
        lifetime,
        uploaded: 0,
    };

    let vertex_buffer =
        uploader.upload_or_placeholder("Batch Vertices", wgpu::BufferUsages::VERTEX, &vertices);
    let instance_buffer = instances.as_deref().map(|bytes| {
        uploader.upload_or_placeholder("Batch Instances", wgpu::BufferUsages::VERTEX, bytes)
    });

    let index_binding = match &indices {
        Some(IndexData::Owned { format, bytes }) => Some(IndexBinding {
            buffer: uploader.upload_or_placeholder(
                "Batch Indices",
                wgpu::BufferUsages::INDEX,
                bytes,
            ),
            format: format.to_wgpu(),
        }),
        Some(IndexData::SharedQuads { block, count }) if *count > 0 => Some(IndexBinding {
            buffer: BoundBuffer {
                buffer: block.gpu_buffer(context).clone(),
                size: *count as u64 * 4,
                usage: wgpu::BufferUsages::INDEX,
                shared: true,
            },
            format: wgpu::IndexFormat::Uint32,
        }),
        Some(IndexData::SharedQuads { .. }) => Some(IndexBinding {
            buffer: uploader.placeholder("Batch Quad Indices", wgpu::BufferUsages::INDEX),
            format: wgpu::IndexFormat::Uint32,
        }),
        None => None,
    };

    let mut storage_bindings = Vec::new();
    if let Some(program) = &batch.program {
        profile_scope!("storage_bindings");
        for slot in &program.storage_slots {
            let Some(bytes) = storage.remove(&slot.name) else {
                continue;
            };
            let Some(buffer) = uploader.upload(&slot.name, wgpu::BufferUsages::STORAGE, &bytes)
            else {
                continue;
            };
            let bind_group = context.create_storage_bind_group(
                Some(&slot.name),
                &slot.layout,
                &buffer.buffer,
                buffer.size.next_multiple_of(COPY_ALIGNMENT),
            );
            storage_bindings.push(StorageBinding {
                name: slot.name.clone(),
                group: slot.group,
                buffer,
                bind_group,
            });
        }
    }
    for name in storage.keys() {
        tracing::debug!(
            "Batch '{}' has no storage slot for stream '{}', skipping upload",
            batch.label,
            name
        );
    }

    let command_buffer = if commands.len() > 1 {
        uploader.upload(
            "Batch Draw Commands",
            wgpu::BufferUsages::INDIRECT,
            &encode_commands(&commands),
        )
    } else {
        None
    };

    let uploaded_bytes = uploader.uploaded;

    BuiltBuffer {
        batch,
        lifetime,
        vertex_array: VertexArray {
            state,
            vertices: Some(vertex_buffer),
            instances: instance_buffer,
            indices: index_binding,
        },
        storage: storage_bindings,
        command_buffer,
        commands,
        uploaded_bytes,
    }
}
