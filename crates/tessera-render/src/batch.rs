//! Batch descriptors: what a group's streams mean and how they are drawn.

use std::sync::Arc;

use tessera_test_utils::{DrawRecorder, GpuBindGroupLayout, GpuRenderPipeline};

use crate::draw_mode::DrawMode;
use crate::holder::IndexFormat;
use crate::layout::{StorageLayout, VertexLayout};

/// Push constant offset of the model matrix (`mat4x4<f32>`).
pub const MODEL_MATRIX_PUSH_OFFSET: u32 = 0;
/// Push constant offset of the color modifier (`vec4<f32>`).
pub const COLOR_MODIFIER_PUSH_OFFSET: u32 = 64;
/// Push constant bytes a program needs to receive both values.
pub const PUSH_CONSTANT_SIZE: u32 = 80;

/// Bind group slot a program reads a storage stream from.
#[derive(Debug, Clone)]
pub struct StorageSlot {
    pub name: String,
    /// Bind group index. The stream is exposed at binding 0.
    pub group: u32,
    pub layout: GpuBindGroupLayout,
}

/// Shader program a batch is drawn with.
///
/// The program decides which optional inputs the renderer supplies: a model
/// matrix and color modifier through push constants, and storage streams
/// through bind groups.
#[derive(Debug, Clone)]
pub struct BatchProgram {
    pub pipeline: GpuRenderPipeline,
    pub storage_slots: Vec<StorageSlot>,
    pub model_matrix_offset: Option<u32>,
    pub color_modifier_offset: Option<u32>,
}

impl BatchProgram {
    pub fn new(pipeline: GpuRenderPipeline) -> Self {
        Self {
            pipeline,
            storage_slots: Vec::new(),
            model_matrix_offset: None,
            color_modifier_offset: None,
        }
    }

    /// Receive the model matrix at [`MODEL_MATRIX_PUSH_OFFSET`].
    pub fn with_model_matrix(mut self) -> Self {
        self.model_matrix_offset = Some(MODEL_MATRIX_PUSH_OFFSET);
        self
    }

    /// Receive the color modifier at [`COLOR_MODIFIER_PUSH_OFFSET`].
    pub fn with_color_modifier(mut self) -> Self {
        self.color_modifier_offset = Some(COLOR_MODIFIER_PUSH_OFFSET);
        self
    }

    /// Read the storage stream `name` from bind group `group`.
    pub fn with_storage_slot(
        mut self,
        name: impl Into<String>,
        group: u32,
        layout: GpuBindGroupLayout,
    ) -> Self {
        self.storage_slots.push(StorageSlot {
            name: name.into(),
            group,
            layout,
        });
        self
    }

    pub fn storage_slot(&self, name: &str) -> Option<&StorageSlot> {
        self.storage_slots.iter().find(|slot| slot.name == name)
    }
}

/// Pass state changes made around a batch's draw.
pub trait BatchHooks: Send + Sync {
    /// Runs after the empty-batch check, before any state is bound.
    fn setup(&self, _pass: &mut dyn DrawRecorder) {}

    /// Runs after the draw.
    fn cleanup(&self, _pass: &mut dyn DrawRecorder) {}
}

/// Describes one kind of batch. Shared by every group, prepared buffer and
/// built buffer made from it.
pub struct Batch {
    pub label: String,
    pub vertex_layout: VertexLayout,
    pub instance_layout: Option<VertexLayout>,
    pub storage_layouts: Vec<StorageLayout>,
    pub mode: DrawMode,
    pub index_format: IndexFormat,
    pub program: Option<BatchProgram>,
    pub hooks: Option<Arc<dyn BatchHooks>>,
}

impl Batch {
    pub fn new(label: impl Into<String>, vertex_layout: VertexLayout, mode: DrawMode) -> Self {
        Self {
            label: label.into(),
            vertex_layout,
            instance_layout: None,
            storage_layouts: Vec::new(),
            mode,
            index_format: IndexFormat::default(),
            program: None,
            hooks: None,
        }
    }

    pub fn with_instance_layout(mut self, layout: VertexLayout) -> Self {
        self.instance_layout = Some(layout);
        self
    }

    pub fn with_storage(mut self, layout: StorageLayout) -> Self {
        self.storage_layouts.push(layout);
        self
    }

    pub fn with_index_format(mut self, format: IndexFormat) -> Self {
        self.index_format = format;
        self
    }

    pub fn with_program(mut self, program: BatchProgram) -> Self {
        self.program = Some(program);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn BatchHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn storage_layout(&self, name: &str) -> Option<&StorageLayout> {
        self.storage_layouts.iter().find(|layout| layout.name == name)
    }

    /// Finish building and share.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("label", &self.label)
            .field("vertex_layout", &self.vertex_layout)
            .field("instance_layout", &self.instance_layout)
            .field("storage_layouts", &self.storage_layouts)
            .field("mode", &self.mode)
            .field("index_format", &self.index_format)
            .field("program", &self.program.is_some())
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(Batch: Send, Sync);
