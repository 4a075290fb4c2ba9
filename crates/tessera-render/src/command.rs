//! Draw commands in the binary layout indirect draws read.
//!
//! # Feature Requirements
//!
//! - `multi_draw_indirect()` needs no feature flag in wgpu 27+ (only
//!   `DownlevelFlags::INDIRECT_EXECUTION`).
//! - `INDIRECT_FIRST_INSTANCE` is required for a non-zero `first_instance`.
//!   Commands produced by the preparer always use `first_instance = 0`.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// Indirect draw command for non-indexed geometry.
///
/// This matches the layout expected by `wgpu::RenderPass::draw_indirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DrawIndirect {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

// SAFETY: DrawIndirect is a repr(C) struct of u32s with no padding
unsafe impl Pod for DrawIndirect {}
unsafe impl Zeroable for DrawIndirect {}

impl DrawIndirect {
    pub const fn new(
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Self {
        Self {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        }
    }

    /// Size of the command in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Indirect draw command for indexed geometry.
///
/// This matches the layout expected by `wgpu::RenderPass::draw_indexed_indirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DrawIndexedIndirect {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

// SAFETY: DrawIndexedIndirect is a repr(C) struct with no padding
unsafe impl Pod for DrawIndexedIndirect {}
unsafe impl Zeroable for DrawIndexedIndirect {}

impl DrawIndexedIndirect {
    pub const fn new(
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Self {
        Self {
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        }
    }

    /// Size of the command in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

const_assert_eq!(std::mem::size_of::<DrawIndirect>(), 16);
const_assert_eq!(std::mem::size_of::<DrawIndexedIndirect>(), 20);

/// One draw of a prepared batch.
///
/// All commands of a batch share a variant: arrays for non-indexed modes,
/// elements for indexed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawCommand {
    Arrays(DrawIndirect),
    Elements(DrawIndexedIndirect),
}

impl DrawCommand {
    /// Encoded size of this command in bytes.
    pub fn size(&self) -> u64 {
        match self {
            DrawCommand::Arrays(_) => DrawIndirect::SIZE,
            DrawCommand::Elements(_) => DrawIndexedIndirect::SIZE,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, DrawCommand::Elements(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DrawCommand::Arrays(cmd) => bytemuck::bytes_of(cmd),
            DrawCommand::Elements(cmd) => bytemuck::bytes_of(cmd),
        }
    }
}

/// Concatenate commands into the byte stream an indirect buffer holds.
pub fn encode_commands(commands: &[DrawCommand]) -> Vec<u8> {
    let size = commands.iter().map(|c| c.size() as usize).sum();
    let mut bytes = Vec::with_capacity(size);
    for command in commands {
        bytes.extend_from_slice(command.as_bytes());
    }
    bytes
}
