//! Records the draw of a [`BuiltBuffer`] into a pass.

use glam::{Mat4, Vec4};

use tessera_core::profiling::profile_function;
use tessera_test_utils::DrawRecorder;

use crate::command::DrawCommand;
use crate::error::{BatchError, BatchResult};
use crate::realize::BuiltBuffer;
use crate::vertex_state::{INSTANCE_SLOT, VERTEX_SLOT};

fn draw_direct(pass: &mut dyn DrawRecorder, command: &DrawCommand) {
    match command {
        DrawCommand::Arrays(cmd) => pass.draw(
            cmd.first_vertex..cmd.first_vertex + cmd.vertex_count,
            cmd.first_instance..cmd.first_instance + cmd.instance_count,
        ),
        DrawCommand::Elements(cmd) => pass.draw_indexed(
            cmd.first_index..cmd.first_index + cmd.index_count,
            cmd.base_vertex,
            cmd.first_instance..cmd.first_instance + cmd.instance_count,
        ),
    }
}

/// Draw `built` with `model` as its model matrix.
///
/// The model matrix is only pushed when it is not the identity, and the
/// identity is pushed back afterwards. `color_modifier` is pushed when the
/// program receives one. A single command is drawn directly; several are
/// drawn with one indirect multi-draw from the command buffer.
///
/// Batches without commands record nothing.
pub fn render(
    pass: &mut dyn DrawRecorder,
    built: &BuiltBuffer,
    model: &Mat4,
    color_modifier: Option<Vec4>,
) -> BatchResult<()> {
    profile_function!();

    let commands = built.commands();
    if commands.is_empty() {
        return Ok(());
    }
    if commands.len() > 1 && built.command_buffer().is_none() {
        return Err(BatchError::MissingCommandBuffer {
            count: commands.len(),
        });
    }

    let batch = built.batch();
    pass.push_debug_group(&batch.label);

    if let Some(hooks) = &batch.hooks {
        hooks.setup(pass);
    }

    let program = batch.program.as_ref();
    let model_offset = program
        .and_then(|p| p.model_matrix_offset)
        .filter(|_| *model != Mat4::IDENTITY);

    if let Some(program) = program {
        pass.set_pipeline(&program.pipeline);

        if let Some(offset) = model_offset {
            pass.set_push_constants(offset, bytemuck::bytes_of(&model.to_cols_array()));
        }
        if let (Some(offset), Some(color)) = (program.color_modifier_offset, color_modifier) {
            pass.set_push_constants(offset, bytemuck::bytes_of(&color.to_array()));
        }
    }

    for binding in built.storage() {
        pass.set_bind_group(binding.group(), binding.bind_group());
    }

    let vertex_array = built.vertex_array();
    if let Some(vertices) = vertex_array.vertices() {
        pass.set_vertex_buffer(VERTEX_SLOT, vertices.buffer(), vertices.size());
    }
    if let Some(instances) = vertex_array.instances() {
        pass.set_vertex_buffer(INSTANCE_SLOT, instances.buffer(), instances.size());
    }
    if let Some(indices) = vertex_array.indices() {
        pass.set_index_buffer(indices.buffer().buffer(), indices.format(), indices.buffer().size());
    }

    if let [command] = commands {
        draw_direct(pass, command);
    } else if let Some(command_buffer) = built.command_buffer() {
        let count = commands.len() as u32;
        if commands[0].is_indexed() {
            pass.multi_draw_indexed_indirect(command_buffer.buffer(), 0, count);
        } else {
            pass.multi_draw_indirect(command_buffer.buffer(), 0, count);
        }
    }

    if let Some(offset) = model_offset {
        pass.set_push_constants(offset, bytemuck::bytes_of(&Mat4::IDENTITY.to_cols_array()));
    }

    if let Some(hooks) = &batch.hooks {
        hooks.cleanup(pass);
    }

    pass.pop_debug_group();
    Ok(())
}
