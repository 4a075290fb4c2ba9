//! End-to-end batch pipeline tests against the mock render context.
//!
//! Every test fills a group, then prepares, realizes, renders and reclaims
//! it, checking the resource and pass calls the mocks record.

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use tessera_render::{
    Batch, BatchConfig, BatchContext, BatchDataGroup, BatchError, BatchHooks, BatchProgram,
    BufferLifetime, DrawCommand, DrawMode, ErrorKind, IndexFormat, StorageLayout, VertexLayout,
};
use tessera_test_utils::{
    DrawCall, DrawRecorder, GpuBindGroupLayout, GpuRenderPipeline, MockRenderContext,
    MockRenderPass, RenderCall,
};
use wgpu::{BufferUsages, VertexFormat};

fn setup() -> (Arc<MockRenderContext>, BatchContext) {
    let mock = Arc::new(MockRenderContext::new());
    let context = BatchContext::new(mock.clone(), BatchConfig::default());
    (mock, context)
}

fn positions() -> VertexLayout {
    VertexLayout::new().with_element(VertexFormat::Float32x3)
}

fn put_positions(group: &mut BatchDataGroup, points: &[Vec3]) {
    for &p in points {
        group.vertices().arena().put_vec3(p).unwrap();
        group.vertices().end_element().unwrap();
    }
}

fn put_quads(group: &mut BatchDataGroup, quads: u32) {
    for q in 0..quads {
        let origin = Vec3::new(q as f32 * 2.0, 0.0, 0.0);
        for corner in [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y] {
            let vertices = group.vertices();
            vertices
                .arena()
                .put_vec3(origin + corner)
                .unwrap()
                .put_u32(0xff00_ffff)
                .unwrap();
            vertices.end_element().unwrap();
        }
    }
}

fn writes_to(mock: &MockRenderContext, id: usize) -> Vec<usize> {
    mock.calls()
        .into_iter()
        .filter_map(|call| match call {
            RenderCall::WriteBuffer { buffer_id, size, .. } if buffer_id == id => Some(size),
            _ => None,
        })
        .collect()
}

fn created_with(mock: &MockRenderContext, usage: BufferUsages) -> Vec<usize> {
    mock.calls()
        .into_iter()
        .filter_map(|call| match call {
            RenderCall::CreateBuffer { buffer_id, usage: u, .. } if u.contains(usage) => {
                Some(buffer_id)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_empty_group_draws_zero_vertices() {
    let (mock, mut context) = setup();
    let group = context.create_group(Batch::new("empty", positions(), DrawMode::TRIANGLES).build());

    let prepared = context.prepare(group, false).unwrap();
    assert!(matches!(
        prepared.commands(),
        [DrawCommand::Arrays(cmd)] if cmd.vertex_count == 0 && cmd.instance_count == 1
    ));

    let built = context.realize(prepared, BufferLifetime::Temporary);
    let vertices = built.vertex_array().vertices().unwrap();
    let id = vertices.buffer().mock_id();
    assert_eq!(vertices.size(), 4);
    assert_eq!(mock.count_buffer_creates(), 1);
    assert_eq!(mock.count_buffer_writes(), 0);
    assert_eq!(built.uploaded_bytes(), 0);

    let mut pass = MockRenderPass::new();
    context.render(&mut pass, &built, &Mat4::IDENTITY).unwrap();
    assert_eq!(
        pass.calls(),
        vec![
            DrawCall::SetVertexBuffer {
                slot: 0,
                buffer_id: id,
                size: 4,
            },
            DrawCall::Draw {
                vertices: 0..0,
                instances: 0..1,
            },
        ]
    );
    context.reclaim(built);
}

#[test]
fn test_empty_quads_bind_vertex_and_index_buffers() {
    let (mock, mut context) = setup();
    let batch = Batch::new("quads", VertexLayout::position_color(), DrawMode::QUADS).build();
    let group = context.create_group(batch);

    let mut pass = MockRenderPass::new();
    context
        .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
        .unwrap();

    let calls = pass.calls();
    let Some(draw) = calls.iter().position(|c| matches!(c, DrawCall::DrawIndexed { .. })) else {
        panic!("expected an indexed draw, got {:?}", calls);
    };
    assert_eq!(
        calls[draw],
        DrawCall::DrawIndexed {
            indices: 0..0,
            base_vertex: 0,
            instances: 0..1,
        }
    );
    let before = &calls[..draw];
    assert!(before.iter().any(|c| matches!(
        c,
        DrawCall::SetVertexBuffer { slot: 0, buffer_id: Some(_), .. }
    )));
    assert!(before.iter().any(|c| matches!(
        c,
        DrawCall::SetIndexBuffer {
            buffer_id: Some(_),
            format: wgpu::IndexFormat::Uint32,
            ..
        }
    )));
    assert_eq!(created_with(&mock, BufferUsages::INDEX).len(), 1);
    assert_eq!(mock.count_buffer_writes(), 0);
}

#[test]
fn test_quads_share_one_index_buffer() {
    let (mock, mut context) = setup();
    let batch = Batch::new("quads", VertexLayout::position_color(), DrawMode::QUADS).build();
    let mut pass = MockRenderPass::new();

    for _ in 0..3 {
        let mut group = context.create_group(batch.clone());
        put_quads(&mut group, 1);

        let prepared = context.prepare(group, false).unwrap();
        assert!(matches!(
            prepared.commands(),
            [DrawCommand::Elements(cmd)] if cmd.index_count == 6
        ));
        assert!(prepared.indices().unwrap().is_shared());

        let built = context.realize(prepared, BufferLifetime::Temporary);
        context.render(&mut pass, &built, &Mat4::IDENTITY).unwrap();
        context.reclaim(built);
    }

    let index_buffers = created_with(&mock, BufferUsages::INDEX);
    assert_eq!(index_buffers.len(), 1);
    assert!(!mock.is_destroyed(index_buffers[0]));
    assert_eq!(pass.count_direct_draws(), 3);
    assert!(pass.calls().iter().all(|call| match call {
        DrawCall::SetIndexBuffer { buffer_id, size, .. } =>
            *buffer_id == Some(index_buffers[0]) && *size == 24,
        _ => true,
    }));
}

#[test]
fn test_quads_index_count_scales() {
    let (_mock, mut context) = setup();
    let batch = Batch::new("quads", VertexLayout::position_color(), DrawMode::QUADS).build();
    let mut group = context.create_group(batch);
    put_quads(&mut group, 5);

    let prepared = context.prepare(group, false).unwrap();
    assert_eq!(prepared.indices().unwrap().count(), 30);
    assert!(context.quad_cache().capacity() >= 5);
}

#[test]
fn test_breakpoints_split_arrays_commands() {
    let (mock, mut context) = setup();
    let batch = Batch::new("strips", positions(), DrawMode::TRIANGLE_STRIP).build();
    let mut group = context.create_group(batch);

    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    group.vertices().end_connected_primitive();
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE]);
    group.vertices().end_connected_primitive();

    let prepared = context.prepare(group, false).unwrap();
    let [DrawCommand::Arrays(first), DrawCommand::Arrays(second)] = prepared.commands() else {
        panic!("expected two arrays commands, got {:?}", prepared.commands());
    };
    assert_eq!((first.vertex_count, first.first_vertex), (3, 0));
    assert_eq!((second.vertex_count, second.first_vertex), (4, 3));

    let built = context.realize(prepared, BufferLifetime::Temporary);
    let command_buffer = built.command_buffer().expect("two commands need a command buffer");
    let id = command_buffer.buffer().mock_id().unwrap();
    assert_eq!(writes_to(&mock, id), vec![32]);
    assert_eq!(&mock.buffer_contents(id).unwrap()[..4], &3u32.to_le_bytes());

    let mut pass = MockRenderPass::new();
    context.render(&mut pass, &built, &Mat4::IDENTITY).unwrap();
    assert_eq!(
        pass.draws(),
        vec![DrawCall::MultiDrawIndirect {
            buffer_id: Some(id),
            offset: 0,
            count: 2,
        }]
    );
    context.reclaim(built);

    let stats = context.end_frame();
    assert_eq!(stats.indirect_draws, 1);
    assert_eq!(stats.direct_draws, 0);
}

#[test]
fn test_single_command_skips_command_buffer() {
    let (mock, mut context) = setup();
    let batch = Batch::new("tri", positions(), DrawMode::TRIANGLES).build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);

    let prepared = context.prepare(group, false).unwrap();
    let built = context.realize(prepared, BufferLifetime::Temporary);
    assert!(built.command_buffer().is_none());
    assert_eq!(created_with(&mock, BufferUsages::INDIRECT).len(), 0);
}

#[test]
fn test_optimization_preserves_triangles() {
    let (_mock, mut context) = setup();
    let batch = Batch::new("grid", positions(), DrawMode::TRIANGLES).build();
    let mut group = context.create_group(batch);

    // 2x2 cells over a 3x3 vertex grid, written unindexed with shared corners repeated
    let mut expected = Vec::new();
    for y in 0..2 {
        for x in 0..2 {
            let p = |dx: i32, dy: i32| Vec3::new((x + dx) as f32, (y + dy) as f32, 0.0);
            for tri in [[p(0, 0), p(1, 0), p(1, 1)], [p(0, 0), p(1, 1), p(0, 1)]] {
                put_positions(&mut group, &tri);
                expected.push(tri);
            }
        }
    }

    let prepared = context.prepare(group, true).unwrap();
    assert_eq!(prepared.vertex_count(), 9);
    let index_data = prepared.indices().unwrap();
    assert_eq!(index_data.format(), IndexFormat::Uint32);
    assert_eq!(index_data.count(), 24);

    let vertices: Vec<Vec3> = prepared
        .vertices()
        .chunks_exact(12)
        .map(|chunk| {
            let floats: [f32; 3] = bytemuck::pod_read_unaligned(chunk);
            Vec3::from_array(floats)
        })
        .collect();
    let tessera_render::IndexData::Owned { bytes, .. } = index_data else {
        panic!("optimized meshes own their indices");
    };
    let indices: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    let normalize = |tri: [Vec3; 3]| {
        let key = |v: Vec3| (v.x as i32, v.y as i32);
        let start = (0..3).min_by_key(|&i| key(tri[i])).unwrap();
        [0, 1, 2].map(|k| key(tri[(start + k) % 3]))
    };
    let mut actual: Vec<_> = indices
        .chunks_exact(3)
        .map(|t| normalize([t[0], t[1], t[2]].map(|i| vertices[i as usize])))
        .collect();
    let mut expected: Vec<_> = expected.into_iter().map(normalize).collect();
    actual.sort();
    expected.sort();
    assert_eq!(actual, expected);
}

#[test]
fn test_optimize_rejects_strips() {
    let (_mock, mut context) = setup();
    let batch = Batch::new("strip", positions(), DrawMode::TRIANGLE_STRIP).build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    group.vertices().end_connected_primitive();

    let err = context.prepare(group, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptimizerPrecondition);
}

#[test]
fn test_protocol_violations() {
    let (_mock, mut context) = setup();

    let batch = Batch::new("quads", VertexLayout::position_color(), DrawMode::QUADS).build();
    let mut group = context.create_group(batch);
    put_quads(&mut group, 1);
    group.vertices().arena().put_vec3(Vec3::ZERO).unwrap().put_u32(0).unwrap();
    group.vertices().end_element().unwrap();
    assert_eq!(
        context.prepare(group, false).unwrap_err(),
        BatchError::IncompleteQuads { vertex_count: 5 }
    );

    let batch = Batch::new("tri", positions(), DrawMode::TRIANGLES).build();
    let mut group = context.create_group(batch);
    group.vertices().arena().put_vec2(glam::Vec2::ONE).unwrap();
    let err = group.vertices().end_element().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert!(matches!(
        err,
        BatchError::ElementSizeMismatch { written: 8, stride: 12, .. }
    ));

    let batch = Batch::new("strip", positions(), DrawMode::LINE_STRIP).build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X]);
    group.vertices().end_connected_primitive();
    put_positions(&mut group, &[Vec3::Y]);
    assert!(matches!(
        context.prepare(group, false),
        Err(BatchError::UnterminatedPrimitive { last: 2, vertex_count: 3 })
    ));
}

#[test]
fn test_temporary_buffers_return_to_pool() {
    let (mock, mut context) = setup();
    let batch = Batch::new("tri", positions(), DrawMode::TRIANGLES).build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);

    let prepared = context.prepare(group, false).unwrap();
    let built = context.realize(prepared, BufferLifetime::Temporary);
    context.reclaim(built);

    assert_eq!(mock.count_buffer_destroys(), 0);
    assert_eq!(context.pool().in_flight_count(), 1);
    assert_eq!(context.pool().available_count(), 0);

    context.end_frame();
    assert_eq!(context.pool().available_count(), 1);
}

#[test]
fn test_permanent_buffers_are_destroyed() {
    let (mock, mut context) = setup();
    let batch = Batch::new("quads", VertexLayout::position_color(), DrawMode::QUADS).build();
    let mut group = context.create_group(batch);
    put_quads(&mut group, 2);

    let prepared = context.prepare(group, false).unwrap();
    let built = context.realize(prepared, BufferLifetime::Permanent);
    let vertices = built.vertex_array().vertices().unwrap();
    assert_eq!(vertices.size(), 2 * 4 * 16);
    let vertex_id = vertices.buffer().mock_id().unwrap();
    let index_id = built
        .vertex_array()
        .indices()
        .unwrap()
        .buffer()
        .buffer()
        .mock_id()
        .unwrap();

    let mut pass = MockRenderPass::new();
    context.render(&mut pass, &built, &Mat4::IDENTITY).unwrap();
    context.render(&mut pass, &built, &Mat4::IDENTITY).unwrap();
    assert_eq!(pass.count_direct_draws(), 2);

    context.reclaim(built);
    assert!(mock.is_destroyed(vertex_id));
    assert!(!mock.is_destroyed(index_id));
    assert_eq!(context.pool().available_count(), 0);
}

#[test]
fn test_storage_stream_binds_program_slot() {
    let (mock, mut context) = setup();
    let program = BatchProgram::new(GpuRenderPipeline::mock(7)).with_storage_slot(
        "lights",
        1,
        GpuBindGroupLayout::mock(3),
    );
    let batch = Batch::new("lit", positions(), DrawMode::TRIANGLES)
        .with_storage(StorageLayout::new("lights", 16))
        .with_program(program)
        .build();

    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    for color in [Vec4::ONE, Vec4::W] {
        let lights = group.storage("lights").unwrap();
        lights.arena().put_vec4(color).unwrap();
        lights.end_element().unwrap();
    }
    assert!(matches!(
        group.storage("shadows"),
        Err(BatchError::UnknownStorageStream { .. })
    ));

    let prepared = context.prepare(group, false).unwrap();
    assert_eq!(prepared.storage("lights").map(<[u8]>::len), Some(32));

    let built = context.realize(prepared, BufferLifetime::Temporary);
    assert_eq!(mock.count_bind_group_creates(), 1);
    assert_eq!(built.storage().len(), 1);
    assert_eq!(built.storage()[0].group(), 1);

    let mut pass = MockRenderPass::new();
    context.render(&mut pass, &built, &Mat4::IDENTITY).unwrap();
    let bind_group_id = built.storage()[0].bind_group().mock_id();
    assert!(pass.calls().contains(&DrawCall::SetPipeline {
        pipeline_id: Some(7)
    }));
    assert!(pass.calls().contains(&DrawCall::SetBindGroup {
        index: 1,
        bind_group_id,
    }));
    context.reclaim(built);
}

#[test]
fn test_model_matrix_and_color_modifier() {
    let (_mock, mut context) = setup();
    let program = BatchProgram::new(GpuRenderPipeline::mock(1))
        .with_model_matrix()
        .with_color_modifier();
    let batch = Batch::new("tinted", positions(), DrawMode::TRIANGLES)
        .with_program(program)
        .build();
    let mut pass = MockRenderPass::new();

    let mut group = context.create_group(batch.clone());
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    context
        .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
        .unwrap();
    assert!(
        !pass
            .calls()
            .iter()
            .any(|call| matches!(call, DrawCall::SetPushConstants { .. }))
    );

    pass.clear();
    context.set_color_modifier(Some(Vec4::new(1.0, 0.5, 0.5, 1.0)));
    let model = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    context.draw_immediate(&mut pass, group, false, &model).unwrap();

    let pushes: Vec<(u32, Vec<u8>)> = pass
        .calls()
        .iter()
        .filter_map(|call| match call {
            DrawCall::SetPushConstants { offset, data } => Some((*offset, data.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(pushes.len(), 3);
    assert_eq!(pushes[0].0, 0);
    assert_eq!(pushes[0].1, bytemuck::bytes_of(&model.to_cols_array()).to_vec());
    assert_eq!(pushes[1].0, 64);
    assert_eq!(pushes[1].1.len(), 16);
    assert_eq!(pushes[2].0, 0);
    assert_eq!(
        pushes[2].1,
        bytemuck::bytes_of(&Mat4::IDENTITY.to_cols_array()).to_vec()
    );
}

struct MarkerHooks;

impl BatchHooks for MarkerHooks {
    fn setup(&self, pass: &mut dyn DrawRecorder) {
        pass.push_debug_group("setup");
    }

    fn cleanup(&self, pass: &mut dyn DrawRecorder) {
        pass.pop_debug_group();
    }
}

#[test]
fn test_hooks_wrap_draw() {
    let (_mock, mut context) = setup();
    let batch = Batch::new("hooked", positions(), DrawMode::TRIANGLES)
        .with_hooks(Arc::new(MarkerHooks))
        .build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);

    let mut pass = MockRenderPass::new();
    context
        .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
        .unwrap();

    let calls = pass.calls();
    assert_eq!(calls[0], DrawCall::PushDebugGroup("hooked".to_string()));
    assert_eq!(calls[1], DrawCall::PushDebugGroup("setup".to_string()));
    let draw = calls
        .iter()
        .position(|call| matches!(call, DrawCall::Draw { .. }))
        .unwrap();
    assert_eq!(&calls[draw + 1..], &[DrawCall::PopDebugGroup, DrawCall::PopDebugGroup]);
}

#[test]
fn test_instanced_batch_binds_instance_slot() {
    let (_mock, mut context) = setup();
    let batch = Batch::new("instanced", positions(), DrawMode::TRIANGLES.instanced())
        .with_instance_layout(VertexLayout::new().with_element(VertexFormat::Float32x4))
        .build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    for offset in [Vec4::ZERO, Vec4::X, Vec4::Y, Vec4::Z] {
        let instances = group.instances().unwrap();
        instances.arena().put_vec4(offset).unwrap();
        instances.end_element().unwrap();
    }

    let mut pass = MockRenderPass::new();
    context
        .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
        .unwrap();

    assert!(pass.calls().iter().any(|call| matches!(
        call,
        DrawCall::SetVertexBuffer { slot: 1, size: 64, .. }
    )));
    assert_eq!(
        pass.draws(),
        vec![DrawCall::Draw {
            vertices: 0..3,
            instances: 0..4,
        }]
    );
}

#[test]
fn test_explicit_u16_indices() {
    let (mock, mut context) = setup();
    let batch = Batch::new("indexed", positions(), DrawMode::INDEXED_TRIANGLES)
        .with_index_format(IndexFormat::Uint16)
        .build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    group.indices().put_triangle(0, 1, 2).unwrap();

    let mut pass = MockRenderPass::new();
    context
        .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
        .unwrap();

    // 6 bytes of u16 indices are padded to the copy alignment
    let index_id = created_with(&mock, BufferUsages::INDEX)[0];
    assert_eq!(writes_to(&mock, index_id), vec![8]);
    assert!(pass.calls().iter().any(|call| matches!(
        call,
        DrawCall::SetIndexBuffer { format: wgpu::IndexFormat::Uint16, .. }
    )));
    assert_eq!(
        pass.draws(),
        vec![DrawCall::DrawIndexed {
            indices: 0..3,
            base_vertex: 0,
            instances: 0..1,
        }]
    );
}

#[test]
fn test_pool_reused_across_frames() {
    let (mock, mut context) = setup();
    let batch = Batch::new("tri", positions(), DrawMode::TRIANGLES).build();
    let mut pass = MockRenderPass::new();

    for _ in 0..4 {
        let mut group = context.create_group(batch.clone());
        put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
        context
            .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
            .unwrap();
        context.end_frame();
    }

    assert_eq!(mock.count_buffer_creates(), 1);
    context.shutdown();
    assert_eq!(mock.count_buffer_destroys(), 1);
}

#[test]
fn test_batches_in_one_pass_keep_their_buffers() {
    let (mock, mut context) = setup();
    let batch = Batch::new("tri", positions(), DrawMode::TRIANGLES).build();
    let mut pass = MockRenderPass::new();

    let offsets = [0.0, 10.0, 20.0];
    for x in offsets {
        let mut group = context.create_group(batch.clone());
        let shift = Vec3::new(x, 0.0, 0.0);
        put_positions(&mut group, &[shift, shift + Vec3::X, shift + Vec3::Y]);
        context
            .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
            .unwrap();
    }

    let bound: Vec<usize> = pass
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DrawCall::SetVertexBuffer { slot: 0, buffer_id, .. } => *buffer_id,
            _ => None,
        })
        .collect();
    assert_eq!(bound.len(), 3);
    assert!(bound[0] != bound[1] && bound[1] != bound[2] && bound[0] != bound[2]);

    // Every buffer still holds the vertices of its own draw when the pass runs.
    for (&id, x) in bound.iter().zip(offsets) {
        let contents = mock.buffer_contents(id).unwrap();
        let first_x = f32::from_le_bytes([contents[0], contents[1], contents[2], contents[3]]);
        assert_eq!(first_x, x);
    }

    context.end_frame();
    assert_eq!(context.pool().available_count(), 3);

    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    context
        .draw_immediate(&mut pass, group, false, &Mat4::IDENTITY)
        .unwrap();
    assert_eq!(mock.count_buffer_creates(), 3);
}

#[test]
fn test_optimize_rejects_partial_triangles() {
    let (_mock, mut context) = setup();
    let batch = Batch::new("mesh", positions(), DrawMode::INDEXED_TRIANGLES).build();
    let mut group = context.create_group(batch);
    put_positions(&mut group, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
    group.indices().put_indices(&[0, 1, 2, 0]).unwrap();

    let err = context.prepare(group, true).unwrap_err();
    assert!(matches!(err, BatchError::OptimizeIncompleteTriangles { index_count: 4 }));
    assert_eq!(err.kind(), ErrorKind::OptimizerPrecondition);
}
