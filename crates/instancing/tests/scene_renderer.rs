mod common;

use common::*;
use glam::{Mat4, Quat, Vec3};
use renderer_instancing::{
    GlobalUniformBlock, GraphicsDeviceContext, InstanceRecord, OutputExtent, RenderError,
    SlotState,
};
use renderer_scene::{
    Camera, Light, MeshComponent, MeshId, RenderableInstance, Scene, SceneSnapshot, TextureId,
    Transform,
};

fn snapshot(instances: Vec<RenderableInstance>, version: u64) -> SceneSnapshot {
    SceneSnapshot::new(instances, version)
}

#[test]
fn test_two_meshes_three_instances_make_two_draws() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let scene = snapshot(
        vec![
            instance(1, Vec3::ZERO),
            instance(2, Vec3::X),
            instance(1, Vec3::Y),
        ],
        1,
    );

    let stats = renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();

    let sizes: Vec<usize> = renderer.groups().iter().map(|g| g.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
    assert_eq!(renderer.groups()[0].mesh_id(), MeshId(1));
    assert_eq!(stats.groups, 2);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.instances, 3);
    assert_eq!(draws(ctx.last_submission()), vec![2, 1]);
}

#[test]
fn test_empty_snapshot_records_nothing() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);

    let stats = renderer
        .render_frame(
            &mut ctx,
            &SceneSnapshot::default(),
            &Camera::default(),
            &Light::default(),
        )
        .unwrap();

    assert!(renderer.groups().is_empty());
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(ctx.submissions().len(), 1);
    assert!(ctx.last_submission().is_empty());
}

#[test]
fn test_out_of_range_variant_keeps_active_one() {
    let mut renderer = renderer(1);
    let mut ctx = MockContext::new(1);
    let scene = snapshot(vec![instance(1, Vec3::ZERO)], 1);

    renderer.set_pipeline_variant(1);
    renderer.set_pipeline_variant(99);
    assert_eq!(renderer.pipelines().active_index(), 1);

    renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();
    assert_eq!(
        ctx.last_submission().first(),
        Some(&Command::BindPipeline("blinn_phong"))
    );
}

#[test]
fn test_null_texture_keeps_stale_binding() {
    let mut renderer = renderer(1);
    let mut ctx = MockContext::new(1);
    let camera = Camera::default();
    let light = Light::default();

    let textured = snapshot(vec![instance(1, Vec3::ZERO)], 1);
    renderer
        .render_frame(&mut ctx, &textured, &camera, &light)
        .unwrap();
    assert_eq!(renderer.backend().descriptor_write_count(), 1);

    // Same topology, base color texture gone.
    let untextured = snapshot(
        vec![RenderableInstance {
            base_color_texture: None,
            ..instance(1, Vec3::ZERO)
        }],
        1,
    );
    let stats = renderer
        .render_frame(&mut ctx, &untextured, &camera, &light)
        .unwrap();

    assert_eq!(renderer.backend().descriptor_write_count(), 1);
    assert_eq!(
        renderer.resources().bound_material(0, MeshId(1)).map(|m| m.base_color),
        Some(BASE_COLOR)
    );
    assert_eq!(stats.draw_calls, 1);

    // A valid texture comes back: the set is rewritten.
    renderer.backend().register_texture(TextureId(7));
    let retextured = snapshot(
        vec![instance(1, Vec3::ZERO).with_textures(TextureId(7), NORMAL_MAP)],
        1,
    );
    renderer
        .render_frame(&mut ctx, &retextured, &camera, &light)
        .unwrap();

    let writes = renderer.backend().descriptor_writes.borrow();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1].material.base_color, TextureId(7));
}

#[test]
fn test_unregistered_texture_is_not_bound() {
    let mut renderer = renderer(1);
    let mut ctx = MockContext::new(1);
    let scene = snapshot(
        vec![instance(1, Vec3::ZERO).with_textures(TextureId(40), TextureId(41))],
        1,
    );

    let stats = renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();

    assert_eq!(renderer.backend().descriptor_write_count(), 0);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.skipped_groups, 1);
    assert!(ctx.last_submission().is_empty());
}

#[test]
fn test_descriptor_sets_reference_their_slot_uniform_buffer() {
    let mut renderer = renderer(3);
    let mut ctx = MockContext::new(3);
    let scene = snapshot(vec![instance(1, Vec3::ZERO), instance(2, Vec3::X)], 1);

    renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();

    // One write per (slot, group), each against that slot's uniform buffer.
    let writes = renderer.backend().descriptor_writes.borrow();
    assert_eq!(writes.len(), 6);
    for slot in 0..3 {
        let uniform = renderer.resources().uniform_buffer(slot).id;
        for mesh in [MeshId(1), MeshId(2)] {
            let set = renderer.resources().descriptor_set(slot, mesh).unwrap();
            let write = writes.iter().find(|w| w.set == set).unwrap();
            assert_eq!(write.uniform_buffer, uniform);
        }
    }
}

#[test]
fn test_draw_binds_group_resources_in_order() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    ctx.extent = OutputExtent::new(640, 480);
    let scene = snapshot(vec![instance(3, Vec3::ZERO)], 1);

    renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();

    let set = renderer.resources().descriptor_set(0, MeshId(3)).unwrap();
    let instances = renderer.resources().instance_buffer(0, MeshId(3)).unwrap().id;
    let mesh = renderer.meshes().get(MeshId(3)).unwrap();

    assert_eq!(
        ctx.last_submission(),
        &[
            Command::BindPipeline("phong"),
            Command::Viewport(OutputExtent::new(640, 480)),
            Command::BindSet(set),
            Command::BindStreams {
                vertices: mesh.vertex_buffer().id,
                instances,
            },
            Command::BindIndex(mesh.index_buffer().id),
            Command::Draw {
                index_count: 6,
                instance_count: 1,
            },
        ]
    );
}

#[test]
fn test_missing_mesh_is_skipped() {
    let mut renderer = renderer(1);
    let mut ctx = MockContext::new(1);
    let scene = snapshot(vec![instance(42, Vec3::ZERO), instance(1, Vec3::ZERO)], 1);

    let stats = renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();

    assert_eq!(stats.groups, 2);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.skipped_groups, 1);
}

#[test]
fn test_no_pipeline_variant_is_an_error() {
    let backend = MockBackend::with_textures(&[BASE_COLOR, NORMAL_MAP]);
    let mut renderer = renderer_instancing::SceneRenderer::new(backend, &config(1)).unwrap();
    let (vertices, indices) = quad();
    renderer.upload_mesh(MeshId(1), &vertices, &indices).unwrap();
    let mut ctx = MockContext::new(1);

    let result = renderer.render_frame(
        &mut ctx,
        &snapshot(vec![instance(1, Vec3::ZERO)], 1),
        &Camera::default(),
        &Light::default(),
    );

    assert!(matches!(result, Err(RenderError::NoPipelineVariant)));
}

#[test]
fn test_default_variant_from_config() {
    let mut config = config(1);
    config.default_pipeline_variant = 1;
    let renderer = renderer_with(config);

    assert_eq!(renderer.pipelines().active_index(), 1);
    assert_eq!(renderer.pipelines().active_name(), Some("blinn_phong"));
}

#[test]
fn test_instance_records_and_light_are_in_view_space() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let camera = Camera::perspective(Vec3::new(3.0, 2.0, 10.0), 60.0, 0.1, 100.0)
        .with_euler_degrees(-10.0, 15.0, 0.0);
    let light = Light::at(Vec3::new(-4.0, 6.0, 2.0));

    let world = Mat4::from_scale_rotation_translation(
        Vec3::new(2.0, 0.5, 1.0),
        Quat::from_rotation_y(0.8),
        Vec3::new(1.0, 0.0, -3.0),
    );
    let scene = snapshot(
        vec![RenderableInstance::new(MeshId(1), world).with_textures(BASE_COLOR, NORMAL_MAP)],
        1,
    );

    renderer
        .render_frame(&mut ctx, &scene, &camera, &light)
        .unwrap();

    let view = camera.view_matrix();
    let records = renderer
        .resources()
        .instance_records(0, MeshId(1), 1)
        .unwrap();
    assert_eq!(records[0], InstanceRecord::new(world, view));

    let block = renderer.resources().uniform_block(0).unwrap();
    let expected = GlobalUniformBlock::new(
        view,
        camera.projection_matrix_for_aspect(1280.0 / 720.0),
        camera.position,
        &light,
    );
    assert_eq!(block, expected);
    assert!((block.light.position - view.transform_point3(light.position)).length() < 1e-5);
}

#[test]
fn test_large_groups_are_written_in_parallel() {
    let mut config = config(1);
    config.parallel_instance_threshold = 8;
    let mut renderer = renderer_with(config);
    let mut ctx = MockContext::new(1);
    let camera = Camera::default();

    let instances: Vec<RenderableInstance> = (0..100)
        .map(|i| instance(2, Vec3::new(i as f32, (i % 7) as f32, -(i as f32) * 0.5)))
        .collect();
    let scene = snapshot(instances.clone(), 1);

    renderer
        .render_frame(&mut ctx, &scene, &camera, &Light::default())
        .unwrap();

    let view = camera.view_matrix();
    let records = renderer
        .resources()
        .instance_records(0, MeshId(2), 100)
        .unwrap();
    for (record, instance) in records.iter().zip(&instances) {
        assert_eq!(*record, InstanceRecord::new(instance.world_transform, view));
    }
    assert_eq!(draws(ctx.last_submission()), vec![100]);
}

#[test]
fn test_viewport_and_projection_follow_resize() {
    let mut renderer = renderer(1);
    let mut ctx = MockContext::new(1);
    let camera = Camera::default();
    let scene = snapshot(vec![instance(1, Vec3::ZERO)], 1);

    ctx.extent = OutputExtent::new(800, 600);
    renderer
        .render_frame(&mut ctx, &scene, &camera, &Light::default())
        .unwrap();
    ctx.extent = OutputExtent::new(1024, 256);
    renderer
        .render_frame(&mut ctx, &scene, &camera, &Light::default())
        .unwrap();

    assert!(
        ctx.last_submission()
            .contains(&Command::Viewport(OutputExtent::new(1024, 256)))
    );
    let block = renderer.resources().uniform_block(0).unwrap();
    assert_eq!(block.projection, camera.projection_matrix_for_aspect(4.0));
}

#[test]
fn test_out_of_range_frame_count_is_clamped_on_both_sides() {
    for (requested, expected) in [(0, 1), (4, 3), (8, 3)] {
        let config = config(requested);
        let mut renderer = renderer_with(config.clone());
        let mut ctx = MockContext::from_config(&config);
        assert_eq!(renderer.frames_in_flight(), expected);
        assert_eq!(ctx.frames_in_flight(), expected);

        let scene = snapshot(vec![instance(1, Vec3::ZERO)], 1);
        for _ in 0..expected + 1 {
            renderer
                .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
                .unwrap();
        }
        assert_eq!(ctx.submissions().len(), expected + 1);
    }
}

#[test]
fn test_slot_is_waited_on_before_it_is_recorded_again() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let scene = snapshot(vec![instance(1, Vec3::ZERO)], 1);

    for _ in 0..3 {
        renderer
            .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
            .unwrap();
    }

    let wait = ctx.position(&Event::WaitSlot(0)).unwrap();
    let begins: Vec<usize> = ctx
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == Event::Begin(0))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(begins.len(), 2);
    assert!(begins[0] < wait && wait < begins[1]);
    assert_eq!(ctx.count(&Event::WaitSlot(1)), 0);
    assert_eq!(ctx.count(&Event::WaitIdle), 0);

    assert_eq!(renderer.slot_state(0), SlotState::Submitted);
    assert_eq!(renderer.slot_state(1), SlotState::Submitted);
}

#[test]
fn test_topology_change_in_flight_waits_for_idle() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let camera = Camera::default();
    let light = Light::default();

    renderer
        .render_frame(&mut ctx, &snapshot(vec![instance(1, Vec3::ZERO)], 1), &camera, &light)
        .unwrap();
    assert_eq!(ctx.count(&Event::WaitIdle), 0);

    let grown = snapshot(vec![instance(1, Vec3::ZERO), instance(2, Vec3::X)], 2);
    renderer
        .render_frame(&mut ctx, &grown, &camera, &light)
        .unwrap();

    let idle = ctx.position(&Event::WaitIdle).unwrap();
    let begin = ctx.position(&Event::Begin(1)).unwrap();
    assert!(idle < begin);
    assert_eq!(renderer.slot_state(0), SlotState::Idle);
    assert_eq!(renderer.slot_state(1), SlotState::Submitted);
    assert_eq!(renderer.resources().group_count(0), 2);
}

#[test]
fn test_unchanged_topology_does_not_reallocate() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let scene = snapshot(vec![instance(1, Vec3::ZERO), instance(1, Vec3::X)], 5);

    renderer
        .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
        .unwrap();
    let allocations = renderer.backend().allocations();

    for _ in 0..4 {
        renderer
            .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
            .unwrap();
    }

    assert_eq!(renderer.backend().allocations(), allocations);
    assert_eq!(ctx.count(&Event::WaitIdle), 0);
}

#[test]
fn test_instance_buffer_allocation_failure_names_size_and_slot() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    renderer
        .backend()
        .fail_buffers_larger_than(4 * InstanceRecord::SIZE as u64);

    let instances = (0..5).map(|i| instance(1, Vec3::splat(i as f32))).collect();
    let err = renderer
        .render_frame(&mut ctx, &snapshot(instances, 1), &Camera::default(), &Light::default())
        .unwrap_err();

    assert!(matches!(
        err,
        RenderError::Allocation {
            slot: 0,
            size: 960,
            usage: "instance",
            ..
        }
    ));
    assert!(err.to_string().contains("960-byte instance buffer for frame slot 0"));
}

#[test]
fn test_writes_outside_recording_are_rejected() {
    let mut renderer = renderer(2);

    let err = renderer
        .write_global_uniforms(0, &Camera::default(), &Light::default(), OutputExtent::new(1, 1))
        .unwrap_err();

    assert!(matches!(
        err,
        RenderError::SlotNotWritable {
            slot: 0,
            state: SlotState::Idle
        }
    ));
}

#[test]
fn test_shutdown_waits_for_idle_then_releases() {
    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let scene = snapshot(vec![instance(1, Vec3::ZERO), instance(2, Vec3::ZERO)], 1);

    for _ in 0..2 {
        renderer
            .render_frame(&mut ctx, &scene, &Camera::default(), &Light::default())
            .unwrap();
    }
    assert_eq!(renderer.backend().live_sets(), 4);

    renderer.shutdown(&mut ctx).unwrap();

    assert_eq!(ctx.events.last(), Some(&Event::WaitIdle));
    assert_eq!(renderer.backend().live_sets(), 0);
    assert_eq!(renderer.backend().sets_freed.get(), 4);
    assert!(renderer.meshes().is_empty());
    // Only the two uniform buffers remain.
    assert_eq!(renderer.backend().live_buffers(), 2);
    assert_eq!(renderer.slot_state(0), SlotState::Idle);
}

#[test]
fn test_scene_arena_feeds_renderer() {
    let mut scene = Scene::new();
    let root = scene.spawn_empty(Transform::from_translation(Vec3::new(0.0, 0.0, -5.0)));
    let a = scene.spawn_mesh(
        Transform::from_translation(Vec3::X),
        MeshComponent::new(MeshId(1)).with_textures(BASE_COLOR, NORMAL_MAP),
    );
    scene.spawn_mesh(
        Transform::IDENTITY,
        MeshComponent::new(MeshId(2)).with_textures(BASE_COLOR, NORMAL_MAP),
    );
    scene.spawn_mesh(
        Transform::IDENTITY,
        MeshComponent::new(MeshId(1)).with_textures(BASE_COLOR, NORMAL_MAP),
    );
    scene.set_parent(a, Some(root)).unwrap();

    let mut renderer = renderer(2);
    let mut ctx = MockContext::new(2);
    let camera = Camera::default();

    let stats = renderer
        .render_frame(&mut ctx, &scene.snapshot(), &camera, &Light::default())
        .unwrap();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(draws(ctx.last_submission()), vec![2, 1]);

    let records = renderer
        .resources()
        .instance_records(0, MeshId(1), 2)
        .unwrap();
    assert_eq!(
        records[0].model,
        Mat4::from_translation(Vec3::new(1.0, 0.0, -5.0))
    );

    // Despawning bumps the topology version and regroups.
    scene.despawn(a);
    let stats = renderer
        .render_frame(&mut ctx, &scene.snapshot(), &camera, &Light::default())
        .unwrap();
    assert_eq!(stats.instances, 2);
    assert_eq!(draws(ctx.last_submission()), vec![1, 1]);
}
