//! Sprites, meshes and recorded batches submitted through a sorter.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use stratum_render::testing::{RecordingTarget, test_material};
use stratum_render::{
    AttributeSemantic, BatchError, CapacityKind, Color, DrawBatch, DrawSink, Mesh, Rect, Sorter,
    SorterConfig, Sprite, SpriteUV, VertexFormat,
};
use stratum_test_utils::MockRenderContext;

fn setup(config: SorterConfig) -> (Arc<MockRenderContext>, Sorter) {
    let mock = Arc::new(MockRenderContext::new());
    let sorter = Sorter::new(mock.clone(), VertexFormat::sprite(), config);
    (mock, sorter)
}

#[test]
fn thousand_sprites_make_one_draw_call() {
    let (_mock, mut sorter) = setup(SorterConfig::default());
    let material = test_material();
    let sprite = Arc::new(Sprite::new(Vec2::splat(16.0)).with_uv(SpriteUV::new(0.0, 0.0, 0.5, 0.5)));

    for i in 0..1000 {
        let transform = Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0));
        sorter.add(sprite.clone(), transform, Color::WHITE, &material, false);
    }
    let mut target = RecordingTarget::default();
    let stats = sorter.draw(&mut target).unwrap();

    assert_eq!(stats.commands, 1000);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(target.count_binds(), 1);
    assert_eq!(sorter.draw_calls()[0].indices, 0..6000);
}

#[test]
fn sprite_tint_and_mask_multiply() {
    let (_mock, mut sorter) = setup(SorterConfig::default());
    let sprite = Arc::new(Sprite::new(Vec2::ONE).with_tint(Color::rgba(1.0, 0.5, 0.0, 1.0)));
    sorter.add(sprite, Mat4::IDENTITY, Color::rgba(0.5, 1.0, 1.0, 1.0), &test_material(), false);
    sorter.draw(&mut RecordingTarget::default()).unwrap();

    let colors = sorter
        .arena()
        .buffer(0)
        .unwrap()
        .channel(AttributeSemantic::ColorRGBA)
        .unwrap();
    assert_eq!(&colors[..4], &[0.5, 0.5, 0.0, 1.0]);
}

#[test]
fn meshes_batch_with_sprites() {
    let (_mock, mut sorter) = setup(SorterConfig::default());
    let material = test_material();
    sorter.add(Arc::new(Mesh::quad(2.0, 2.0)), Mat4::IDENTITY, Color::WHITE, &material, false);
    sorter.add(Arc::new(Sprite::new(Vec2::ONE)), Mat4::IDENTITY, Color::WHITE, &material, false);

    let stats = sorter.draw(&mut RecordingTarget::default()).unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(sorter.arena().buffer(0).unwrap().vertex_count(), 8);
}

#[test]
fn oversized_mesh_needs_prebuilding() {
    let (mock, mut sorter) = setup(SorterConfig::default().with_buffer_capacity(8, 12));
    let material = test_material();
    let grid = Mesh::builder()
        .positions(vec![Vec3::ZERO; 12])
        .indices((0..12).collect())
        .build();

    sorter.add(Arc::new(grid.clone()), Mat4::IDENTITY, Color::WHITE, &material, false);
    assert_eq!(
        sorter.draw(&mut RecordingTarget::default()).unwrap_err(),
        BatchError::CapacityExceeded {
            kind: CapacityKind::Vertices,
            requested: 12,
            capacity: 8
        }
    );

    let prebuilt = Arc::new(grid.upload(mock.as_ref(), sorter.arena().format()).unwrap());
    sorter.add(prebuilt, Mat4::IDENTITY, Color::WHITE, &material, false);
    let stats = sorter.draw(&mut RecordingTarget::default()).unwrap();
    assert_eq!(stats.prebuilt, 1);
    assert_eq!(stats.arena_buffers, 0);
}

#[test]
fn prebuilt_draws_take_the_command_transform() {
    let (mock, mut sorter) = setup(SorterConfig::default());
    sorter.set_layer(2);
    let prebuilt = Arc::new(Mesh::quad(1.0, 1.0).upload(mock.as_ref(), &VertexFormat::sprite()).unwrap());
    let transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 10.0));
    sorter.add(prebuilt, transform, Color::WHITE, &test_material(), false);

    let mut target = RecordingTarget::default();
    sorter.draw(&mut target).unwrap();
    let models = target.models();
    assert_eq!(models.len(), 1);
    // layer 2 pulls the draw two units towards the viewer
    assert_eq!(models[0].w_axis.truncate(), Vec3::new(1.0, 2.0, 8.0));
}

#[test]
fn prebuilt_draws_ignore_the_colour_mask() {
    let (mock, mut sorter) = setup(SorterConfig::default());
    let prebuilt = Arc::new(Mesh::quad(1.0, 1.0).upload(mock.as_ref(), &VertexFormat::sprite()).unwrap());
    let vertices = prebuilt.buffer().vertex_gpu_buffer().clone();
    let baked = mock.buffer_contents(&vertices);

    sorter.add(prebuilt, Mat4::IDENTITY, Color::RED.with_alpha(0.5), &test_material(), true);
    let stats = sorter.draw(&mut RecordingTarget::default()).unwrap();

    assert_eq!(stats.prebuilt, 1);
    assert_eq!(stats.arena_buffers, 0);
    assert_eq!(mock.count_writes_to(&vertices), 1);
    assert_eq!(mock.buffer_contents(&vertices), baked);
}

#[test]
fn rect_draw_fits_a_batch_into_screen_space() {
    let (_mock, mut sorter) = setup(SorterConfig::default());
    let material = test_material();
    let sprite = Arc::new(Sprite::new(Vec2::ONE).with_origin(Vec2::ZERO));

    let mut batch = DrawBatch::new();
    for i in 0..4 {
        batch.add(sprite.clone(), Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)), Color::WHITE, &material, false);
    }
    // 4x1 row stretched over a 100x50 rect at (10, 20)
    batch.draw_rect_into(&mut sorter, Rect::new(10.0, 20.0, 100.0, 50.0), Color::WHITE);
    sorter.draw(&mut RecordingTarget::default()).unwrap();

    let buffer = sorter.arena().buffer(0).unwrap();
    let pos = buffer.channel(AttributeSemantic::PositionXYZ).unwrap();
    let (min, max) = pos.chunks_exact(3).fold(
        (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
        |(min, max), p| (min.min(Vec2::new(p[0], p[1])), max.max(Vec2::new(p[0], p[1]))),
    );
    assert!(min.abs_diff_eq(Vec2::new(10.0, 20.0), 1e-4));
    assert!(max.abs_diff_eq(Vec2::new(110.0, 70.0), 1e-4));
}

#[test]
fn draw_batch_replays_into_a_sorter() {
    let (_mock, mut sorter) = setup(SorterConfig::default());
    let material = test_material();
    let sprite = Arc::new(Sprite::new(Vec2::ONE));

    let mut batch = DrawBatch::new();
    batch.add(sprite.clone(), Mat4::from_translation(Vec3::X), Color::WHITE, &material, false);
    batch.add(sprite.clone(), Mat4::from_translation(Vec3::Y), Color::WHITE.with_alpha(0.5), &material, false);
    batch.add(sprite, Mat4::IDENTITY, Color::TRANSPARENT, &material, false);
    assert_eq!(batch.len(), 3);

    let parent = Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0));
    batch.draw_into(&mut sorter, &parent, Color::WHITE);
    batch.draw_into(&mut sorter, &parent, Color::WHITE.with_alpha(0.5));

    // the transparent recording is dropped on both replays
    assert_eq!(sorter.len(), 4);
    let bucket = sorter.bucket(0);
    assert_eq!(bucket.opaque().len(), 1);
    assert_eq!(bucket.translucent().len(), 3);
    assert_eq!(bucket.opaque()[0].transform.w_axis.x, 101.0);
}

#[test]
fn batches_nest() {
    let material = test_material();
    let mut inner = DrawBatch::new();
    inner.add(Arc::new(Sprite::new(Vec2::ONE)), Mat4::from_translation(Vec3::X), Color::WHITE, &material, false);

    let mut outer = DrawBatch::new();
    inner.draw_into(&mut outer, &Mat4::from_translation(Vec3::Y), Color::WHITE);
    let sink: &mut dyn DrawSink = &mut outer;
    inner.draw_into(sink, &Mat4::IDENTITY, Color::WHITE);
    assert_eq!(outer.len(), 2);

    let (_mock, mut sorter) = setup(SorterConfig::default());
    outer.draw_into(&mut sorter, &Mat4::IDENTITY, Color::WHITE);
    let stats = sorter.draw(&mut RecordingTarget::default()).unwrap();
    assert_eq!(stats.commands, 2);
    assert_eq!(stats.draw_calls, 1);
}
