//! The per-frame command collector.
//!
//! Commands are bucketed by layer as they arrive. [`Sorter::draw`] sorts the
//! buckets, walks them in depth-test dependent order, packs auto-batched
//! geometry into the arena, and emits the resulting draw calls.

use std::sync::Arc;

use glam::Mat4;
use stratum_core::profiling::{profile_function, profile_scope};
use stratum_test_utils::RenderContext;

use crate::arena::VertexArena;
use crate::bucket::{CommandBucket, DrawCommand, SoftwareSortMode};
use crate::color::Color;
use crate::config::SorterConfig;
use crate::emitter::{DrawCall, DrawSource, DrawTarget, EmitStats, emit};
use crate::error::BatchError;
use crate::material::Material;
use crate::producer::{DrawSink, GeometryProducer};
use crate::vertex::VertexFormat;

/// One bucket per possible layer value.
pub const LAYER_COUNT: usize = 256;

/// Per-command depth nudge applied when depth bump is on.
pub const DEPTH_BUMP_STEP: f32 = 0.00001;

/// Bucket holding commands submitted on `layer`: -128 maps to 0, 127 to 255.
pub const fn bucket_index(layer: i8) -> usize {
    (layer as i16 + 128) as usize
}

pub struct Sorter {
    config: SorterConfig,
    layer: i8,
    sort_key: u32,
    depth_bump: f32,
    buckets: Vec<CommandBucket>,
    arena: VertexArena,
    draw_calls: Vec<DrawCall>,
    submitted: usize,
}

static_assertions::assert_impl_all!(Sorter: Send, Sync);

impl Sorter {
    /// A sorter packing auto-batched geometry in `format` into buffers created
    /// through `context`.
    pub fn new(context: Arc<dyn RenderContext>, format: VertexFormat, config: SorterConfig) -> Self {
        let arena = VertexArena::new(context, format, config.vertex_capacity, config.index_capacity);
        Self {
            config,
            layer: 0,
            sort_key: 0,
            depth_bump: 0.0,
            buckets: (0..LAYER_COUNT).map(|_| CommandBucket::default()).collect(),
            arena,
            draw_calls: Vec::new(),
            submitted: 0,
        }
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Layer applied to every command added from now on.
    pub fn set_layer(&mut self, layer: i8) {
        self.layer = layer;
    }

    pub fn layer(&self) -> i8 {
        self.layer
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        self.config.depth_test = enabled;
    }

    pub fn depth_test(&self) -> bool {
        self.config.depth_test
    }

    pub fn set_software_sort_mode(&mut self, mode: SoftwareSortMode) {
        self.config.sort_mode = mode;
    }

    pub fn software_sort_mode(&self) -> SoftwareSortMode {
        self.config.sort_mode
    }

    pub fn set_depth_bump(&mut self, enabled: bool) {
        self.config.depth_bump = enabled;
    }

    /// Key stamped on subsequent commands, used by [`SoftwareSortMode::Command`].
    pub fn set_sort_key(&mut self, key: u32) {
        self.sort_key = key;
    }

    pub fn sort_key(&self) -> u32 {
        self.sort_key
    }

    /// Queue a draw of `producer`.
    ///
    /// Returns the stored command, or `None` when `mask` is fully transparent
    /// and the command was dropped.
    pub fn add(
        &mut self,
        producer: Arc<dyn GeometryProducer>,
        mut transform: Mat4,
        mask: Color,
        material: &Material,
        translucent: bool,
    ) -> Option<&mut DrawCommand> {
        if mask.is_invisible() {
            tracing::trace!(layer = self.layer, "dropping fully transparent command");
            return None;
        }
        if mask.a.is_nan() {
            tracing::warn!(layer = self.layer, "colour mask alpha is NaN, drawing as translucent");
        }

        let translucent = translucent || mask.is_partial() || !self.config.depth_test;
        if self.config.depth_test {
            if self.config.depth_bump {
                self.depth_bump -= DEPTH_BUMP_STEP;
            }
            transform.w_axis.z -= self.layer as f32 + self.depth_bump;
        }

        self.submitted += 1;
        let command = DrawCommand {
            producer,
            transform,
            mask,
            material: material.clone(),
            translucent,
            sort_key: self.sort_key,
        };
        Some(self.buckets[bucket_index(self.layer)].add(translucent, command))
    }

    /// Drop every queued command and reset the depth bump.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.depth_bump = 0.0;
        self.submitted = 0;
    }

    /// Commands queued since the last clear.
    pub fn len(&self) -> usize {
        self.submitted
    }

    pub fn is_empty(&self) -> bool {
        self.submitted == 0
    }

    pub fn bucket(&self, layer: i8) -> &CommandBucket {
        &self.buckets[bucket_index(layer)]
    }

    pub fn buckets(&self) -> &[CommandBucket] {
        &self.buckets
    }

    pub fn arena(&self) -> &VertexArena {
        &self.arena
    }

    /// Draw calls produced by the most recent [`Self::draw`].
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Sort, batch and emit everything queued, then clear for the next frame.
    ///
    /// The queue is cleared even when an error stops emission part way, and
    /// so is [`Self::draw_calls`].
    pub fn draw<T: DrawTarget + ?Sized>(&mut self, target: &mut T) -> Result<EmitStats, BatchError> {
        profile_function!();
        let commands = self.submitted;
        let result = self.build_and_emit(target);
        self.clear();
        if result.is_err() {
            self.draw_calls.clear();
        }

        let mut stats = result?;
        stats.commands = commands;
        tracing::debug!(
            commands = stats.commands,
            draw_calls = stats.draw_calls,
            state_binds = stats.state_binds,
            arena_buffers = stats.arena_buffers,
            "frame emitted"
        );
        Ok(stats)
    }

    fn build_and_emit<T: DrawTarget + ?Sized>(&mut self, target: &mut T) -> Result<EmitStats, BatchError> {
        self.arena.clear();
        self.draw_calls.clear();
        self.sort();

        {
            profile_scope!("build_draw_calls");
            let Self {
                buckets,
                arena,
                draw_calls,
                config,
                ..
            } = self;
            if config.depth_test {
                for command in buckets.iter().flat_map(|b| b.opaque()) {
                    apply_draw_command(command, arena, draw_calls)?;
                }
                for command in buckets.iter().rev().flat_map(|b| b.translucent()) {
                    apply_draw_command(command, arena, draw_calls)?;
                }
            } else {
                for bucket in buckets.iter().rev() {
                    for command in bucket.opaque().iter().chain(bucket.translucent()) {
                        apply_draw_command(command, arena, draw_calls)?;
                    }
                }
            }
        }

        self.arena.flush();
        emit(&self.draw_calls, &self.arena, target, &self.config.model_uniform)
    }

    fn sort(&mut self) {
        profile_function!();
        let mode = self.config.sort_mode;
        if mode == SoftwareSortMode::None {
            return;
        }
        for bucket in &mut self.buckets {
            bucket.sort_translucent(mode);
            if !self.config.depth_test {
                bucket.sort_opaque(mode);
            }
        }
    }
}

/// Turn one command into draw calls.
///
/// Prebuilt buffers get their own call and push the arena onto a fresh
/// buffer. Filled geometry extends the previous call when it lands right
/// after it in the same buffer under the same material.
fn apply_draw_command(
    command: &DrawCommand,
    arena: &mut VertexArena,
    draw_calls: &mut Vec<DrawCall>,
) -> Result<(), BatchError> {
    if let Some(buffer) = command.producer.prebuilt_buffer() {
        arena.goto_next_clean();
        tracing::trace!(indices = buffer.index_count(), "prebuilt draw");
        draw_calls.push(DrawCall {
            buffer: buffer.id(),
            indices: 0..buffer.index_count() as u32,
            source: DrawSource::Prebuilt(buffer),
            model: command.transform,
            material: command.material.clone(),
        });
        return Ok(());
    }

    let mark = arena.reservations().len();
    let written = command
        .producer
        .fill(arena, &command.transform, command.mask)?;
    let spans = &arena.reservations()[mark..];
    debug_assert!(
        spans
            .last()
            .and_then(|span| arena.buffer(span.buffer))
            .is_none_or(|buffer| buffer.id() == written),
        "producer reported {written:?} but its last reservation is in another buffer"
    );

    for span in spans {
        if span.indices.is_empty() {
            continue;
        }
        let Some(buffer) = arena.buffer(span.buffer) else {
            continue;
        };
        let buffer = buffer.id();
        match draw_calls.last_mut() {
            Some(last)
                if last.buffer == buffer
                    && last.indices.end == span.indices.start
                    && last.material == command.material =>
            {
                last.indices.end = span.indices.end;
            }
            _ => draw_calls.push(DrawCall {
                buffer,
                source: DrawSource::Arena(span.buffer),
                model: Mat4::IDENTITY,
                material: command.material.clone(),
                indices: span.indices.clone(),
            }),
        }
    }
    Ok(())
}

impl DrawSink for Sorter {
    fn add_command(
        &mut self,
        producer: Arc<dyn GeometryProducer>,
        transform: Mat4,
        mask: Color,
        material: &Material,
        translucent: bool,
    ) {
        self.add(producer, transform, mask, material, translucent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingProducer, RecordingTarget, test_material};
    use crate::vertex_buffer::{BufferId, VertexBuffer};
    use glam::Vec3;
    use stratum_test_utils::MockRenderContext;

    fn sorter(config: SorterConfig) -> Sorter {
        Sorter::new(Arc::new(MockRenderContext::new()), VertexFormat::sprite(), config)
    }

    fn tri() -> Arc<CountingProducer> {
        Arc::new(CountingProducer::triangles(1))
    }

    fn total(sorter: &Sorter) -> usize {
        sorter.buckets().iter().map(CommandBucket::len).sum()
    }

    #[test]
    fn bucket_index_is_biased_layer() {
        assert_eq!(bucket_index(-128), 0);
        assert_eq!(bucket_index(-3), 125);
        assert_eq!(bucket_index(0), 128);
        assert_eq!(bucket_index(5), 133);
        assert_eq!(bucket_index(127), 255);
    }

    #[test]
    fn transparent_masks_are_dropped() {
        let mut sorter = sorter(SorterConfig::default());
        let producer = tri();
        let material = test_material();
        assert!(sorter
            .add(producer.clone(), Mat4::IDENTITY, Color::TRANSPARENT, &material, false)
            .is_none());
        assert!(sorter.is_empty());

        let mut target = RecordingTarget::default();
        let stats = sorter.draw(&mut target).unwrap();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(producer.fills(), 0);
        assert_eq!(producer.prebuilt_queries(), 0);
    }

    #[test]
    fn partial_alpha_forces_translucent() {
        let mut sorter = sorter(SorterConfig::default());
        let material = test_material();
        let cmd = sorter
            .add(tri(), Mat4::IDENTITY, Color::WHITE.with_alpha(0.5), &material, false)
            .unwrap();
        assert!(cmd.translucent);
        assert_eq!(sorter.bucket(0).translucent().len(), 1);

        let cmd = sorter
            .add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false)
            .unwrap();
        assert!(!cmd.translucent);
        let cmd = sorter
            .add(tri(), Mat4::IDENTITY, Color::WHITE, &material, true)
            .unwrap();
        assert!(cmd.translucent);
    }

    #[test]
    fn no_depth_test_forces_everything_translucent() {
        let mut sorter = sorter(SorterConfig::default().with_depth_test(false));
        let material = test_material();
        for layer in [-128, 0, 127] {
            sorter.set_layer(layer);
            let cmd = sorter
                .add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false)
                .unwrap();
            assert!(cmd.translucent);
            // no depth bias without a depth buffer
            assert_eq!(cmd.transform, Mat4::IDENTITY);
        }
        assert!(sorter.buckets().iter().all(|b| b.opaque().is_empty()));
    }

    #[test]
    fn depth_test_biases_z_by_layer() {
        let mut sorter = sorter(SorterConfig::default());
        let material = test_material();
        sorter.set_layer(5);
        let cmd = sorter
            .add(tri(), Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)), Color::WHITE, &material, false)
            .unwrap();
        assert_eq!(cmd.transform.w_axis.truncate(), Vec3::new(1.0, 2.0, -2.0));
    }

    #[test]
    fn depth_bump_accumulates_until_clear() {
        let mut sorter = sorter(SorterConfig::default().with_depth_bump(true));
        let material = test_material();
        let z: Vec<f32> = (0..3)
            .map(|_| {
                sorter
                    .add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false)
                    .unwrap()
                    .transform
                    .w_axis
                    .z
            })
            .collect();
        assert!((z[0] - DEPTH_BUMP_STEP).abs() < 1e-9);
        assert!((z[2] - 3.0 * DEPTH_BUMP_STEP).abs() < 1e-9);

        sorter.clear();
        let z = sorter
            .add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false)
            .unwrap()
            .transform
            .w_axis
            .z;
        assert!((z - DEPTH_BUMP_STEP).abs() < 1e-9);
    }

    #[test]
    fn every_command_lands_in_exactly_one_list() {
        let mut sorter = sorter(SorterConfig::default());
        let material = test_material();
        let mut expected = 0;
        for i in 0..200u32 {
            sorter.set_layer((i as i32 * 37 % 256 - 128) as i8);
            let alpha = [0.0, 0.5, 1.0][i as usize % 3];
            if sorter
                .add(tri(), Mat4::IDENTITY, Color::WHITE.with_alpha(alpha), &material, i % 7 == 0)
                .is_some()
            {
                expected += 1;
            }
        }
        assert_eq!(sorter.len(), expected);
        assert_eq!(total(&sorter), expected);

        sorter.clear();
        assert_eq!(total(&sorter), 0);
    }

    #[test]
    fn layer_state_is_sticky() {
        let mut sorter = sorter(SorterConfig::default());
        assert_eq!(sorter.layer(), 0);
        sorter.set_layer(-7);
        let material = test_material();
        sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
        sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
        assert_eq!(sorter.layer(), -7);
        assert_eq!(sorter.bucket(-7).len(), 2);
    }

    #[test]
    fn consecutive_fills_coalesce() {
        let mut sorter = sorter(SorterConfig::default());
        let material = test_material();
        for _ in 0..10 {
            sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
        }
        let mut target = RecordingTarget::default();
        let stats = sorter.draw(&mut target).unwrap();
        assert_eq!(stats.commands, 10);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(sorter.draw_calls()[0].indices, 0..30);
    }

    #[test]
    fn material_change_splits_a_buffer() {
        let mut sorter = sorter(SorterConfig::default());
        let a = test_material();
        let b = test_material();
        sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &a, false);
        sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &b, false);
        sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &b, false);
        let mut target = RecordingTarget::default();
        sorter.draw(&mut target).unwrap();

        let calls = sorter.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].buffer, calls[1].buffer);
        assert_eq!(calls[0].indices, 0..3);
        assert_eq!(calls[1].indices, 3..9);
        assert_eq!(target.count_binds(), 2);
    }

    #[test]
    fn overflow_starts_a_new_draw_call() {
        let mut sorter = sorter(SorterConfig::default().with_buffer_capacity(6, 6));
        let material = test_material();
        for _ in 0..3 {
            sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
        }
        let mut target = RecordingTarget::default();
        let stats = sorter.draw(&mut target).unwrap();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.arena_buffers, 2);
        // same material across the split, so still one bind
        assert_eq!(stats.state_binds, 1);
    }

    #[test]
    fn oversized_producer_fails_the_frame_and_clears() {
        let mut sorter = sorter(SorterConfig::default().with_buffer_capacity(6, 6));
        let material = test_material();
        sorter.add(Arc::new(CountingProducer::triangles(3)), Mat4::IDENTITY, Color::WHITE, &material, false);
        let mut target = RecordingTarget::default();
        assert!(matches!(
            sorter.draw(&mut target),
            Err(BatchError::CapacityExceeded { requested: 9, capacity: 6, .. })
        ));
        assert!(sorter.is_empty());
        assert!(sorter.draw_calls().is_empty());
        assert_eq!(target.count_draws(), 0);
    }

    #[test]
    fn failed_emit_leaves_no_stale_draw_calls() {
        let material = test_material();
        let mut healthy = sorter(SorterConfig::default());
        healthy.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
        healthy.draw(&mut RecordingTarget::default()).unwrap();
        assert_eq!(healthy.draw_calls().len(), 1);

        // Fills succeed, then the bind fails on the missing uniform
        let mut broken = sorter(SorterConfig::default().with_model_uniform("world"));
        broken.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
        assert!(broken.draw(&mut RecordingTarget::default()).is_err());
        assert!(broken.draw_calls().is_empty());
    }

    struct MislabelledProducer(BufferId);

    impl GeometryProducer for MislabelledProducer {
        fn fill(&self, arena: &mut VertexArena, transform: &Mat4, mask: Color) -> Result<BufferId, BatchError> {
            CountingProducer::triangles(1).fill(arena, transform, mask)?;
            Ok(self.0)
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "last reservation is in another buffer")]
    fn fill_must_report_the_buffer_it_wrote() {
        let stray = VertexBuffer::new(&MockRenderContext::new(), &VertexFormat::sprite(), 3, 3, "stray").id();
        let mut sorter = sorter(SorterConfig::default());
        sorter.add(Arc::new(MislabelledProducer(stray)), Mat4::IDENTITY, Color::WHITE, &test_material(), false);
        let _ = sorter.draw(&mut RecordingTarget::default());
    }

    #[test]
    fn sorting_only_touches_translucent_with_depth_test() {
        let mut sorter = sorter(SorterConfig::default().with_sort_mode(SoftwareSortMode::Command));
        let material = test_material();
        for key in [1, 3, 2] {
            sorter.set_sort_key(key);
            sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, false);
            sorter.add(tri(), Mat4::IDENTITY, Color::WHITE, &material, true);
        }
        sorter.sort();
        let keys = |cmds: &[DrawCommand]| cmds.iter().map(|c| c.sort_key).collect::<Vec<_>>();
        assert_eq!(keys(sorter.bucket(0).opaque()), vec![1, 3, 2]);
        assert_eq!(keys(sorter.bucket(0).translucent()), vec![3, 2, 1]);
    }

    #[test]
    fn sorter_is_a_draw_sink() {
        let mut sorter = sorter(SorterConfig::default());
        let sink: &mut dyn DrawSink = &mut sorter;
        sink.add_command(tri(), Mat4::IDENTITY, Color::WHITE, &test_material(), false);
        assert_eq!(sorter.len(), 1);
    }
}
