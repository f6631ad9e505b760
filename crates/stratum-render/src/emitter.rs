//! Turns the ordered draw-call list into GPU state changes and draws.

use std::ops::Range;
use std::sync::Arc;

use glam::Mat4;
use stratum_core::profiling::profile_function;

use crate::arena::VertexArena;
use crate::error::BatchError;
use crate::material::Material;
use crate::shader::Shader;
use crate::vertex_buffer::{BufferId, VertexBuffer};

/// Where a draw call's vertices live.
#[derive(Debug, Clone)]
pub enum DrawSource {
    /// Index into the sorter's arena.
    Arena(usize),
    Prebuilt(Arc<VertexBuffer>),
}

/// One GPU draw: a range of a buffer's indices under one material and model matrix.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub buffer: BufferId,
    pub source: DrawSource,
    /// Identity for arena geometry, which is transformed at fill time.
    pub model: Mat4,
    pub material: Material,
    pub indices: Range<u32>,
}

impl DrawCall {
    pub fn is_prebuilt(&self) -> bool {
        matches!(self.source, DrawSource::Prebuilt(_))
    }
}

/// Backend the emitter drives. `PassTarget` wraps a wgpu render pass;
/// `RecordingTarget` records calls for tests.
pub trait DrawTarget {
    /// Called once per frame with the number of draw calls about to follow.
    fn reserve_draws(&mut self, _count: usize) {}

    /// Make `material` current. Only called when it differs from the last one.
    fn bind_state(&mut self, material: &Material) -> Result<(), BatchError>;

    /// Upload `value` to the uniform called `name`. Returns false if the
    /// shader has no such slot.
    fn set_uniform(&mut self, shader: &Shader, name: &str, value: &Mat4) -> bool;

    fn draw(&mut self, buffer: &VertexBuffer, indices: Range<u32>);
}

/// Counters for one emitted frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitStats {
    /// Commands collected since the previous frame
    pub commands: usize,
    pub draw_calls: usize,
    pub state_binds: usize,
    /// Draw calls sourced from the arena
    pub auto_batched: usize,
    /// Draw calls sourced from prebuilt buffers
    pub prebuilt: usize,
    pub arena_buffers: usize,
}

/// Issue `calls` in order, rebinding state only when the material changes.
///
/// Calls with an empty index range are skipped outright.
pub fn emit<T: DrawTarget + ?Sized>(
    calls: &[DrawCall],
    arena: &VertexArena,
    target: &mut T,
    model_uniform: &str,
) -> Result<EmitStats, BatchError> {
    profile_function!();
    let mut stats = EmitStats {
        arena_buffers: arena.buffers_in_use(),
        ..Default::default()
    };
    target.reserve_draws(calls.len());

    let mut bound: Option<&Material> = None;
    for call in calls {
        if call.indices.is_empty() {
            continue;
        }
        let buffer = match &call.source {
            DrawSource::Arena(index) => match arena.buffer(*index) {
                Some(buffer) => buffer,
                None => {
                    tracing::warn!(index, "draw call references a missing arena buffer");
                    continue;
                }
            },
            DrawSource::Prebuilt(buffer) => buffer.as_ref(),
        };

        if bound != Some(&call.material) {
            tracing::trace!(
                shader = call.material.shader().label(),
                blend = %call.material.blend(),
                "binding state"
            );
            call.material.validate()?;
            target.bind_state(&call.material)?;
            bound = Some(&call.material);
            stats.state_binds += 1;
        }

        let shader = call.material.shader();
        if !target.set_uniform(shader, model_uniform, &call.model) {
            return Err(BatchError::MissingUniform {
                shader: shader.label().to_string(),
                uniform: model_uniform.to_string(),
            });
        }

        target.draw(buffer, call.indices.clone());
        stats.draw_calls += 1;
        if call.is_prebuilt() {
            stats.prebuilt += 1;
        } else {
            stats.auto_batched += 1;
        }
    }
    Ok(stats)
}
