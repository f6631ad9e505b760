//! Recording draw target and small producers for exercising the batcher
//! without a GPU.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Mat4, Vec3};

use crate::arena::VertexArena;
use crate::blend::BlendMode;
use crate::color::Color;
use crate::emitter::DrawTarget;
use crate::error::BatchError;
use crate::material::Material;
use crate::producer::GeometryProducer;
use crate::shader::Shader;
use crate::vertex::VertexFormat;
use crate::vertex_buffer::{BufferId, VertexBuffer};

/// A call observed by [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Bind { shader: String, blend: BlendMode },
    SetUniform { name: String, value: Mat4 },
    Draw { buffer: BufferId, indices: Range<u32> },
}

/// [`DrawTarget`] that records instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub calls: Vec<RecordedCall>,
    pub reserved: usize,
}

impl RecordingTarget {
    pub fn count_binds(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Bind { .. }))
            .count()
    }

    pub fn count_draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Draw { .. }))
            .count()
    }

    /// Model matrices in upload order.
    pub fn models(&self) -> Vec<Mat4> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::SetUniform { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Buffers drawn, in order.
    pub fn drawn_buffers(&self) -> Vec<BufferId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Draw { buffer, .. } => Some(*buffer),
                _ => None,
            })
            .collect()
    }
}

impl DrawTarget for RecordingTarget {
    fn reserve_draws(&mut self, count: usize) {
        self.reserved += count;
    }

    fn bind_state(&mut self, material: &Material) -> Result<(), BatchError> {
        self.calls.push(RecordedCall::Bind {
            shader: material.shader().label().to_string(),
            blend: material.blend(),
        });
        Ok(())
    }

    fn set_uniform(&mut self, shader: &Shader, name: &str, value: &Mat4) -> bool {
        if !shader.has_uniform(name) {
            return false;
        }
        self.calls.push(RecordedCall::SetUniform {
            name: name.to_string(),
            value: *value,
        });
        true
    }

    fn draw(&mut self, buffer: &VertexBuffer, indices: Range<u32>) {
        self.calls.push(RecordedCall::Draw {
            buffer: buffer.id(),
            indices,
        });
    }
}

/// Material over a pipeline-less shader labelled `test` with a `model` slot.
pub fn test_material() -> Material {
    Material::new(Arc::new(Shader::new("test", VertexFormat::sprite(), ["model"])))
}

/// Producer that must never be asked for geometry.
pub struct NullProducer;

impl GeometryProducer for NullProducer {
    fn fill(&self, _: &mut VertexArena, _: &Mat4, _: Color) -> Result<BufferId, BatchError> {
        Err(BatchError::NotFillable)
    }
}

/// Writes `triangles` unconnected triangles and counts how often it is asked.
///
/// Each triangle's vertices sit at the origin plus the command translation,
/// so draw order can be read back from the arena.
#[derive(Default)]
pub struct CountingProducer {
    pub triangles: usize,
    pub prebuilt: Option<Arc<VertexBuffer>>,
    fills: AtomicUsize,
    prebuilt_queries: AtomicUsize,
}

impl CountingProducer {
    pub fn triangles(triangles: usize) -> Self {
        Self {
            triangles,
            ..Default::default()
        }
    }

    pub fn prebuilt(buffer: Arc<VertexBuffer>) -> Self {
        Self {
            prebuilt: Some(buffer),
            ..Default::default()
        }
    }

    pub fn fills(&self) -> usize {
        self.fills.load(Ordering::Relaxed)
    }

    pub fn prebuilt_queries(&self) -> usize {
        self.prebuilt_queries.load(Ordering::Relaxed)
    }
}

impl GeometryProducer for CountingProducer {
    fn prebuilt_buffer(&self) -> Option<Arc<VertexBuffer>> {
        self.prebuilt_queries.fetch_add(1, Ordering::Relaxed);
        self.prebuilt.clone()
    }

    fn fill(&self, arena: &mut VertexArena, transform: &Mat4, mask: Color) -> Result<BufferId, BatchError> {
        self.fills.fetch_add(1, Ordering::Relaxed);
        let vertices = self.triangles * 3;
        let indices: Vec<u32> = (0..vertices as u32).collect();
        let mut span = arena.reserve(&indices, vertices)?;
        span.write_positions(transform, &vec![Vec3::ZERO; vertices])?;
        span.write_colors(&vec![Color::WHITE; vertices], mask)?;
        span.fill_attribute(crate::vertex::AttributeSemantic::TexCoordXY, &[0.0, 0.0]);
        Ok(span.buffer())
    }
}
