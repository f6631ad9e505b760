use std::sync::Arc;

use glam::Mat4;

use crate::arena::VertexArena;
use crate::bounds::Aabb;
use crate::color::Color;
use crate::error::BatchError;
use crate::material::Material;
use crate::vertex_buffer::{BufferId, VertexBuffer};

/// Anything that can be drawn through the sorter.
///
/// The sorter asks for a prebuilt buffer first and falls back to
/// [`GeometryProducer::fill`] when there is none.
pub trait GeometryProducer: Send + Sync {
    /// A GPU-resident buffer to draw as-is with the command transform as its
    /// model matrix. Producers that return one opt out of auto-batching.
    fn prebuilt_buffer(&self) -> Option<Arc<VertexBuffer>> {
        None
    }

    /// Reserve space in `arena` and write this producer's vertices, already
    /// multiplied by `transform` and `mask`. Returns the buffer written last.
    fn fill(&self, arena: &mut VertexArena, transform: &Mat4, mask: Color) -> Result<BufferId, BatchError>;

    /// Local-space extent, before any command transform. Producers that don't
    /// know their extent report [`Aabb::EMPTY`] and add nothing to a
    /// [`crate::DrawBatch`]'s bounds.
    fn bounds(&self) -> Aabb {
        Aabb::EMPTY
    }
}

/// Something draw commands can be submitted to.
///
/// Implemented by [`crate::Sorter`] and [`crate::DrawBatch`], so recorded
/// batches can be replayed into either.
pub trait DrawSink {
    fn add_command(
        &mut self,
        producer: Arc<dyn GeometryProducer>,
        transform: Mat4,
        mask: Color,
        material: &Material,
        translucent: bool,
    );
}
