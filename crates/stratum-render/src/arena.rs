//! Pool of fixed-capacity vertex buffers that auto-batched geometry is packed into.

use std::ops::Range;
use std::sync::Arc;

use stratum_core::profiling::profile_function;
use stratum_test_utils::RenderContext;

use crate::error::{BatchError, CapacityKind};
use crate::vertex::VertexFormat;
use crate::vertex_buffer::{VertexBuffer, VertexSpan, validate_indices};

/// One `reserve` call's slice of index space, in arena buffer `buffer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedSpan {
    pub buffer: usize,
    pub indices: Range<u32>,
}

/// Growable list of equally sized [`VertexBuffer`]s, recycled every frame.
///
/// Reservations fill the active buffer and move forward when it runs out,
/// allocating a new buffer only when no later one exists. Buffers are never
/// freed before the arena is dropped.
pub struct VertexArena {
    context: Arc<dyn RenderContext>,
    format: VertexFormat,
    vertex_capacity: usize,
    index_capacity: usize,
    buffers: Vec<VertexBuffer>,
    current: usize,
    next_clean: usize,
    reservations: Vec<ReservedSpan>,
}

impl VertexArena {
    pub fn new(
        context: Arc<dyn RenderContext>,
        format: VertexFormat,
        vertex_capacity: usize,
        index_capacity: usize,
    ) -> Self {
        Self {
            context,
            format,
            vertex_capacity,
            index_capacity,
            buffers: Vec::new(),
            current: 0,
            next_clean: 0,
            reservations: Vec::new(),
        }
    }

    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    /// Claim `vertex_count` vertices and append `indices` (0-based relative to
    /// those vertices) to the active buffer, moving to a later buffer if it is full.
    ///
    /// The returned span is the only way to write the claimed vertices and is
    /// gone by the next call.
    pub fn reserve(
        &mut self,
        indices: &[u32],
        vertex_count: usize,
    ) -> Result<VertexSpan<'_>, BatchError> {
        profile_function!();
        if vertex_count > self.vertex_capacity {
            return Err(BatchError::CapacityExceeded {
                kind: CapacityKind::Vertices,
                requested: vertex_count,
                capacity: self.vertex_capacity,
            });
        }
        if indices.len() > self.index_capacity {
            return Err(BatchError::CapacityExceeded {
                kind: CapacityKind::Indices,
                requested: indices.len(),
                capacity: self.index_capacity,
            });
        }
        validate_indices(indices, vertex_count)?;

        let slot = match (self.current..self.buffers.len())
            .find(|&i| self.buffers[i].has_room(vertex_count, indices.len()))
        {
            Some(slot) => slot,
            None => self.allocate(),
        };
        self.current = slot;
        self.next_clean = slot + 1;

        let buffer = &mut self.buffers[slot];
        let index_start = buffer.index_count() as u32;
        let vertices = buffer.append(indices, vertex_count)?;
        self.reservations.push(ReservedSpan {
            buffer: slot,
            indices: index_start..index_start + indices.len() as u32,
        });
        Ok(self.buffers[slot].span(vertices))
    }

    fn allocate(&mut self) -> usize {
        let slot = self.buffers.len();
        tracing::debug!(
            slot,
            vertices = self.vertex_capacity,
            indices = self.index_capacity,
            "allocating arena buffer"
        );
        self.buffers.push(VertexBuffer::new(
            self.context.as_ref(),
            &self.format,
            self.vertex_capacity,
            self.index_capacity,
            &format!("arena {slot}"),
        ));
        slot
    }

    /// Make the next reservation start in a buffer nothing has been written
    /// to since the last reservation.
    pub fn goto_next_clean(&mut self) {
        self.current = self.next_clean;
    }

    /// Rewind every buffer for a new frame.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.current = 0;
        self.next_clean = 0;
        self.reservations.clear();
    }

    /// Upload every buffer written this frame.
    pub fn flush(&mut self) {
        profile_function!();
        for buffer in &mut self.buffers {
            buffer.upload(self.context.as_ref());
        }
    }

    /// Every reservation since the last [`Self::clear`], in call order.
    pub fn reservations(&self) -> &[ReservedSpan] {
        &self.reservations
    }

    pub fn buffer(&self, index: usize) -> Option<&VertexBuffer> {
        self.buffers.get(index)
    }

    /// Buffers allocated so far, used or not.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Buffers holding at least one vertex this frame.
    pub fn buffers_in_use(&self) -> usize {
        self.buffers.iter().filter(|b| b.vertex_count() > 0).count()
    }
}
