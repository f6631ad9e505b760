//! Fixed-capacity vertex/index storage shared by the arena and prebuilt meshes.

use std::ops::Range;

use glam::{Mat3, Mat4, Vec2, Vec3};
use stratum_test_utils::{GpuBuffer, RenderContext, ResourceId};

use crate::color::Color;
use crate::error::BatchError;
use crate::vertex::{AttributeSemantic, VertexFormat};

/// Identity of a [`VertexBuffer`], stable for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(ResourceId);

impl BufferId {
    fn next() -> Self {
        Self(ResourceId::next())
    }
}

/// One GPU vertex buffer plus its index buffer and a CPU shadow of both.
///
/// The GPU vertex buffer holds one block per attribute channel (see
/// [`VertexFormat::block_range`]). Writes go to the CPU shadow and reach the
/// GPU on [`VertexBuffer::upload`].
#[derive(Debug)]
pub struct VertexBuffer {
    id: BufferId,
    format: VertexFormat,
    vertex_capacity: usize,
    index_capacity: usize,
    channels: Vec<Vec<f32>>,
    indices: Vec<u32>,
    vertex_count: usize,
    dirty: bool,
    vertices: GpuBuffer,
    index_buffer: GpuBuffer,
}

impl VertexBuffer {
    pub fn new(
        context: &dyn RenderContext,
        format: &VertexFormat,
        vertex_capacity: usize,
        index_capacity: usize,
        label: &str,
    ) -> Self {
        let vertex_bytes = (vertex_capacity * format.floats_per_vertex() * 4).max(4) as u64;
        let index_bytes = (index_capacity * 4).max(4) as u64;

        let vertices = context.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} vertices")),
            size: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = context.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} indices")),
            size: index_bytes,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let channels = format
            .attributes()
            .iter()
            .map(|a| vec![0.0; vertex_capacity * a.semantic.components()])
            .collect();

        Self {
            id: BufferId::next(),
            format: format.clone(),
            vertex_capacity,
            index_capacity,
            channels,
            indices: Vec::with_capacity(index_capacity),
            vertex_count: 0,
            dirty: false,
            vertices,
            index_buffer,
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
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

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Indices written so far, already rebased to absolute vertex positions.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Written portion of one attribute channel.
    pub fn channel(&self, semantic: AttributeSemantic) -> Option<&[f32]> {
        let i = self.format.position_of(semantic)?;
        let len = self.vertex_count * semantic.components();
        self.channels[i].get(..len)
    }

    pub fn has_room(&self, vertex_count: usize, index_count: usize) -> bool {
        self.vertex_count + vertex_count <= self.vertex_capacity
            && self.indices.len() + index_count <= self.index_capacity
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn vertex_gpu_buffer(&self) -> &GpuBuffer {
        &self.vertices
    }

    pub fn index_gpu_buffer(&self) -> &GpuBuffer {
        &self.index_buffer
    }

    /// Byte range of channel `index` inside the GPU vertex buffer.
    pub fn block_range(&self, index: usize) -> Range<u64> {
        self.format.block_range(index, self.vertex_capacity)
    }

    /// Append `indices` (relative to the new vertices) and claim `vertex_count`
    /// vertices. Returns the claimed vertex range.
    ///
    /// The caller checks capacity first.
    pub(crate) fn append(
        &mut self,
        indices: &[u32],
        vertex_count: usize,
    ) -> Result<Range<usize>, BatchError> {
        validate_indices(indices, vertex_count)?;
        debug_assert!(self.has_room(vertex_count, indices.len()));

        let base = self.vertex_count;
        self.indices.extend(indices.iter().map(|&i| i + base as u32));
        self.vertex_count += vertex_count;
        self.dirty = true;
        Ok(base..self.vertex_count)
    }

    /// Writer over a vertex range returned by [`Self::append`].
    pub(crate) fn span(&mut self, vertices: Range<usize>) -> VertexSpan<'_> {
        VertexSpan {
            buffer: self.id,
            format: &self.format,
            channels: &mut self.channels,
            start: vertices.start,
            len: vertices.len(),
            written: 0,
        }
    }

    /// Rewind the cursors. Storage on both sides is kept.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.vertex_count = 0;
        self.dirty = false;
    }

    /// Push the written prefix of every channel and the index list to the GPU.
    ///
    /// No-op unless something was appended since the last upload.
    pub fn upload(&mut self, context: &dyn RenderContext) {
        if !self.dirty {
            return;
        }
        for (i, channel) in self.channels.iter().enumerate() {
            let written = self.vertex_count * self.format.attributes()[i].semantic.components();
            if written == 0 {
                continue;
            }
            let block = self.format.block_range(i, self.vertex_capacity);
            context.write_buffer(&self.vertices, block.start, bytemuck::cast_slice(&channel[..written]));
        }
        if !self.indices.is_empty() {
            context.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&self.indices));
        }
        self.dirty = false;
    }

    /// Drop the CPU shadow once the GPU copy is final.
    pub(crate) fn release_cpu_storage(&mut self) {
        debug_assert!(!self.dirty, "releasing storage that was never uploaded");
        self.channels = self.channels.iter().map(|_| Vec::new()).collect();
    }
}

pub(crate) fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<(), BatchError> {
    if indices.len() % 3 != 0 {
        return Err(BatchError::InvalidTopology {
            index_count: indices.len(),
        });
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(BatchError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(())
}

/// Writable view of freshly reserved vertices in one buffer.
///
/// Borrows its buffer mutably, so it cannot outlive the next reservation.
/// Every channel the format declares must be written before it is dropped;
/// channels keep whatever an earlier frame left there otherwise. Debug builds
/// log a warning naming any channel a non-empty span was dropped without.
pub struct VertexSpan<'a> {
    buffer: BufferId,
    format: &'a VertexFormat,
    channels: &'a mut [Vec<f32>],
    start: usize,
    len: usize,
    /// Bit `i` set once channel `i` has been handed out or written
    written: u32,
}

impl VertexSpan<'_> {
    /// Buffer the span lives in.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn format(&self) -> &VertexFormat {
        self.format
    }

    /// Channels of the format that nothing has written through this span yet.
    pub fn unwritten(&self) -> Vec<AttributeSemantic> {
        self.format
            .attributes()
            .iter()
            .enumerate()
            .filter(|(i, _)| self.written & (1 << i) == 0)
            .map(|(_, attribute)| attribute.semantic)
            .collect()
    }

    /// Raw floats of one channel for this span, `len * components` long.
    ///
    /// Counts as writing the channel.
    pub fn channel_mut(&mut self, semantic: AttributeSemantic) -> Option<&mut [f32]> {
        let i = self.format.position_of(semantic)?;
        self.written |= 1 << i;
        let n = semantic.components();
        Some(&mut self.channels[i][self.start * n..(self.start + self.len) * n])
    }

    fn check_len(&self, semantic: AttributeSemantic, actual: usize) -> Result<(), BatchError> {
        if actual != self.len {
            return Err(BatchError::AttributeMismatch {
                attribute: semantic,
                expected: self.len,
                actual,
            });
        }
        Ok(())
    }

    /// Transform and write positions into whichever position channel exists.
    pub fn write_positions(&mut self, transform: &Mat4, positions: &[Vec3]) -> Result<(), BatchError> {
        let Some(i) = self.format.position_channel() else {
            return Ok(());
        };
        let semantic = self.format.attributes()[i].semantic;
        self.check_len(semantic, positions.len())?;

        let identity = *transform == Mat4::IDENTITY;
        let n = semantic.components();
        self.written |= 1 << i;
        let out = &mut self.channels[i][self.start * n..(self.start + self.len) * n];
        for (dst, &p) in out.chunks_exact_mut(n).zip(positions) {
            let p = if identity { p } else { transform.transform_point3(p) };
            dst.copy_from_slice(&p.to_array()[..n]);
        }
        Ok(())
    }

    /// Write normals through the inverse-transpose of `transform`.
    pub fn write_normals(&mut self, transform: &Mat4, normals: &[Vec3]) -> Result<(), BatchError> {
        let semantic = AttributeSemantic::NormalXYZ;
        if self.format.position_of(semantic).is_none() {
            return Ok(());
        }
        self.check_len(semantic, normals.len())?;

        let linear = Mat3::from_mat4(*transform);
        let normal_matrix = if linear.determinant() == 0.0 {
            linear
        } else {
            linear.inverse().transpose()
        };
        let identity = *transform == Mat4::IDENTITY;
        if let Some(out) = self.channel_mut(semantic) {
            for (dst, &n) in out.chunks_exact_mut(3).zip(normals) {
                let n = if identity { n } else { (normal_matrix * n).normalize_or_zero() };
                dst.copy_from_slice(&n.to_array());
            }
        }
        Ok(())
    }

    /// Write premultiplied colours scaled by the command's colour mask.
    pub fn write_colors(&mut self, colors: &[Color], mask: Color) -> Result<(), BatchError> {
        let semantic = AttributeSemantic::ColorRGBA;
        if self.format.position_of(semantic).is_none() {
            return Ok(());
        }
        self.check_len(semantic, colors.len())?;

        if let Some(out) = self.channel_mut(semantic) {
            for (dst, &c) in out.chunks_exact_mut(4).zip(colors) {
                dst.copy_from_slice(&(c * mask).to_array());
            }
        }
        Ok(())
    }

    pub fn write_tex_coords(&mut self, tex_coords: &[Vec2]) -> Result<(), BatchError> {
        let semantic = AttributeSemantic::TexCoordXY;
        if self.format.position_of(semantic).is_none() {
            return Ok(());
        }
        self.check_len(semantic, tex_coords.len())?;

        if let Some(out) = self.channel_mut(semantic) {
            for (dst, uv) in out.chunks_exact_mut(2).zip(tex_coords) {
                dst.copy_from_slice(&uv.to_array());
            }
        }
        Ok(())
    }

    /// Set every vertex of one channel to `value`.
    ///
    /// `value` shorter than the channel's component count leaves the rest untouched.
    pub fn fill_attribute(&mut self, semantic: AttributeSemantic, value: &[f32]) {
        let n = semantic.components().min(value.len());
        if let Some(out) = self.channel_mut(semantic) {
            for dst in out.chunks_exact_mut(semantic.components()) {
                dst[..n].copy_from_slice(&value[..n]);
            }
        }
    }
}

impl Drop for VertexSpan<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        if self.len > 0 {
            let missing = self.unwritten();
            if !missing.is_empty() {
                tracing::warn!(
                    buffer = ?self.buffer,
                    vertices = self.len,
                    ?missing,
                    "vertex span dropped with unwritten channels"
                );
            }
        }
    }
}
