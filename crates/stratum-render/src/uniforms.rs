//! Per-draw model matrices, streamed into uniform chunks and bound with
//! dynamic offsets.
//!
//! Each matrix gets its own aligned slot. When a chunk fills up a new one is
//! allocated, so a frame never runs out of space; chunks are reused from the
//! start on [`ModelUniforms::next_frame`].
//!
//! ```ignore
//! let mut uniforms = ModelUniforms::new(ctx.clone());
//! // per frame
//! uniforms.next_frame();
//! let (bind_group, offset) = uniforms.push(&model);
//! pass.set_bind_group(0, bind_group, &[offset]);
//! ```

use std::sync::Arc;

use glam::Mat4;
use stratum_core::profiling::profile_function;

use crate::context::GraphicsContext;

const MATRIX_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;
const SLOTS_PER_CHUNK: u64 = 1024;

struct UniformChunk {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct ModelUniforms {
    context: Arc<GraphicsContext>,
    layout: wgpu::BindGroupLayout,
    chunks: Vec<UniformChunk>,
    /// Chunk currently being filled
    chunk: usize,
    /// Next free slot in that chunk
    slot: u64,
    stride: u64,
}

impl ModelUniforms {
    pub fn new(context: Arc<GraphicsContext>) -> Self {
        let alignment = context.device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = MATRIX_SIZE.div_ceil(alignment) * alignment;

        let layout = context
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("model uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(MATRIX_SIZE),
                    },
                    count: None,
                }],
            });

        Self {
            context,
            layout,
            chunks: Vec::new(),
            chunk: 0,
            slot: 0,
            stride,
        }
    }

    /// Layout every batcher shader uses for bind group 0.
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Rewind to the first chunk. Call once per frame before drawing.
    pub fn next_frame(&mut self) {
        self.chunk = 0;
        self.slot = 0;
    }

    /// Make sure `count` more matrices fit without allocating mid-pass.
    pub fn reserve(&mut self, count: usize) {
        let needed = self.slot + count as u64;
        let available = (self.chunks.len() - self.chunk.min(self.chunks.len())) as u64 * SLOTS_PER_CHUNK;
        if needed > available {
            let extra = (needed - available).div_ceil(SLOTS_PER_CHUNK);
            for _ in 0..extra {
                self.allocate_chunk();
            }
        }
    }

    /// Write `model` into the next slot; returns the bind group and dynamic offset to bind.
    pub fn push(&mut self, model: &Mat4) -> (&wgpu::BindGroup, u32) {
        profile_function!();
        if self.slot == SLOTS_PER_CHUNK {
            self.chunk += 1;
            self.slot = 0;
        }
        if self.chunk == self.chunks.len() {
            self.allocate_chunk();
        }

        let offset = self.slot * self.stride;
        self.slot += 1;

        let chunk = &self.chunks[self.chunk];
        self.context
            .queue
            .write_buffer(&chunk.buffer, offset, bytemuck::bytes_of(model));
        (&chunk.bind_group, offset as u32)
    }

    fn allocate_chunk(&mut self) {
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("model uniforms"),
            size: SLOTS_PER_CHUNK * self.stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("model uniforms"),
                layout: &self.layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(MATRIX_SIZE),
                    }),
                }],
            });
        tracing::debug!(chunk = self.chunks.len(), "allocated model uniform chunk");
        self.chunks.push(UniformChunk { buffer, bind_group });
    }
}
