//! Trait abstracting the GPU operations the batcher needs.

use crate::gpu_types::GpuBuffer;
use wgpu::BufferDescriptor;

/// Buffer creation and upload, the only GPU work done outside a render pass.
///
/// Methods take `&self` so one context can be shared behind an `Arc` by the
/// sorter, prebuilt meshes and the caller. Mock implementations use interior
/// mutability to record calls.
///
/// ```rust,no_run
/// use stratum_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload_indices(ctx: &dyn RenderContext, indices: &[u32]) {
///     let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
///     let buffer = ctx.create_buffer(&BufferDescriptor {
///         label: Some("indices"),
///         size: bytes.len() as u64,
///         usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     ctx.write_buffer(&buffer, 0, &bytes);
/// }
/// ```
pub trait RenderContext: Send + Sync {
    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write `data` into `buffer` starting at byte `offset`.
    ///
    /// For real buffers this is `queue.write_buffer()`; the copy lands before
    /// the next submitted command buffer executes.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);
}
