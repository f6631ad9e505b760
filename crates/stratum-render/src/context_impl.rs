//! Implementation of RenderContext for GraphicsContext.
//!
//! Lets the arena and prebuilt meshes run against a real device or a
//! `MockRenderContext` through the same code.

use stratum_test_utils::{GpuBuffer, RenderContext};
use wgpu::BufferDescriptor;

use crate::context::GraphicsContext;

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        GpuBuffer::from_wgpu(self.device.create_buffer(desc))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }
}
