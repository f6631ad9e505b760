//! Mock implementation of RenderContext for testing.
//!
//! Records every operation and keeps a byte-level shadow of each buffer so
//! tests can inspect what would have reached the GPU.

use crate::{gpu_types::*, render_context::RenderContext};
use parking_lot::Mutex;
use std::collections::HashMap;
use wgpu::*;

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        buffer_id: ResourceId,
        label: Option<String>,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: ResourceId,
        offset: u64,
        size: usize,
    },
}

/// Mock implementation of RenderContext for testing.
///
/// Methods take `&self` but must record calls, so state sits behind
/// `parking_lot::Mutex` (the trait requires `Send + Sync`).
///
/// ```rust
/// use stratum_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 1024,
///     usage: BufferUsages::VERTEX,
///     mapped_at_creation: false,
/// });
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
#[derive(Default)]
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    contents: Mutex<HashMap<ResourceId, Vec<u8>>>,
}

impl MockRenderContext {
    /// Create a new mock render context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// Count buffer creations.
    pub fn count_buffer_creates(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::CreateBuffer { .. }))
            .count()
    }

    /// Count buffer write operations.
    pub fn count_buffer_writes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::WriteBuffer { .. }))
            .count()
    }

    /// Count writes that targeted one buffer.
    pub fn count_writes_to(&self, buffer: &GpuBuffer) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| {
                matches!(call, RenderCall::WriteBuffer { buffer_id, .. } if *buffer_id == buffer.id())
            })
            .count()
    }

    /// Current contents of a mock buffer. Bytes never written read as zero.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Vec<u8> {
        self.contents
            .lock()
            .get(&buffer.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Clear recorded calls (useful between test steps). Buffer contents are kept.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let buffer = GpuBuffer::mock(desc.size);
        self.contents
            .lock()
            .insert(buffer.id(), vec![0; desc.size as usize]);
        self.calls.lock().push(RenderCall::CreateBuffer {
            buffer_id: buffer.id(),
            label: desc.label.map(|s| s.to_string()),
            size: desc.size,
            usage: desc.usage,
        });
        buffer
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        assert!(
            end as u64 <= buffer.size(),
            "write of {} bytes at offset {} overflows buffer of {} bytes",
            data.len(),
            offset,
            buffer.size()
        );

        if let Some(bytes) = self.contents.lock().get_mut(&buffer.id()) {
            bytes[start..end].copy_from_slice(data);
        }
        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id: buffer.id(),
            offset,
            size: data.len(),
        });
    }
}
