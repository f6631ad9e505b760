//! GPU resource wrappers that can be real or mock.
//!
//! Every handle carries a process-unique [`ResourceId`] so callers can compare
//! resources by identity without reaching into wgpu.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a GPU resource handle. Clones share the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Wrapper around a GPU buffer that can be real or mock.
///
/// Clone is cheap: wgpu buffers are reference counted.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    id: ResourceId,
    size: u64,
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real(wgpu::Buffer),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuBuffer {
    /// Create from real WGPU buffer
    pub fn from_wgpu(buffer: wgpu::Buffer) -> Self {
        Self {
            id: ResourceId::next(),
            size: buffer.size(),
            inner: GpuBufferInner::Real(buffer),
        }
    }

    /// Create mock buffer (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(size: u64) -> Self {
        Self {
            id: ResourceId::next(),
            size,
            inner: GpuBufferInner::Mock,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get the underlying wgpu::Buffer (if real)
    ///
    /// # Panics
    /// Panics if this is a mock buffer (test code should never call this)
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    /// Check if this is a mock (useful in tests)
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock)
    }
}

/// Wrapper around a GPU bind group that can be real or mock.
///
/// Materials use these for their texture binding and compare them by id.
#[derive(Clone, Debug)]
pub struct GpuBindGroup {
    id: ResourceId,
    inner: GpuBindGroupInner,
}

#[derive(Clone, Debug)]
enum GpuBindGroupInner {
    Real(wgpu::BindGroup),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuBindGroup {
    /// Create from real WGPU bind group
    pub fn from_wgpu(bind_group: wgpu::BindGroup) -> Self {
        Self {
            id: ResourceId::next(),
            inner: GpuBindGroupInner::Real(bind_group),
        }
    }

    /// Create mock bind group (for testing)
    #[cfg(feature = "mock")]
    pub fn mock() -> Self {
        Self {
            id: ResourceId::next(),
            inner: GpuBindGroupInner::Mock,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get the underlying wgpu::BindGroup (if real)
    ///
    /// # Panics
    /// Panics if this is a mock bind group
    pub fn as_wgpu(&self) -> &wgpu::BindGroup {
        match &self.inner {
            GpuBindGroupInner::Real(bind_group) => bind_group,
            #[cfg(feature = "mock")]
            GpuBindGroupInner::Mock => {
                panic!("Attempted to get wgpu::BindGroup from mock")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBindGroupInner::Mock)
    }
}
