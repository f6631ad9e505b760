//! Error types for the batcher and the wgpu backend.

use crate::blend::BlendMode;
use crate::vertex::AttributeSemantic;

/// Misuse detected while collecting or emitting a frame.
///
/// Every variant is a programmer or content error. [`crate::Sorter::draw`]
/// stops at the first one and drops the rest of the frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    #[error("producer needs {requested} {kind}, but an arena buffer holds at most {capacity}")]
    CapacityExceeded {
        kind: CapacityKind,
        requested: usize,
        capacity: usize,
    },

    #[error("index count {index_count} is not a multiple of 3")]
    InvalidTopology { index_count: usize },

    #[error("index {index} references vertex outside the {vertex_count} reserved")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("shader `{shader}` has no `{uniform}` uniform slot")]
    MissingUniform { shader: String, uniform: String },

    #[error("{attribute} channel has {actual} entries, expected {expected}")]
    AttributeMismatch {
        attribute: AttributeSemantic,
        expected: usize,
        actual: usize,
    },

    #[error("shader `{shader}` has no pipeline for blend mode {blend}")]
    UnsupportedBlendMode { shader: String, blend: BlendMode },

    #[error("shader `{shader}` samples a texture but the material has none")]
    MissingTexture { shader: String },

    #[error("producer only offers a prebuilt buffer and cannot fill the arena")]
    NotFillable,
}

/// Which half of an arena buffer ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    Vertices,
    Indices,
}

impl std::fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityKind::Vertices => write!(f, "vertices"),
            CapacityKind::Indices => write!(f, "indices"),
        }
    }
}

/// Failure to bring up a wgpu device.
#[derive(Debug, thiserror::Error)]
pub enum GraphicsError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}
