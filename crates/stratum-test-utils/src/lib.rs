//! GPU seam for the Stratum batcher.
//!
//! The batcher never touches `wgpu::Device` directly when it manages vertex
//! storage. It goes through [`RenderContext`], which the real graphics
//! context implements and `MockRenderContext` (behind the `mock` feature)
//! fakes by recording every call.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use stratum_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("arena vertices"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
//!     mapped_at_creation: false,
//! });
//! mock.write_buffer(&buffer, 0, &[1, 2, 3, 4]);
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert_eq!(&mock.buffer_contents(&buffer)[..4], &[1, 2, 3, 4]);
//! # }
//! ```
//!
//! Handles are owned and cheap to clone, so no lifetimes leak out of the
//! trait and it stays object safe (`dyn RenderContext`).

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
