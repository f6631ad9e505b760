//! Layered draw-command sorting and vertex auto-batching on wgpu.
//!
//! Commands go into a [`Sorter`] during the frame. On [`Sorter::draw`] they
//! are ordered by layer and translucency, small geometry is packed into
//! shared vertex buffers, and the result is issued with as few state changes
//! as the ordering allows.
//!
//! ```ignore
//! let ctx = GraphicsContext::new_owned_sync()?;
//! let mut sorter = Sorter::new(ctx.clone(), VertexFormat::sprite(), SorterConfig::default());
//!
//! sorter.set_layer(1);
//! sorter.add(Arc::new(Sprite::new(Vec2::splat(32.0))), transform, Color::WHITE, &material, false);
//!
//! uniforms.next_frame();
//! let mut pass = encoder.begin_render_pass(&desc);
//! sorter.draw(&mut PassTarget::new(&mut pass, &mut uniforms))?;
//! ```

mod arena;
mod batch;
mod blend;
mod bounds;
mod bucket;
mod color;
mod config;
mod context;
mod context_impl;
mod emitter;
mod error;
mod material;
mod mesh;
mod pass_target;
mod producer;
mod shader;
mod sorter;
mod sprite;
mod uniforms;
mod vertex;
mod vertex_buffer;

#[cfg(any(test, feature = "mock"))]
pub mod testing;

pub use arena::*;
pub use batch::*;
pub use blend::*;
pub use bounds::*;
pub use bucket::*;
pub use color::*;
pub use config::*;
pub use context::*;
pub use emitter::*;
pub use error::*;
pub use material::*;
pub use mesh::*;
pub use pass_target::*;
pub use producer::*;
pub use shader::*;
pub use sorter::*;
pub use sprite::*;
pub use uniforms::*;
pub use vertex::*;
pub use vertex_buffer::*;

// Re-export so downstream crates name the same wgpu as ours
pub use wgpu;
