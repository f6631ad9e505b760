//! Textured quads.

use glam::{Mat4, Vec2, Vec3};

use crate::arena::VertexArena;
use crate::bounds::Aabb;
use crate::color::Color;
use crate::error::BatchError;
use crate::producer::GeometryProducer;
use crate::vertex::AttributeSemantic;
use crate::vertex_buffer::BufferId;

/// Corner order is top-right, bottom-right, bottom-left, top-left.
pub const SPRITE_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// UV coordinates for a sprite within a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteUV {
    /// U coordinate of the left edge
    pub u_min: f32,
    /// V coordinate of the top edge
    pub v_min: f32,
    /// U coordinate of the right edge
    pub u_max: f32,
    /// V coordinate of the bottom edge
    pub v_max: f32,
}

impl Default for SpriteUV {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

impl SpriteUV {
    pub fn new(u_min: f32, v_min: f32, u_max: f32, v_max: f32) -> Self {
        Self {
            u_min,
            v_min,
            u_max,
            v_max,
        }
    }

    /// UV rect of a `size` pixel region at `origin` in a `texture` sized texture.
    pub fn from_pixels(origin: Vec2, size: Vec2, texture: Vec2) -> Self {
        let min = origin / texture;
        let max = (origin + size) / texture;
        Self::new(min.x, min.y, max.x, max.y)
    }

    pub fn flip_horizontal(&self) -> Self {
        Self {
            u_min: self.u_max,
            u_max: self.u_min,
            ..*self
        }
    }

    pub fn flip_vertical(&self) -> Self {
        Self {
            v_min: self.v_max,
            v_max: self.v_min,
            ..*self
        }
    }
}

/// A rectangle of texture drawn as one quad in the XY plane.
///
/// `origin` is the pivot as a fraction of `size`: (0.5, 0.5) centres the
/// quad on the command translation, (0, 0) puts its bottom-left corner there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub size: Vec2,
    pub origin: Vec2,
    pub uv: SpriteUV,
    pub tint: Color,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Sprite {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            origin: Vec2::splat(0.5),
            uv: SpriteUV::default(),
            tint: Color::WHITE,
            flip_x: false,
            flip_y: false,
        }
    }

    pub fn with_uv(mut self, uv: SpriteUV) -> Self {
        self.uv = uv;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    /// Local-space corners in [`SPRITE_INDICES`] order.
    pub fn corners(&self) -> [Vec3; 4] {
        let min = -self.origin * self.size;
        let max = min + self.size;
        [
            Vec3::new(max.x, max.y, 0.0),
            Vec3::new(max.x, min.y, 0.0),
            Vec3::new(min.x, min.y, 0.0),
            Vec3::new(min.x, max.y, 0.0),
        ]
    }

    /// Per-corner texture coordinates after flipping.
    pub fn tex_coords(&self) -> [Vec2; 4] {
        let mut uv = self.uv;
        if self.flip_x {
            uv = uv.flip_horizontal();
        }
        if self.flip_y {
            uv = uv.flip_vertical();
        }
        [
            Vec2::new(uv.u_max, uv.v_min),
            Vec2::new(uv.u_max, uv.v_max),
            Vec2::new(uv.u_min, uv.v_max),
            Vec2::new(uv.u_min, uv.v_min),
        ]
    }
}

impl GeometryProducer for Sprite {
    fn fill(&self, arena: &mut VertexArena, transform: &Mat4, mask: Color) -> Result<BufferId, BatchError> {
        let mut span = arena.reserve(&SPRITE_INDICES, 4)?;
        span.write_positions(transform, &self.corners())?;
        span.write_colors(&[self.tint; 4], mask)?;
        span.write_tex_coords(&self.tex_coords())?;
        span.fill_attribute(AttributeSemantic::NormalXYZ, &[0.0, 0.0, 1.0]);
        Ok(span.buffer())
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.corners())
    }
}
