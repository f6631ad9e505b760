//! CPU-side meshes and their GPU-resident counterpart.
//!
//! A [`Mesh`] is re-packed into the sorter's arena every frame it is drawn,
//! so it batches with neighbouring geometry. [`Mesh::upload`] turns it into a
//! [`PrebuiltMesh`] instead: one dedicated buffer written once and drawn with
//! the command transform as its model matrix.
//!
//! # Example
//!
//! ```ignore
//! use stratum_render::*;
//! use glam::Vec3;
//!
//! let mesh = Mesh::builder()
//!     .positions(vec![
//!         Vec3::new(-0.5, -0.5, 0.0),
//!         Vec3::new(0.5, -0.5, 0.0),
//!         Vec3::new(0.0, 0.5, 0.0),
//!     ])
//!     .indices(vec![0, 1, 2])
//!     .build();
//!
//! let terrain = Arc::new(big_mesh.upload(ctx.as_ref(), &VertexFormat::sprite())?);
//! sorter.add(terrain, Mat4::IDENTITY, Color::WHITE, &material, false);
//! ```

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use stratum_test_utils::RenderContext;

use crate::arena::VertexArena;
use crate::bounds::Aabb;
use crate::color::Color;
use crate::error::BatchError;
use crate::producer::GeometryProducer;
use crate::vertex::{AttributeSemantic, VertexFormat};
use crate::vertex_buffer::{BufferId, VertexBuffer, VertexSpan, validate_indices};

/// Indexed triangle geometry with optional per-vertex channels.
///
/// Empty optional channels are written as white, zero UV and +Z normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub tex_coords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn builder() -> MeshBuilder {
        MeshBuilder::default()
    }

    /// A `width` x `height` rectangle centred on the origin, facing +Z, with
    /// UV (0, 0) at the top left.
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            positions: vec![
                Vec3::new(-hw, hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(-hw, -hh, 0.0),
            ],
            tex_coords: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            indices: vec![0, 3, 1, 1, 3, 2],
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Box around every position. Empty for a mesh with no vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Check every optional channel is either empty or one entry per vertex.
    pub fn validate(&self) -> Result<(), BatchError> {
        let expected = self.positions.len();
        for (attribute, actual) in [
            (AttributeSemantic::ColorRGBA, self.colors.len()),
            (AttributeSemantic::TexCoordXY, self.tex_coords.len()),
            (AttributeSemantic::NormalXYZ, self.normals.len()),
        ] {
            if actual != 0 && actual != expected {
                return Err(BatchError::AttributeMismatch {
                    attribute,
                    expected,
                    actual,
                });
            }
        }
        validate_indices(&self.indices, expected)
    }

    fn write(&self, span: &mut VertexSpan<'_>, transform: &Mat4, mask: Color) -> Result<(), BatchError> {
        span.write_positions(transform, &self.positions)?;

        if self.colors.is_empty() {
            span.fill_attribute(AttributeSemantic::ColorRGBA, &mask.to_array());
        } else {
            span.write_colors(&self.colors, mask)?;
        }
        if self.tex_coords.is_empty() {
            span.fill_attribute(AttributeSemantic::TexCoordXY, &[0.0, 0.0]);
        } else {
            span.write_tex_coords(&self.tex_coords)?;
        }
        if self.normals.is_empty() {
            span.fill_attribute(AttributeSemantic::NormalXYZ, &[0.0, 0.0, 1.0]);
        } else {
            span.write_normals(transform, &self.normals)?;
        }
        Ok(())
    }

    /// Copy this mesh into a buffer of its own and upload it.
    ///
    /// The result keeps only the GPU copy and the bounds. Use this for static
    /// geometry and for meshes too large for an arena buffer.
    ///
    /// Vertex colours are baked untinted; see [`PrebuiltMesh`] for why the
    /// draw-time colour mask does not reach them.
    pub fn upload(&self, context: &dyn RenderContext, format: &VertexFormat) -> Result<PrebuiltMesh, BatchError> {
        self.validate()?;
        let mut buffer = VertexBuffer::new(
            context,
            format,
            self.positions.len(),
            self.indices.len(),
            "prebuilt mesh",
        );
        let vertices = buffer.append(&self.indices, self.positions.len())?;
        self.write(&mut buffer.span(vertices), &Mat4::IDENTITY, Color::WHITE)?;
        buffer.upload(context);
        buffer.release_cpu_storage();

        tracing::debug!(
            vertices = buffer.vertex_count(),
            indices = buffer.index_count(),
            "uploaded prebuilt mesh"
        );
        Ok(PrebuiltMesh {
            buffer: Arc::new(buffer),
            bounds: self.bounds(),
        })
    }
}

impl GeometryProducer for Mesh {
    fn fill(&self, arena: &mut VertexArena, transform: &Mat4, mask: Color) -> Result<BufferId, BatchError> {
        self.validate()?;
        let mut span = arena.reserve(&self.indices, self.positions.len())?;
        self.write(&mut span, transform, mask)?;
        Ok(span.buffer())
    }

    fn bounds(&self) -> Aabb {
        Mesh::bounds(self)
    }
}

/// Builder for [`Mesh`].
#[derive(Debug, Default)]
pub struct MeshBuilder {
    mesh: Mesh,
}

impl MeshBuilder {
    pub fn positions(mut self, positions: Vec<Vec3>) -> Self {
        self.mesh.positions = positions;
        self
    }

    pub fn colors(mut self, colors: Vec<Color>) -> Self {
        self.mesh.colors = colors;
        self
    }

    pub fn tex_coords(mut self, tex_coords: Vec<Vec2>) -> Self {
        self.mesh.tex_coords = tex_coords;
        self
    }

    pub fn normals(mut self, normals: Vec<Vec3>) -> Self {
        self.mesh.normals = normals;
        self
    }

    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.mesh.indices = indices;
        self
    }

    pub fn build(self) -> Mesh {
        self.mesh
    }
}

/// A mesh living in its own GPU buffer. Drawn without batching.
///
/// The colour mask passed with a draw command has no effect here: vertex
/// colours were written once at upload and the buffer is drawn as-is, with
/// only the command transform applied. Tint through the material instead,
/// or draw the source [`Mesh`] so it is re-packed with the mask every frame.
#[derive(Debug, Clone)]
pub struct PrebuiltMesh {
    buffer: Arc<VertexBuffer>,
    bounds: Aabb,
}

impl PrebuiltMesh {
    pub fn buffer(&self) -> &Arc<VertexBuffer> {
        &self.buffer
    }

    /// Bounds of the source mesh, kept after its CPU copy is gone.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

impl GeometryProducer for PrebuiltMesh {
    fn prebuilt_buffer(&self) -> Option<Arc<VertexBuffer>> {
        Some(self.buffer.clone())
    }

    fn fill(&self, _: &mut VertexArena, _: &Mat4, _: Color) -> Result<BufferId, BatchError> {
        Err(BatchError::NotFillable)
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_test_utils::MockRenderContext;

    fn arena() -> (Arc<MockRenderContext>, VertexArena) {
        let mock = Arc::new(MockRenderContext::new());
        let arena = VertexArena::new(mock.clone(), VertexFormat::sprite(), 64, 192);
        (mock, arena)
    }

    fn triangle() -> Mesh {
        Mesh::builder()
            .positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
            .indices(vec![0, 1, 2])
            .build()
    }

    #[test]
    fn quad_is_two_triangles() {
        let quad = Mesh::quad(2.0, 4.0);
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.index_count(), 6);
        assert_eq!(quad.positions[1], Vec3::new(1.0, 2.0, 0.0));
        quad.validate().unwrap();
    }

    #[test]
    fn fill_transforms_and_masks() {
        let (_mock, mut arena) = arena();
        let mesh = Mesh {
            colors: vec![Color::RED; 3],
            ..triangle()
        };
        let transform = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        mesh.fill(&mut arena, &transform, Color::WHITE.with_alpha(0.5)).unwrap();

        let buffer = arena.buffer(0).unwrap();
        let pos = buffer.channel(AttributeSemantic::PositionXYZ).unwrap();
        assert_eq!(&pos[..9], &[10.0, 0.0, 0.0, 11.0, 0.0, 0.0, 10.0, 1.0, 0.0]);
        let col = buffer.channel(AttributeSemantic::ColorRGBA).unwrap();
        assert_eq!(&col[..4], &[0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn missing_channels_get_neutral_values() {
        let (_mock, mut arena) = arena();
        triangle().fill(&mut arena, &Mat4::IDENTITY, Color::WHITE).unwrap();

        let buffer = arena.buffer(0).unwrap();
        let col = buffer.channel(AttributeSemantic::ColorRGBA).unwrap();
        assert!(col[..12].iter().all(|&c| c == 1.0));
        let uv = buffer.channel(AttributeSemantic::TexCoordXY).unwrap();
        assert!(uv[..6].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn mismatched_channel_is_rejected() {
        let (_mock, mut arena) = arena();
        let mesh = Mesh {
            tex_coords: vec![Vec2::ZERO; 2],
            ..triangle()
        };
        assert_eq!(
            mesh.fill(&mut arena, &Mat4::IDENTITY, Color::WHITE).unwrap_err(),
            BatchError::AttributeMismatch {
                attribute: AttributeSemantic::TexCoordXY,
                expected: 3,
                actual: 2
            }
        );
        assert!(arena.reservations().is_empty());
    }

    #[test]
    fn upload_builds_an_exact_buffer() {
        let mock = MockRenderContext::new();
        let prebuilt = Mesh::quad(1.0, 1.0)
            .upload(&mock, &VertexFormat::sprite())
            .unwrap();

        let buffer = prebuilt.prebuilt_buffer().unwrap();
        assert_eq!(buffer.vertex_capacity(), 4);
        assert_eq!(buffer.index_count(), 6);
        assert!(!buffer.is_dirty());
        assert_eq!(mock.count_buffer_creates(), 2);
        assert_eq!(mock.count_writes_to(buffer.index_gpu_buffer()), 1);
    }

    #[test]
    fn upload_rejects_bad_topology() {
        let mock = MockRenderContext::new();
        let mesh = Mesh {
            indices: vec![0, 1],
            ..triangle()
        };
        assert_eq!(
            mesh.upload(&mock, &VertexFormat::sprite()).unwrap_err(),
            BatchError::InvalidTopology { index_count: 2 }
        );
        assert_eq!(mock.count_buffer_creates(), 0);
    }

    #[test]
    fn prebuilt_cannot_fill() {
        let mock = MockRenderContext::new();
        let prebuilt = triangle().upload(&mock, &VertexFormat::sprite()).unwrap();
        let (_mock, mut arena) = arena();
        assert_eq!(
            prebuilt.fill(&mut arena, &Mat4::IDENTITY, Color::WHITE).unwrap_err(),
            BatchError::NotFillable
        );
    }

    #[test]
    fn bounds_cover_all_positions() {
        let mesh = Mesh::quad(2.0, 4.0);
        assert_eq!(mesh.bounds(), Aabb::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(1.0, 2.0, 0.0)));
        assert!(Mesh::default().bounds().is_empty());

        let producer: &dyn GeometryProducer = &mesh;
        assert_eq!(producer.bounds(), mesh.bounds());
    }

    #[test]
    fn prebuilt_keeps_bounds_without_cpu_storage() {
        let mock = MockRenderContext::new();
        let prebuilt = triangle().upload(&mock, &VertexFormat::sprite()).unwrap();

        assert!(prebuilt.buffer().channel(AttributeSemantic::PositionXYZ).is_none());
        let expected = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(prebuilt.bounds(), expected);
        assert_eq!(GeometryProducer::bounds(&prebuilt), expected);
    }

    #[test]
    fn upload_bakes_colours_untinted() {
        let mock = MockRenderContext::new();
        let mesh = Mesh {
            colors: vec![Color::RED; 3],
            ..triangle()
        };
        let prebuilt = mesh.upload(&mock, &VertexFormat::sprite()).unwrap();

        let buffer = prebuilt.buffer();
        let slot = VertexFormat::sprite()
            .position_of(AttributeSemantic::ColorRGBA)
            .unwrap();
        let range = buffer.block_range(slot);
        let bytes = mock.buffer_contents(buffer.vertex_gpu_buffer());
        let colors: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes[range.start as usize..range.end as usize]);
        assert_eq!(colors, Color::RED.to_array().repeat(3));
    }
}
