//! Planar vertex formats.
//!
//! Each attribute lives in its own `f32` channel, so a producer can write
//! positions for a whole span and then colours for the same span without
//! interleaving.

use std::sync::Arc;

/// What an attribute means, which fixes its component count and how the
/// batcher transforms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSemantic {
    /// 2D position; z is dropped after transformation.
    PositionXY,
    PositionXYZ,
    /// Transformed by the inverse-transpose of the command transform.
    NormalXYZ,
    /// Premultiplied colour, multiplied by the command's colour mask.
    ColorRGBA,
    TexCoordXY,
}

impl AttributeSemantic {
    pub const fn components(self) -> usize {
        match self {
            AttributeSemantic::PositionXY | AttributeSemantic::TexCoordXY => 2,
            AttributeSemantic::PositionXYZ | AttributeSemantic::NormalXYZ => 3,
            AttributeSemantic::ColorRGBA => 4,
        }
    }

    pub const fn is_position(self) -> bool {
        matches!(self, AttributeSemantic::PositionXY | AttributeSemantic::PositionXYZ)
    }

    pub fn wgpu_format(self) -> wgpu::VertexFormat {
        match self.components() {
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }
}

impl std::fmt::Display for AttributeSemantic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AttributeSemantic::PositionXY => "position_xy",
            AttributeSemantic::PositionXYZ => "position_xyz",
            AttributeSemantic::NormalXYZ => "normal_xyz",
            AttributeSemantic::ColorRGBA => "color_rgba",
            AttributeSemantic::TexCoordXY => "tex_coord_xy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Name as declared by the shader, for diagnostics.
    pub name: String,
    pub semantic: AttributeSemantic,
}

impl VertexAttribute {
    pub fn new(name: impl Into<String>, semantic: AttributeSemantic) -> Self {
        Self {
            name: name.into(),
            semantic,
        }
    }
}

/// Ordered attribute list shared by a shader and every buffer it draws.
///
/// Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    attributes: Arc<[VertexAttribute]>,
}

impl VertexFormat {
    pub fn new(attributes: impl IntoIterator<Item = VertexAttribute>) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
        }
    }

    /// Position xyz, colour rgba, tex coords xy. Matches [`crate::SPRITE_SHADER`].
    pub fn sprite() -> Self {
        Self::new([
            VertexAttribute::new("position", AttributeSemantic::PositionXYZ),
            VertexAttribute::new("color", AttributeSemantic::ColorRGBA),
            VertexAttribute::new("tex_coords", AttributeSemantic::TexCoordXY),
        ])
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Channel index of the first attribute with `semantic`.
    pub fn position_of(&self, semantic: AttributeSemantic) -> Option<usize> {
        self.attributes.iter().position(|a| a.semantic == semantic)
    }

    /// Channel index of whichever position attribute the format declares.
    pub fn position_channel(&self) -> Option<usize> {
        self.attributes.iter().position(|a| a.semantic.is_position())
    }

    /// Total floats per vertex across all channels.
    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|a| a.semantic.components()).sum()
    }

    /// Byte range of attribute `index`'s block in a buffer of `capacity` vertices.
    pub fn block_range(&self, index: usize, capacity: usize) -> std::ops::Range<u64> {
        let before: usize = self.attributes[..index]
            .iter()
            .map(|a| a.semantic.components())
            .sum();
        let start = (capacity * before * 4) as u64;
        let len = (capacity * self.attributes[index].semantic.components() * 4) as u64;
        start..start + len
    }

    /// One `wgpu::VertexAttribute` per channel, at shader locations 0, 1, ...
    ///
    /// Each sits at offset 0 of its own vertex buffer slot, see [`Self::buffer_layouts`].
    pub fn wgpu_attributes(&self) -> Vec<[wgpu::VertexAttribute; 1]> {
        self.attributes
            .iter()
            .enumerate()
            .map(|(location, a)| {
                [wgpu::VertexAttribute {
                    format: a.semantic.wgpu_format(),
                    offset: 0,
                    shader_location: location as u32,
                }]
            })
            .collect()
    }

    /// Vertex buffer layouts referencing `attributes` from [`Self::wgpu_attributes`].
    pub fn buffer_layouts<'a>(
        &self,
        attributes: &'a [[wgpu::VertexAttribute; 1]],
    ) -> Vec<wgpu::VertexBufferLayout<'a>> {
        self.attributes
            .iter()
            .zip(attributes)
            .map(|(a, attrs)| wgpu::VertexBufferLayout {
                array_stride: (a.semantic.components() * 4) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect()
    }
}
