use std::sync::Arc;

use stratum_test_utils::GpuBindGroup;

use crate::blend::BlendMode;
use crate::error::BatchError;
use crate::shader::Shader;

/// Shader, texture and blend state bound together for a draw.
///
/// Equality is by identity: same shader `Arc`, same texture bind group, same
/// blend mode. The emitter only uses it to tell whether a rebind is needed.
#[derive(Debug, Clone)]
pub struct Material {
    shader: Arc<Shader>,
    texture: Option<GpuBindGroup>,
    blend: BlendMode,
}

impl Material {
    pub fn new(shader: Arc<Shader>) -> Self {
        Self {
            shader,
            texture: None,
            blend: BlendMode::default(),
        }
    }

    pub fn with_texture(mut self, texture: GpuBindGroup) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn texture(&self) -> Option<&GpuBindGroup> {
        self.texture.as_ref()
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    /// Fails when the shader has a texture slot and nothing fills it, which
    /// would leave the previous material's texture bound.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.shader.has_texture_slot() && self.texture.is_none() {
            return Err(BatchError::MissingTexture {
                shader: self.shader.label().to_string(),
            });
        }
        Ok(())
    }
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shader, &other.shader)
            && self.texture.as_ref().map(GpuBindGroup::id) == other.texture.as_ref().map(GpuBindGroup::id)
            && self.blend == other.blend
    }
}
