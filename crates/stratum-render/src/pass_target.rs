//! [`DrawTarget`] over a live wgpu render pass.

use std::ops::Range;

use glam::Mat4;

use crate::emitter::DrawTarget;
use crate::error::BatchError;
use crate::material::Material;
use crate::shader::Shader;
use crate::uniforms::ModelUniforms;
use crate::vertex_buffer::VertexBuffer;

/// Draws into `pass`, streaming model matrices through `uniforms`.
///
/// Bind group 0 is the model matrix, bind group 1 the material texture.
/// Vertex slot `i` is the vertex format's `i`th attribute.
///
/// ```ignore
/// uniforms.next_frame();
/// let mut pass = encoder.begin_render_pass(&desc);
/// sorter.draw(&mut PassTarget::new(&mut pass, &mut uniforms))?;
/// ```
pub struct PassTarget<'a, 'p> {
    pass: &'a mut wgpu::RenderPass<'p>,
    uniforms: &'a mut ModelUniforms,
}

impl<'a, 'p> PassTarget<'a, 'p> {
    pub fn new(pass: &'a mut wgpu::RenderPass<'p>, uniforms: &'a mut ModelUniforms) -> Self {
        Self { pass, uniforms }
    }
}

impl DrawTarget for PassTarget<'_, '_> {
    fn reserve_draws(&mut self, count: usize) {
        self.uniforms.reserve(count);
    }

    fn bind_state(&mut self, material: &Material) -> Result<(), BatchError> {
        let shader = material.shader();
        let pipeline = shader
            .pipeline(material.blend())
            .ok_or_else(|| BatchError::UnsupportedBlendMode {
                shader: shader.label().to_string(),
                blend: material.blend(),
            })?;
        if shader.has_texture_slot() {
            let texture = material.texture().ok_or_else(|| BatchError::MissingTexture {
                shader: shader.label().to_string(),
            })?;
            self.pass.set_pipeline(pipeline);
            self.pass.set_bind_group(1, texture.as_wgpu(), &[]);
        } else {
            self.pass.set_pipeline(pipeline);
        }
        Ok(())
    }

    fn set_uniform(&mut self, shader: &Shader, name: &str, value: &Mat4) -> bool {
        if !shader.has_uniform(name) {
            return false;
        }
        let (bind_group, offset) = self.uniforms.push(value);
        self.pass.set_bind_group(0, bind_group, &[offset]);
        true
    }

    fn draw(&mut self, buffer: &VertexBuffer, indices: Range<u32>) {
        let vertices = buffer.vertex_gpu_buffer().as_wgpu();
        for slot in 0..buffer.format().attributes().len() {
            self.pass
                .set_vertex_buffer(slot as u32, vertices.slice(buffer.block_range(slot)));
        }
        self.pass.set_index_buffer(
            buffer.index_gpu_buffer().as_wgpu().slice(..),
            wgpu::IndexFormat::Uint32,
        );
        self.pass.draw_indexed(indices, 0, 0..1);
    }
}
