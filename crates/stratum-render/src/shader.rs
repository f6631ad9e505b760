//! Shaders as the batcher sees them: a vertex format, a set of uniform
//! slots, and optionally one wgpu pipeline per blend mode.

use ahash::HashMap;

use crate::blend::BlendMode;
use crate::context::GraphicsContext;
use crate::uniforms::ModelUniforms;
use crate::vertex::VertexFormat;

/// Default shader for [`VertexFormat::sprite`] geometry.
///
/// Group 0 holds the model matrix (dynamic offset), group 1 a texture and
/// sampler. Untextured draws should bind a 1x1 white texture.
pub const SPRITE_SHADER: &str = r#"
@group(0) @binding(0)
var<uniform> model: mat4x4<f32>;

@group(1) @binding(0)
var sprite_texture: texture_2d<f32>;
@group(1) @binding(1)
var sprite_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) tex_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = model * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    out.tex_coords = in.tex_coords;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(sprite_texture, sprite_sampler, in.tex_coords) * in.color;
}
"#;

#[derive(Debug)]
pub struct Shader {
    label: String,
    format: VertexFormat,
    uniforms: Vec<String>,
    /// Pipeline layout has a texture bind group at slot 1
    texture_slot: bool,
    pipelines: HashMap<BlendMode, wgpu::RenderPipeline>,
}

impl Shader {
    /// A shader with no GPU pipelines, for draw targets that bring their own.
    pub fn new<S: Into<String>>(
        label: impl Into<String>,
        format: VertexFormat,
        uniforms: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            label: label.into(),
            format,
            uniforms: uniforms.into_iter().map(Into::into).collect(),
            texture_slot: false,
            pipelines: HashMap::default(),
        }
    }

    /// Declare that materials using this shader must supply a texture.
    pub fn with_texture_slot(mut self) -> Self {
        self.texture_slot = true;
        self
    }

    /// Compile WGSL and build one render pipeline per requested blend mode.
    ///
    /// The model matrix must be `@group(0) @binding(0)`; its layout comes
    /// from `uniforms` so every shader shares one bind group.
    pub fn from_wgsl(
        context: &GraphicsContext,
        uniforms: &ModelUniforms,
        descriptor: &ShaderDescriptor<'_>,
    ) -> Self {
        let device = &context.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(descriptor.label),
            source: wgpu::ShaderSource::Wgsl(descriptor.source.into()),
        });

        let mut bind_group_layouts = vec![uniforms.layout()];
        if let Some(texture_layout) = descriptor.texture_layout {
            bind_group_layouts.push(texture_layout);
        }
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(descriptor.label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let attributes = descriptor.format.wgpu_attributes();
        let buffers = descriptor.format.buffer_layouts(&attributes);

        let pipelines = descriptor
            .blend_modes
            .iter()
            .map(|&blend| {
                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&format!("{} ({blend})", descriptor.label)),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: Some(descriptor.vertex_entry),
                        buffers: &buffers,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: Some(descriptor.fragment_entry),
                        targets: &[Some(blend.to_color_target_state(descriptor.color_format))],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: descriptor.depth_format.map(|format| wgpu::DepthStencilState {
                        format,
                        depth_write_enabled: descriptor.depth_write,
                        depth_compare: descriptor.depth_compare,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });
                (blend, pipeline)
            })
            .collect();

        tracing::debug!(
            shader = descriptor.label,
            pipelines = descriptor.blend_modes.len(),
            "built shader pipelines"
        );

        Self {
            label: descriptor.label.to_string(),
            format: descriptor.format.clone(),
            uniforms: descriptor.uniforms.iter().map(|u| u.to_string()).collect(),
            texture_slot: descriptor.texture_layout.is_some(),
            pipelines,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|u| u == name)
    }

    pub fn uniforms(&self) -> &[String] {
        &self.uniforms
    }

    pub fn has_texture_slot(&self) -> bool {
        self.texture_slot
    }

    pub fn pipeline(&self, blend: BlendMode) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&blend)
    }
}

/// Everything [`Shader::from_wgsl`] needs.
pub struct ShaderDescriptor<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub format: VertexFormat,
    /// Uniform names the shader declares. Must include the sorter's model uniform.
    pub uniforms: &'a [&'a str],
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    /// Layout of bind group 1, if the shader samples a texture.
    pub texture_layout: Option<&'a wgpu::BindGroupLayout>,
    pub blend_modes: &'a [BlendMode],
}

impl<'a> ShaderDescriptor<'a> {
    pub fn new(label: &'a str, source: &'a str, color_format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            source,
            format: VertexFormat::sprite(),
            uniforms: &["model"],
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            color_format,
            depth_format: None,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            texture_layout: None,
            blend_modes: &BlendMode::PRESETS,
        }
    }

    /// The built-in sprite shader; still needs [`Self::texture_layout`].
    pub fn sprite(color_format: wgpu::TextureFormat) -> Self {
        Self::new("sprite", SPRITE_SHADER, color_format)
    }

    pub fn format(mut self, format: VertexFormat) -> Self {
        self.format = format;
        self
    }

    pub fn uniforms(mut self, uniforms: &'a [&'a str]) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn depth(mut self, format: wgpu::TextureFormat, compare: wgpu::CompareFunction) -> Self {
        self.depth_format = Some(format);
        self.depth_compare = compare;
        self
    }

    pub fn depth_write(mut self, enabled: bool) -> Self {
        self.depth_write = enabled;
        self
    }

    pub fn texture_layout(mut self, layout: &'a wgpu::BindGroupLayout) -> Self {
        self.texture_layout = Some(layout);
        self
    }

    pub fn blend_modes(mut self, modes: &'a [BlendMode]) -> Self {
        self.blend_modes = modes;
        self
    }
}

/// Layout for the texture + sampler pair [`SPRITE_SHADER`] reads from group 1.
pub fn texture_bind_group_layout(context: &GraphicsContext) -> wgpu::BindGroupLayout {
    context
        .device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
}
