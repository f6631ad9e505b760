//! Blend mode presets for common rendering scenarios.

/// How a material's fragments combine with the target.
///
/// Part of a material's bound state: the emitter rebinds whenever it changes
/// between consecutive draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending - source completely replaces destination.
    Replace,

    /// Straight alpha blending.
    ///
    /// Formula: `src.rgb * src.a + dst.rgb * (1 - src.a)`
    Alpha,

    /// Premultiplied alpha blending, matching the premultiplied vertex colours
    /// the batcher writes.
    ///
    /// Formula: `src.rgb + dst.rgb * (1 - src.a)`
    #[default]
    PremultipliedAlpha,

    /// Additive blending.
    ///
    /// Formula: `src.rgb + dst.rgb`
    Additive,

    /// Multiplicative blending.
    ///
    /// Formula: `src.rgb * dst.rgb`
    Multiply,

    /// Custom blend state for advanced use cases.
    Custom(wgpu::BlendState),
}

impl BlendMode {
    /// Presets a shader builds pipelines for unless told otherwise.
    pub const PRESETS: [BlendMode; 5] = [
        BlendMode::Replace,
        BlendMode::Alpha,
        BlendMode::PremultipliedAlpha,
        BlendMode::Additive,
        BlendMode::Multiply,
    ];

    /// Convert to wgpu BlendState. `Replace` disables blending entirely.
    pub fn to_blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Replace => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::PremultipliedAlpha => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Multiply => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Dst,
                    dst_factor: wgpu::BlendFactor::Zero,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::DstAlpha,
                    dst_factor: wgpu::BlendFactor::Zero,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Custom(state) => Some(state),
        }
    }

    /// Create a color target state with this blend mode.
    pub fn to_color_target_state(self, format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format,
            blend: self.to_blend_state(),
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlendMode::Replace => write!(f, "replace"),
            BlendMode::Alpha => write!(f, "alpha"),
            BlendMode::PremultipliedAlpha => write!(f, "premultiplied-alpha"),
            BlendMode::Additive => write!(f, "additive"),
            BlendMode::Multiply => write!(f, "multiply"),
            BlendMode::Custom(_) => write!(f, "custom"),
        }
    }
}

impl From<wgpu::BlendState> for BlendMode {
    fn from(state: wgpu::BlendState) -> Self {
        BlendMode::Custom(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_premultiplied_vertices() {
        assert_eq!(BlendMode::default(), BlendMode::PremultipliedAlpha);
        assert_eq!(
            BlendMode::default().to_blend_state(),
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING)
        );
    }

    #[test]
    fn replace_disables_blending() {
        let target = BlendMode::Replace.to_color_target_state(wgpu::TextureFormat::Bgra8Unorm);
        assert!(target.blend.is_none());
    }

    #[test]
    fn custom_round_trips() {
        let mode = BlendMode::from(wgpu::BlendState::ALPHA_BLENDING);
        assert_eq!(mode.to_blend_state(), Some(wgpu::BlendState::ALPHA_BLENDING));
        assert_eq!(mode.to_string(), "custom");
    }
}
