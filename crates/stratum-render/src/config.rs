use crate::bucket::SoftwareSortMode;

/// Vertices per arena buffer unless configured otherwise.
pub const DEFAULT_VERTEX_CAPACITY: usize = 32 * 1024;

/// Settings a [`crate::Sorter`] starts with. The runtime setters on the
/// sorter change the same fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SorterConfig {
    /// Whether the pass has a depth buffer. Off forces every command translucent.
    pub depth_test: bool,
    /// Nudge each successive command's depth to keep same-layer draws in submission order.
    pub depth_bump: bool,
    pub sort_mode: SoftwareSortMode,
    pub vertex_capacity: usize,
    pub index_capacity: usize,
    /// Uniform every shader must declare for the per-draw model matrix.
    pub model_uniform: String,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_bump: false,
            sort_mode: SoftwareSortMode::None,
            vertex_capacity: DEFAULT_VERTEX_CAPACITY,
            index_capacity: DEFAULT_VERTEX_CAPACITY * 3,
            model_uniform: "model".to_string(),
        }
    }
}

impl SorterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn with_depth_bump(mut self, enabled: bool) -> Self {
        self.depth_bump = enabled;
        self
    }

    pub fn with_sort_mode(mut self, mode: SoftwareSortMode) -> Self {
        self.sort_mode = mode;
        self
    }

    /// Size each arena buffer for `vertices` vertices and `indices` indices.
    pub fn with_buffer_capacity(mut self, vertices: usize, indices: usize) -> Self {
        self.vertex_capacity = vertices;
        self.index_capacity = indices;
        self
    }

    pub fn with_model_uniform(mut self, name: impl Into<String>) -> Self {
        self.model_uniform = name.into();
        self
    }
}
