/// Process-wide settings applied by [`crate::init`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Overrides the default `tracing` filter. `RUST_LOG` still wins when set.
    pub log_filter: Option<String>,
    pub profiling: ProfilingMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_filter: None,
            profiling: ProfilingMode::Off,
        }
    }
}

impl Config {
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    pub fn with_profiling(mut self, mode: ProfilingMode) -> Self {
        self.profiling = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingMode {
    /// Profiling scopes are compiled in but not recorded
    Off,
    /// Scopes are recorded in-process
    On,
    /// Scopes are recorded and served to `puffin_viewer` over HTTP
    WithWebserver,
}
