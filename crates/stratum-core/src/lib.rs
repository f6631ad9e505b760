//! Stratum Core
//!
//! Process-level plumbing shared by the Stratum crates: log output and
//! frame profiling. Nothing in here knows about GPUs.

pub mod config;
pub mod logging;
pub mod profiling;

pub use config::{Config, ProfilingMode};

/// Install logging and profiling as described by `config`.
///
/// Call once at startup, before the first frame.
pub fn init(config: &Config) {
    logging::init_with_filter(config.log_filter.as_deref().unwrap_or(logging::DEFAULT_FILTER));

    match config.profiling {
        ProfilingMode::Off => {}
        #[cfg(feature = "profiling")]
        ProfilingMode::On => profiling::enable_scopes(),
        #[cfg(feature = "profiling")]
        ProfilingMode::WithWebserver => {
            profiling::init_profiling(profiling::ProfilingBackend::PuffinHttp)
        }
        #[cfg(not(feature = "profiling"))]
        ProfilingMode::On | ProfilingMode::WithWebserver => {
            tracing::warn!("profiling requested but the `profiling` feature is disabled");
        }
    }
}
