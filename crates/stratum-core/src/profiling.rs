//! Profiling utilities based on the `puffin` crate.
//!
//! With the `profiling` feature disabled the macros compile to nothing, so
//! call sites never need their own `cfg` guards.

#[cfg(feature = "profiling")]
pub use imp::*;

#[cfg(not(feature = "profiling"))]
pub use noop::*;

#[cfg(feature = "profiling")]
mod imp {
    use std::sync::OnceLock;

    pub use puffin::{profile_function, profile_scope};

    /// Profiling backend options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ProfilingBackend {
        /// Send profiling data to puffin_viewer via HTTP.
        PuffinHttp,
    }

    const SERVER_ADDR: &str = "0.0.0.0:8585";

    static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

    /// Start recording scopes without serving them anywhere.
    pub fn enable_scopes() {
        puffin::set_scopes_on(true);
    }

    /// Initialize profiling with the specified backend.
    ///
    /// # Example
    /// ```no_run
    /// use stratum_core::profiling::{init_profiling, ProfilingBackend};
    ///
    /// init_profiling(ProfilingBackend::PuffinHttp);
    /// ```
    pub fn init_profiling(backend: ProfilingBackend) {
        match backend {
            ProfilingBackend::PuffinHttp => {
                enable_scopes();
                match puffin_http::Server::new(SERVER_ADDR) {
                    Ok(server) => {
                        tracing::info!("Puffin profiler server started on http://{SERVER_ADDR}");
                        let _ = PROFILING_SERVER.set(server);
                    }
                    Err(e) => {
                        tracing::error!("Failed to start puffin server: {}", e);
                    }
                }
            }
        }
    }

    /// Mark the start of a new frame for profiling.
    #[inline]
    pub fn new_frame() {
        puffin::GlobalProfiler::lock().new_frame();
    }
}

#[cfg(not(feature = "profiling"))]
mod noop {
    #[macro_export]
    #[doc(hidden)]
    macro_rules! __stratum_profile_noop {
        ($($arg:tt)*) => {};
    }

    pub use crate::__stratum_profile_noop as profile_function;
    pub use crate::__stratum_profile_noop as profile_scope;

    #[inline]
    pub fn new_frame() {}
}
