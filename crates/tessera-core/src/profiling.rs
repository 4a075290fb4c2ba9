//! Profiling utilities based on the `puffin` crate.
//!
//! Scopes are always compiled in; they cost a relaxed atomic load until
//! [`set_enabled`] (or [`init_profiling`]) turns collection on.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

#[cfg(feature = "profiling-server")]
use std::sync::OnceLock;

/// Profiling backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Collect scopes in-process only (inspect through `GlobalProfiler`).
    InProcess,
    /// Send profiling data to puffin_viewer via HTTP.
    #[cfg(feature = "profiling-server")]
    PuffinHttp,
}

#[cfg(feature = "profiling-server")]
static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Enable or disable scope collection.
pub fn set_enabled(enabled: bool) {
    puffin::set_scopes_on(enabled);
}

/// Initialize profiling with the specified backend.
///
/// # Example
/// ```no_run
/// use tessera_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::InProcess);
/// ```
pub fn init_profiling(backend: ProfilingBackend) {
    set_enabled(true);

    match backend {
        ProfilingBackend::InProcess => {
            tracing::info!("Puffin profiling enabled (in-process)");
        }
        #[cfg(feature = "profiling-server")]
        ProfilingBackend::PuffinHttp => match puffin_http::Server::new("0.0.0.0:8585") {
            Ok(server) => {
                tracing::info!("Puffin profiler server started on http://0.0.0.0:8585");
                let _ = PROFILING_SERVER.set(server);
            }
            Err(e) => {
                tracing::error!("Failed to start puffin server: {}", e);
            }
        },
    }
}

/// Mark the start of a new frame for profiling.
///
/// Call this once per frame, typically right after the batch context's
/// `end_frame`.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
