//! Tessera Core
//!
//! Ambient utilities shared by the Tessera crates: tracing bootstrap and
//! puffin profiling scopes.

pub mod logging;
pub mod profiling;
