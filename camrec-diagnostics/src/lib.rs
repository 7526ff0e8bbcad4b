//! # camrec diagnostics
//!
//! Debugging and diagnostic tools for camrec.
//! Provides structured logging setup and session profiling.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod session_profiler;

// Re-export main types
pub use debug_logger::DebugLogger;
pub use session_profiler::{SessionProfiler, SessionStats};
