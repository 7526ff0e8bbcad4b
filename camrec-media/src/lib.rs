//! # camrec media
//!
//! Backends for the camrec collaborator traits. Native framework bindings
//! plug in behind the same traits; this crate ships the in-memory backend
//! used on hosts without one, in demos and in tests.

#![warn(clippy::all)]

pub mod catalog;
pub mod runtime;

// Re-export main types
pub use catalog::StaticDeviceCatalog;
pub use runtime::{SimulatedBehavior, SimulatedRuntime};
