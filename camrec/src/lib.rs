//! # camrec - camera capture session controller
//!
//! camrec owns the lifecycle of a camera/microphone recording session on
//! top of a platform media framework. The framework sits behind two traits,
//! [`DeviceCatalog`] and [`MediaRuntime`]; the controller sequences calls to
//! them and exposes a small state machine to the presentation layer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use camrec::{CaptureSessionController, PreviewTarget};
//! use camrec_media::{SimulatedRuntime, StaticDeviceCatalog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut controller = CaptureSessionController::builder()
//!         .catalog(Arc::new(StaticDeviceCatalog::phone()))
//!         .runtime(Arc::new(SimulatedRuntime::new()))
//!         .build()?;
//!
//!     controller.prepare().await?;
//!     controller.display_preview(&PreviewTarget::new("viewfinder", 390.0, 844.0))?;
//!
//!     let path = controller.start_recording(|result| match result {
//!         Ok(artifact) => println!("Recorded {}", artifact.path.display()),
//!         Err(e) => eprintln!("Recording failed: {e}"),
//!     })?;
//!     println!("Writing to {}", path.display());
//!
//!     controller.stop_recording()?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use camrec_core::{
    CameraPosition, CaptureErrorKind, ConfigError, ConnectionCapabilities, ConnectionSettings,
    ControllerEvent, ControllerState, DeviceCatalog, DeviceInfo, DeviceKind, DevicePosition,
    DeviceSettings, FinishCallback, FocusMode, InputHandle, MediaRuntime, OutputHandle,
    PreviewError, PreviewHandle, PreviewSettings, PreviewTarget, RecordError, RecordingOutcome,
    RuntimeError, RuntimeResult, SessionHandle, SetupError, StabilizationMode, SwapError,
    VideoGravity, VideoOrientation,
};

#[cfg(feature = "media")]
pub use camrec_media::{SimulatedBehavior, SimulatedRuntime, StaticDeviceCatalog};

#[cfg(feature = "diagnostics")]
pub use camrec_diagnostics::{SessionProfiler, SessionStats};

// Public API modules
pub mod config;
pub mod controller;
pub mod recording;
pub mod session;

// Re-export main API types
pub use config::{ControllerConfig, SwapPolicy};
pub use controller::{CaptureSessionController, ControllerBuilder};
pub use recording::{CapturedArtifact, CompletionCallback, RecordingHandle};
pub use session::{AttachedInputs, DiscoveredDevices};
