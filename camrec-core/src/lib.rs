//! # camrec core
//!
//! Collaborator contracts for the camrec capture-session controller: the
//! device enumeration service, the media pipeline runtime, the error
//! families every operation reports, and the controller's lifecycle events.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod event;
pub mod runtime;

// Re-export main types
pub use device::{
    CameraPosition, DeviceCatalog, DeviceInfo, DeviceKind, DevicePosition, DeviceSettings,
    FocusMode,
};
pub use error::{
    CaptureErrorKind, ConfigError, PreviewError, RecordError, RuntimeError, RuntimeResult,
    SetupError, SwapError,
};
pub use event::{ControllerEvent, ControllerState};
pub use runtime::{
    ConnectionCapabilities, ConnectionSettings, FinishCallback, InputHandle, MediaRuntime,
    OutputHandle, PreviewHandle, PreviewSettings, PreviewTarget, RecordingOutcome, SessionHandle,
    StabilizationMode, VideoGravity, VideoOrientation,
};
