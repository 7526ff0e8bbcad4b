//! Error types for camrec
//!
//! Every controller operation reports its own error family. All of them map
//! onto a single [`CaptureErrorKind`] so callers can branch on the kind
//! without caring which operation produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification shared by every controller error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureErrorKind {
    /// No camera was enumerated, or none for the preferred position
    NoCamerasAvailable,
    /// The session does not exist or is not running
    SessionMissing,
    /// The runtime rejected an input
    InputsInvalid,
    /// A recording is already in flight
    AlreadyCapturing,
    /// A preview surface is already bound
    PreviewAlreadyBound,
    /// The session is busy and cannot be reconfigured
    SessionAlreadyRunning,
    /// The runtime refused the requested operation
    InvalidOperation,
    /// Anything else
    Unknown,
}

impl CaptureErrorKind {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CaptureErrorKind::NoCamerasAvailable => "NO_CAMERAS_AVAILABLE",
            CaptureErrorKind::SessionMissing => "SESSION_MISSING",
            CaptureErrorKind::InputsInvalid => "INPUTS_INVALID",
            CaptureErrorKind::AlreadyCapturing => "ALREADY_CAPTURING",
            CaptureErrorKind::PreviewAlreadyBound => "PREVIEW_ALREADY_BOUND",
            CaptureErrorKind::SessionAlreadyRunning => "SESSION_ALREADY_RUNNING",
            CaptureErrorKind::InvalidOperation => "INVALID_OPERATION",
            CaptureErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.error_code())
    }
}

/// Failure reported by a [`crate::MediaRuntime`] or [`crate::DeviceCatalog`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Device enumeration failed
    #[error("Device enumeration failed: {reason}")]
    Enumeration {
        /// Failure reason
        reason: String,
    },

    /// An input could not be created for the device
    #[error("Cannot open input for device {device_id}: {reason}")]
    InputUnavailable {
        /// Device identifier
        device_id: String,
        /// Failure reason
        reason: String,
    },

    /// The device refused a configuration change
    #[error("Device {device_id} configuration failed: {reason}")]
    DeviceConfiguration {
        /// Device identifier
        device_id: String,
        /// Failure reason
        reason: String,
    },

    /// A handle did not belong to the runtime
    #[error("Unknown {what} handle: {id}")]
    UnknownHandle {
        /// Handle type
        what: &'static str,
        /// Raw handle value
        id: u64,
    },

    /// The runtime refused the operation in its current state
    #[error("Operation rejected: {operation}")]
    Rejected {
        /// Operation that was rejected
        operation: String,
    },

    /// I/O failure at the destination
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Io(err.to_string())
    }
}

/// Result type alias for collaborator calls
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors reported by `prepare`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Enumeration returned nothing usable
    #[error("No cameras available{}", .position.map(|p| format!(" for {p} position")).unwrap_or_default())]
    NoCamerasAvailable {
        /// Preferred position that had no device, if enumeration was not empty
        position: Option<crate::CameraPosition>,
    },

    /// The session rejected an input
    #[error("Session rejected input for {device_id}")]
    InputsInvalid {
        /// Device whose input was rejected
        device_id: String,
    },

    /// The session rejected the movie-file output
    #[error("Session rejected the movie file output")]
    OutputRejected,

    /// A recording is in flight; finish it before reconfiguring
    #[error("Session is busy recording")]
    SessionAlreadyRunning,

    /// Collaborator failure
    #[error("Setup failed: {0}")]
    Runtime(#[from] RuntimeError),

    /// The background setup task did not complete
    #[error("Setup task aborted: {reason}")]
    TaskAborted {
        /// Reason reported by the executor
        reason: String,
    },
}

impl SetupError {
    /// Error kind
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            SetupError::NoCamerasAvailable { .. } => CaptureErrorKind::NoCamerasAvailable,
            SetupError::InputsInvalid { .. } => CaptureErrorKind::InputsInvalid,
            SetupError::OutputRejected => CaptureErrorKind::InvalidOperation,
            SetupError::SessionAlreadyRunning => CaptureErrorKind::SessionAlreadyRunning,
            SetupError::Runtime(RuntimeError::InputUnavailable { .. }) => {
                CaptureErrorKind::InputsInvalid
            }
            SetupError::Runtime(RuntimeError::Rejected { .. }) => {
                CaptureErrorKind::InvalidOperation
            }
            SetupError::Runtime(_) | SetupError::TaskAborted { .. } => CaptureErrorKind::Unknown,
        }
    }
}

/// Errors reported by `display_preview`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    /// No running session to preview
    #[error("Capture session is missing or not running")]
    SessionMissing,

    /// A surface is already bound
    #[error("Preview surface {surface_id} is already bound")]
    PreviewAlreadyBound {
        /// Surface currently bound
        surface_id: String,
    },

    /// Collaborator failure
    #[error("Preview failed: {0}")]
    Runtime(#[from] RuntimeError),
}

impl PreviewError {
    /// Error kind
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            PreviewError::SessionMissing => CaptureErrorKind::SessionMissing,
            PreviewError::PreviewAlreadyBound { .. } => CaptureErrorKind::PreviewAlreadyBound,
            PreviewError::Runtime(RuntimeError::Rejected { .. }) => {
                CaptureErrorKind::InvalidOperation
            }
            PreviewError::Runtime(_) => CaptureErrorKind::Unknown,
        }
    }
}

/// Errors reported by `start_recording`, `stop_recording` and the completion callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// No running session to record from
    #[error("Capture session is missing or not running")]
    SessionMissing,

    /// A recording is already in flight
    #[error("Already capturing to {}", .path.display())]
    AlreadyCapturing {
        /// Destination of the active recording
        path: std::path::PathBuf,
    },

    /// The destination could not be prepared
    #[error("Cannot prepare destination {}: {reason}", .path.display())]
    Destination {
        /// Destination path or directory
        path: std::path::PathBuf,
        /// Failure reason
        reason: String,
    },

    /// The runtime finished the recording with an error
    #[error("Recording to {} failed: {reason}", .path.display())]
    Finished {
        /// Destination path
        path: std::path::PathBuf,
        /// Failure reason
        reason: String,
    },

    /// Collaborator failure
    #[error("Recording failed: {0}")]
    Runtime(#[from] RuntimeError),
}

impl RecordError {
    /// Error kind
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            RecordError::SessionMissing => CaptureErrorKind::SessionMissing,
            RecordError::AlreadyCapturing { .. } => CaptureErrorKind::AlreadyCapturing,
            RecordError::Runtime(RuntimeError::Rejected { .. }) => {
                CaptureErrorKind::InvalidOperation
            }
            RecordError::Destination { .. }
            | RecordError::Finished { .. }
            | RecordError::Runtime(_) => CaptureErrorKind::Unknown,
        }
    }
}

/// Errors reported by `swap_camera`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// No session to swap cameras on
    #[error("Capture session is missing")]
    SessionMissing,

    /// The new camera could not be attached
    #[error("Re-attaching the {position} camera failed: {source}")]
    Reattach {
        /// Position that was being attached
        position: crate::CameraPosition,
        /// Underlying setup failure
        source: SetupError,
    },
}

impl SwapError {
    /// Error kind
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            SwapError::SessionMissing => CaptureErrorKind::SessionMissing,
            SwapError::Reattach { source, .. } => source.kind(),
        }
    }
}

/// Errors reported while assembling a controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required collaborator was not supplied
    #[error("Missing required collaborator: {field}")]
    MissingCollaborator {
        /// Missing field
        field: &'static str,
    },

    /// A configuration value is out of range
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Error message
        message: String,
    },

    /// Configuration text could not be parsed
    #[error("Cannot parse configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CameraPosition;

    #[test]
    fn test_setup_error_kinds() {
        assert_eq!(
            SetupError::NoCamerasAvailable { position: None }.kind(),
            CaptureErrorKind::NoCamerasAvailable
        );
        assert_eq!(
            SetupError::OutputRejected.kind(),
            CaptureErrorKind::InvalidOperation
        );
        let unavailable = SetupError::from(RuntimeError::InputUnavailable {
            device_id: "mic".to_string(),
            reason: "busy".to_string(),
        });
        assert_eq!(unavailable.kind(), CaptureErrorKind::InputsInvalid);
        assert_eq!(
            SetupError::from(RuntimeError::Io("disk".to_string())).kind(),
            CaptureErrorKind::Unknown
        );
    }

    #[test]
    fn test_swap_error_inherits_kind() {
        let error = SwapError::Reattach {
            position: CameraPosition::Rear,
            source: SetupError::InputsInvalid {
                device_id: "rear".to_string(),
            },
        };
        assert_eq!(error.kind(), CaptureErrorKind::InputsInvalid);
    }

    #[test]
    fn test_error_display() {
        let error = SetupError::NoCamerasAvailable {
            position: Some(CameraPosition::Front),
        };
        assert_eq!(error.to_string(), "No cameras available for front position");
        assert_eq!(
            SetupError::NoCamerasAvailable { position: None }.to_string(),
            "No cameras available"
        );
        assert_eq!(CaptureErrorKind::AlreadyCapturing.to_string(), "ALREADY_CAPTURING");
    }

    #[test]
    fn test_runtime_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        match RuntimeError::from(io_error) {
            RuntimeError::Io(message) => assert!(message.contains("access denied")),
            other => panic!("Expected Io error variant, got {other:?}"),
        }
    }
}
