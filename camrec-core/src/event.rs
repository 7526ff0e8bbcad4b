//! Controller state and lifecycle events

use crate::device::CameraPosition;
use crate::error::CaptureErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a capture-session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ControllerState {
    /// No session exists
    #[default]
    Unconfigured,
    /// `prepare` is running
    Configuring,
    /// Session is running, nothing is being recorded
    Ready,
    /// Session is running and a recording is in flight
    Recording,
    /// The last `prepare` failed; prepare again to recover
    Failed(CaptureErrorKind),
}

impl ControllerState {
    /// Whether a running session is available
    pub fn has_session(&self) -> bool {
        matches!(self, ControllerState::Ready | ControllerState::Recording)
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Unconfigured => f.write_str("unconfigured"),
            ControllerState::Configuring => f.write_str("configuring"),
            ControllerState::Ready => f.write_str("ready"),
            ControllerState::Recording => f.write_str("recording"),
            ControllerState::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Events published by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The lifecycle state changed
    StateChanged {
        /// Previous state
        from: ControllerState,
        /// New state
        to: ControllerState,
    },
    /// `prepare` failed
    PrepareFailed {
        /// Failure kind
        kind: CaptureErrorKind,
    },
    /// A preview surface was bound
    PreviewBound {
        /// Surface identifier
        surface_id: String,
    },
    /// The preview surface was removed
    PreviewDetached {
        /// Surface identifier
        surface_id: String,
    },
    /// The runtime started writing a file
    RecordingStarted {
        /// Destination path
        path: PathBuf,
    },
    /// The runtime finalized a file
    RecordingFinished {
        /// Destination path
        path: PathBuf,
        /// Whether the writer reported success
        success: bool,
    },
    /// The active camera changed
    CameraSwapped {
        /// Camera now attached
        position: CameraPosition,
    },
    /// Re-attaching a camera after a swap failed
    SwapFailed {
        /// Failure kind
        kind: CaptureErrorKind,
    },
}

impl ControllerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ControllerEvent::StateChanged { .. } => "state_changed",
            ControllerEvent::PrepareFailed { .. } => "prepare_failed",
            ControllerEvent::PreviewBound { .. } => "preview_bound",
            ControllerEvent::PreviewDetached { .. } => "preview_detached",
            ControllerEvent::RecordingStarted { .. } => "recording_started",
            ControllerEvent::RecordingFinished { .. } => "recording_finished",
            ControllerEvent::CameraSwapped { .. } => "camera_swapped",
            ControllerEvent::SwapFailed { .. } => "swap_failed",
        }
    }

    /// Whether the event reports a failure
    pub fn is_failure(&self) -> bool {
        match self {
            ControllerEvent::PrepareFailed { .. } | ControllerEvent::SwapFailed { .. } => true,
            ControllerEvent::RecordingFinished { success, .. } => !success,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ControllerState::Ready.to_string(), "ready");
        assert_eq!(
            ControllerState::Failed(CaptureErrorKind::NoCamerasAvailable).to_string(),
            "failed(NO_CAMERAS_AVAILABLE)"
        );
    }

    #[test]
    fn test_state_serialization() {
        let state = ControllerState::Failed(CaptureErrorKind::InputsInvalid);
        let serialized = serde_json::to_string(&state).unwrap();
        assert_eq!(serialized, r#"{"state":"failed","reason":"inputs_invalid"}"#);
        let deserialized: ControllerState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, state);
    }

    #[test]
    fn test_event_classification() {
        let finished = ControllerEvent::RecordingFinished {
            path: PathBuf::from("/tmp/a.mp4"),
            success: false,
        };
        assert_eq!(finished.event_type(), "recording_finished");
        assert!(finished.is_failure());
        assert!(!ControllerEvent::CameraSwapped {
            position: CameraPosition::Rear
        }
        .is_failure());
        assert!(!ControllerState::Configuring.has_session());
        assert!(ControllerState::Recording.has_session());
    }
}
