//! Media Pipeline Runtime contract
//!
//! The runtime owns the real capture session, its inputs, the movie-file
//! writer and preview layers. The controller only holds opaque handles and
//! sequences calls; it never touches frames.

use crate::device::{DeviceInfo, DeviceSettings};
use crate::error::RuntimeResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Runtime capture session
    SessionHandle
);
handle!(
    /// Device input created for a session
    InputHandle
);
handle!(
    /// Movie-file output attached to a session
    OutputHandle
);
handle!(
    /// Preview layer bound to a session
    PreviewHandle
);

/// Orientation written into recorded video and previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOrientation {
    /// Upright portrait
    #[default]
    Portrait,
    /// Upside-down portrait
    PortraitUpsideDown,
    /// Home button on the right
    LandscapeRight,
    /// Home button on the left
    LandscapeLeft,
}

/// Video stabilization requested on the output connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizationMode {
    /// No stabilization
    Off,
    /// Standard stabilization
    Standard,
    /// Cinematic stabilization
    Cinematic,
    /// Let the runtime choose
    #[default]
    Auto,
}

/// How the preview fills its surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoGravity {
    /// Letterbox inside the surface
    ResizeAspect,
    /// Fill the surface, cropping as needed
    #[default]
    ResizeAspectFill,
    /// Stretch to the surface
    Resize,
}

/// What the output's video connection supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionCapabilities {
    /// Orientation can be set
    pub orientation: bool,
    /// Stabilization can be set
    pub stabilization: bool,
}

/// Settings applied to the output's video connection
///
/// `None` means "leave as is"; the controller only fills in what the
/// connection advertised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Orientation of recorded frames
    pub orientation: Option<VideoOrientation>,
    /// Preferred stabilization
    pub stabilization: Option<StabilizationMode>,
}

impl ConnectionSettings {
    /// Whether there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.orientation.is_none() && self.stabilization.is_none()
    }
}

/// Rendering target supplied by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewTarget {
    /// Identifier of the on-screen surface
    pub surface_id: String,
    /// Surface width in points
    pub width: f64,
    /// Surface height in points
    pub height: f64,
}

impl PreviewTarget {
    /// Target covering a surface of the given size
    pub fn new(surface_id: &str, width: f64, height: f64) -> Self {
        Self {
            surface_id: surface_id.to_string(),
            width,
            height,
        }
    }
}

/// How a preview layer is laid out on its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Fill behaviour
    pub gravity: VideoGravity,
    /// Preview orientation
    pub orientation: VideoOrientation,
}

/// What the runtime reports once a recording is finalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingOutcome {
    /// File the runtime wrote
    pub path: PathBuf,
    /// Failure reported by the writer, if any
    pub error: Option<String>,
}

/// Called exactly once per recording, possibly from a runtime thread
pub type FinishCallback = Box<dyn FnOnce(RecordingOutcome) + Send + 'static>;

/// Media Pipeline Runtime
///
/// Mirrors the accept/reject shape of platform capture frameworks: the
/// controller asks `can_add_*` before `add_*`. Implementations must not
/// invoke a [`FinishCallback`] while holding locks that other runtime methods
/// take.
pub trait MediaRuntime: Send + Sync {
    /// Create a new empty session
    fn create_session(&self) -> RuntimeResult<SessionHandle>;

    /// Apply settings to a device before an input is opened on it
    fn configure_device(&self, device: &DeviceInfo, settings: &DeviceSettings)
        -> RuntimeResult<()>;

    /// Open an input for the device
    fn create_input(&self, session: SessionHandle, device: &DeviceInfo)
        -> RuntimeResult<InputHandle>;

    /// Whether the session would accept the input
    fn can_add_input(&self, session: SessionHandle, input: InputHandle) -> bool;

    /// Attach an input
    fn add_input(&self, session: SessionHandle, input: InputHandle) -> RuntimeResult<()>;

    /// Detach an input; unknown inputs are ignored
    fn remove_input(&self, session: SessionHandle, input: InputHandle);

    /// Create a movie-file output
    fn create_movie_output(&self, session: SessionHandle) -> RuntimeResult<OutputHandle>;

    /// Whether the session would accept the output
    fn can_add_output(&self, session: SessionHandle, output: OutputHandle) -> bool;

    /// Attach an output
    fn add_output(&self, session: SessionHandle, output: OutputHandle) -> RuntimeResult<()>;

    /// Detach an output; unknown outputs are ignored
    fn remove_output(&self, session: SessionHandle, output: OutputHandle);

    /// Start the flow of data through the session
    fn start_running(&self, session: SessionHandle) -> RuntimeResult<()>;

    /// Stop the session; finalizes any recording on it
    fn stop_running(&self, session: SessionHandle);

    /// Release the session with everything created for it
    ///
    /// Finalizes any recording first. The handle is invalid afterwards.
    fn destroy_session(&self, session: SessionHandle);

    /// Whether the session is running
    fn is_running(&self, session: SessionHandle) -> bool;

    /// What the output's video connection supports
    fn connection_capabilities(&self, output: OutputHandle) -> ConnectionCapabilities;

    /// Apply settings to the output's video connection
    fn apply_connection_settings(
        &self,
        output: OutputHandle,
        settings: &ConnectionSettings,
    ) -> RuntimeResult<()>;

    /// Begin writing to `path`; `on_finish` fires once when the file is finalized
    fn start_recording(
        &self,
        output: OutputHandle,
        path: &Path,
        on_finish: FinishCallback,
    ) -> RuntimeResult<()>;

    /// Finalize the active recording on the output
    fn stop_recording(&self, output: OutputHandle) -> RuntimeResult<()>;

    /// Whether the output is writing
    fn is_recording(&self, output: OutputHandle) -> bool;

    /// Bind a live preview of the session to a surface
    fn bind_preview(
        &self,
        session: SessionHandle,
        target: &PreviewTarget,
        settings: &PreviewSettings,
    ) -> RuntimeResult<PreviewHandle>;

    /// Remove a preview layer; unknown handles are ignored
    fn unbind_preview(&self, preview: PreviewHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(SessionHandle(3).to_string(), "SessionHandle#3");
        assert_eq!(OutputHandle(12).to_string(), "OutputHandle#12");
    }

    #[test]
    fn test_connection_settings_empty() {
        assert!(ConnectionSettings::default().is_empty());
        let settings = ConnectionSettings {
            orientation: Some(VideoOrientation::Portrait),
            stabilization: None,
        };
        assert!(!settings.is_empty());
    }

    #[test]
    fn test_defaults_match_portrait_fill() {
        let settings = PreviewSettings::default();
        assert_eq!(settings.gravity, VideoGravity::ResizeAspectFill);
        assert_eq!(settings.orientation, VideoOrientation::Portrait);
        assert_eq!(StabilizationMode::default(), StabilizationMode::Auto);
    }
}
