//! Configuration types and defaults

use camrec_core::{
    CameraPosition, ConfigError, FocusMode, PreviewSettings, StabilizationMode, VideoGravity,
    VideoOrientation,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What `swap_camera` does when the new camera cannot be attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPolicy {
    /// Report the failure to the caller
    #[default]
    Strict,
    /// Log the failure and report success, leaving no camera attached
    BestEffort,
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Camera used by the first `prepare`
    pub preferred_camera: CameraPosition,
    /// Directory recordings are written to; the system temp dir when unset
    pub output_dir: Option<PathBuf>,
    /// Extension of recorded files, without the dot
    pub file_extension: String,
    /// Orientation applied to recordings when the connection supports it
    pub video_orientation: VideoOrientation,
    /// Stabilization applied to recordings when the connection supports it
    pub stabilization: StabilizationMode,
    /// How previews fill their surface
    pub preview_gravity: VideoGravity,
    /// Focus mode set on the rear camera during discovery
    pub rear_focus_mode: FocusMode,
    /// Fail `prepare` when no microphone is present
    pub require_microphone: bool,
    /// Swap re-attachment failure handling
    pub swap_policy: SwapPolicy,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            preferred_camera: CameraPosition::Front,
            output_dir: None,
            file_extension: "mp4".to_string(),
            video_orientation: VideoOrientation::Portrait,
            stabilization: StabilizationMode::Auto,
            preview_gravity: VideoGravity::ResizeAspectFill,
            rear_focus_mode: FocusMode::ContinuousAutoFocus,
            require_microphone: false,
            swap_policy: SwapPolicy::Strict,
            event_capacity: 100,
        }
    }
}

impl ControllerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_extension.is_empty() {
            return Err(ConfigError::Invalid {
                message: "file extension must not be empty".to_string(),
            });
        }

        if self
            .file_extension
            .chars()
            .any(|c| c == '.' || std::path::is_separator(c))
        {
            return Err(ConfigError::Invalid {
                message: format!("invalid file extension: {}", self.file_extension),
            });
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "event capacity must be > 0".to_string(),
            });
        }

        Ok(())
    }

    /// Directory new recordings land in
    pub fn output_directory(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Preview layout derived from this configuration
    pub fn preview_settings(&self) -> PreviewSettings {
        PreviewSettings {
            gravity: self.preview_gravity,
            orientation: self.video_orientation,
        }
    }
}
