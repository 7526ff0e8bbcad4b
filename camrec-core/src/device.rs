//! Device enumeration types
//!
//! The controller never talks to hardware directly. It asks a
//! [`DeviceCatalog`] for the cameras and microphones present and hands the
//! descriptors back to the runtime when wiring inputs.

use crate::error::RuntimeResult;
use serde::{Deserialize, Serialize};

/// Physical placement reported by the enumeration service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    /// Facing the user
    Front,
    /// Facing away from the user
    Back,
    /// Position not reported (external devices, microphones)
    Unspecified,
}

/// What a device captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Video capture device
    Camera,
    /// Audio capture device
    Microphone,
}

/// Which camera the controller records from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    /// Front camera
    #[default]
    Front,
    /// Rear camera
    Rear,
}

impl CameraPosition {
    /// The other camera
    pub fn flipped(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Rear,
            CameraPosition::Rear => CameraPosition::Front,
        }
    }

    /// Device position this selection maps to
    pub fn device_position(self) -> DevicePosition {
        match self {
            CameraPosition::Front => DevicePosition::Front,
            CameraPosition::Rear => DevicePosition::Back,
        }
    }
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Front => f.write_str("front"),
            CameraPosition::Rear => f.write_str("rear"),
        }
    }
}

/// Focus behaviour requested from a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    /// Lock focus at the current lens position
    Locked,
    /// Focus once, then hold
    AutoFocus,
    /// Keep refocusing as the scene changes
    #[default]
    ContinuousAutoFocus,
}

/// Settings applied to a device before inputs are created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Focus behaviour
    pub focus_mode: FocusMode,
}

/// Descriptor of an enumerated device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identifier understood by the runtime
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Capture kind
    pub kind: DeviceKind,
    /// Physical placement
    pub position: DevicePosition,
}

impl DeviceInfo {
    /// Camera descriptor
    pub fn camera(id: &str, name: &str, position: DevicePosition) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: DeviceKind::Camera,
            position,
        }
    }

    /// Microphone descriptor
    pub fn microphone(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: DeviceKind::Microphone,
            position: DevicePosition::Unspecified,
        }
    }

    /// Whether this is a camera at the given position
    pub fn is_camera_at(&self, position: CameraPosition) -> bool {
        self.kind == DeviceKind::Camera && self.position == position.device_position()
    }
}

/// Device Enumeration Service
///
/// Consumed once per `prepare`. Implementations must be cheap to call from a
/// blocking background thread.
pub trait DeviceCatalog: Send + Sync {
    /// Every camera and microphone currently available
    fn devices(&self) -> RuntimeResult<Vec<DeviceInfo>>;

    /// The system default microphone, if the catalog distinguishes one
    fn default_microphone(&self) -> RuntimeResult<Option<DeviceInfo>> {
        Ok(self
            .devices()?
            .into_iter()
            .find(|device| device.kind == DeviceKind::Microphone))
    }
}
