//! Fixed device catalog
//!
//! Serves a device list configured up front. Used on hosts without a native
//! enumeration service, in demos and in tests.

use camrec_core::{DeviceCatalog, DeviceInfo, DevicePosition, RuntimeError, RuntimeResult};
use parking_lot::RwLock;
use tracing::debug;

/// Device catalog backed by an in-memory list
#[derive(Debug, Default)]
pub struct StaticDeviceCatalog {
    devices: RwLock<Vec<DeviceInfo>>,
    failure: RwLock<Option<String>>,
}

impl StaticDeviceCatalog {
    /// Catalog serving exactly these devices
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices: RwLock::new(devices),
            failure: RwLock::new(None),
        }
    }

    /// Front camera, rear camera and a built-in microphone
    pub fn phone() -> Self {
        Self::new(vec![
            front_camera(),
            rear_camera(),
            DeviceInfo::microphone("builtin-mic", "Built-in Microphone"),
        ])
    }

    /// Front camera and microphone only
    pub fn front_only() -> Self {
        Self::new(vec![
            front_camera(),
            DeviceInfo::microphone("builtin-mic", "Built-in Microphone"),
        ])
    }

    /// Rear camera and microphone only
    pub fn rear_only() -> Self {
        Self::new(vec![
            rear_camera(),
            DeviceInfo::microphone("builtin-mic", "Built-in Microphone"),
        ])
    }

    /// No devices at all
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Replace the device list
    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        *self.devices.write() = devices;
    }

    /// Make every enumeration fail with `reason`; `None` restores normal operation
    pub fn set_failure(&self, reason: Option<&str>) {
        *self.failure.write() = reason.map(str::to_string);
    }
}

fn front_camera() -> DeviceInfo {
    DeviceInfo::camera("front-wide", "Front Camera", DevicePosition::Front)
}

fn rear_camera() -> DeviceInfo {
    DeviceInfo::camera("back-wide", "Back Camera", DevicePosition::Back)
}

impl DeviceCatalog for StaticDeviceCatalog {
    fn devices(&self) -> RuntimeResult<Vec<DeviceInfo>> {
        if let Some(reason) = self.failure.read().clone() {
            return Err(RuntimeError::Enumeration { reason });
        }
        let devices = self.devices.read().clone();
        debug!("Enumerated {} devices", devices.len());
        Ok(devices)
    }
}
