//! Capture session wiring
//!
//! Everything here runs on the blocking background context. The functions
//! talk only to the collaborator traits and return plain values, so the
//! controller can move their results back onto its own task.

use crate::config::ControllerConfig;
use camrec_core::{
    CameraPosition, DeviceCatalog, DeviceInfo, DeviceKind, DevicePosition, DeviceSettings,
    InputHandle, MediaRuntime, OutputHandle, SessionHandle, SetupError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Devices picked during discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredDevices {
    /// Front-facing camera
    pub front: Option<DeviceInfo>,
    /// Rear-facing camera
    pub rear: Option<DeviceInfo>,
    /// Audio device
    pub microphone: Option<DeviceInfo>,
}

impl DiscoveredDevices {
    /// Camera for the given position
    pub fn camera(&self, position: CameraPosition) -> Option<&DeviceInfo> {
        match position {
            CameraPosition::Front => self.front.as_ref(),
            CameraPosition::Rear => self.rear.as_ref(),
        }
    }
}

/// Which camera input is attached to the session
///
/// Only one camera can be wired at a time, so the two inputs share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachedInputs {
    /// No camera attached
    #[default]
    None,
    /// Front camera attached
    Front(InputHandle),
    /// Rear camera attached
    Rear(InputHandle),
}

impl AttachedInputs {
    fn at(position: CameraPosition, input: InputHandle) -> Self {
        match position {
            CameraPosition::Front => AttachedInputs::Front(input),
            CameraPosition::Rear => AttachedInputs::Rear(input),
        }
    }

    /// Position of the attached camera
    pub fn position(&self) -> Option<CameraPosition> {
        match self {
            AttachedInputs::None => None,
            AttachedInputs::Front(_) => Some(CameraPosition::Front),
            AttachedInputs::Rear(_) => Some(CameraPosition::Rear),
        }
    }

    /// Input handle of the attached camera
    pub fn input(&self) -> Option<InputHandle> {
        match self {
            AttachedInputs::None => None,
            AttachedInputs::Front(input) | AttachedInputs::Rear(input) => Some(*input),
        }
    }
}

/// A configured runtime session and everything wired into it
///
/// Dropping a `Session` tears it down: the output, both inputs and the
/// runtime session itself are released, so a session built for a caller
/// that went away does not keep running.
pub(crate) struct Session {
    runtime: Arc<dyn MediaRuntime>,
    handle: SessionHandle,
    devices: DiscoveredDevices,
    audio_input: Option<InputHandle>,
    video: AttachedInputs,
    output: Option<OutputHandle>,
    released: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("devices", &self.devices)
            .field("audio_input", &self.audio_input)
            .field("video", &self.video)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create, wire and start a session
    ///
    /// On failure everything attached so far is removed again.
    pub(crate) fn configure(
        runtime: Arc<dyn MediaRuntime>,
        catalog: &dyn DeviceCatalog,
        config: &ControllerConfig,
        preferred: CameraPosition,
    ) -> Result<Session, SetupError> {
        let handle = runtime.create_session()?;
        debug!("Created {}", handle);

        let mut session = Session {
            runtime,
            handle,
            devices: DiscoveredDevices::default(),
            audio_input: None,
            video: AttachedInputs::None,
            output: None,
            released: false,
        };

        match session.build(catalog, config, preferred) {
            Ok(()) => Ok(session),
            Err(e) => {
                warn!("Session setup failed: {}", e);
                session.teardown();
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        catalog: &dyn DeviceCatalog,
        config: &ControllerConfig,
        preferred: CameraPosition,
    ) -> Result<(), SetupError> {
        let runtime = Arc::clone(&self.runtime);
        self.devices = discover_devices(runtime.as_ref(), catalog, config)?;
        self.attach_microphone(runtime.as_ref(), config)?;
        self.video = attach_camera(
            runtime.as_ref(),
            self.handle,
            self.devices.camera(preferred),
            preferred,
        )?;

        let output = runtime.create_movie_output(self.handle)?;
        if !runtime.can_add_output(self.handle, output) {
            runtime.remove_output(self.handle, output);
            return Err(SetupError::OutputRejected);
        }
        if let Err(e) = runtime.add_output(self.handle, output) {
            runtime.remove_output(self.handle, output);
            return Err(e.into());
        }
        self.output = Some(output);

        runtime.start_running(self.handle)?;
        info!("{} running with {} camera", self.handle, preferred);
        Ok(())
    }

    fn attach_microphone(
        &mut self,
        runtime: &dyn MediaRuntime,
        config: &ControllerConfig,
    ) -> Result<(), SetupError> {
        let Some(microphone) = self.devices.microphone.as_ref() else {
            if config.require_microphone {
                return Err(SetupError::InputsInvalid {
                    device_id: "default microphone".to_string(),
                });
            }
            warn!("No microphone available; recording without audio");
            return Ok(());
        };

        self.audio_input = Some(add_device_input(runtime, self.handle, microphone)?);
        Ok(())
    }

    /// Detach the camera input, returning the position it had
    pub(crate) fn detach_camera(&mut self) -> Option<CameraPosition> {
        let position = self.video.position();
        if let Some(input) = self.video.input() {
            self.runtime.remove_input(self.handle, input);
        }
        self.video = AttachedInputs::None;
        position
    }

    /// Remove every input and output and release the runtime session
    ///
    /// Safe to call more than once; only the first call reaches the runtime.
    pub(crate) fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(output) = self.output.take() {
            self.runtime.remove_output(self.handle, output);
        }
        if let Some(input) = self.audio_input.take() {
            self.runtime.remove_input(self.handle, input);
        }
        if let Some(input) = std::mem::take(&mut self.video).input() {
            self.runtime.remove_input(self.handle, input);
        }
        self.runtime.stop_running(self.handle);
        self.runtime.destroy_session(self.handle);
        debug!("Tore down {}", self.handle);
    }

    pub(crate) fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub(crate) fn devices(&self) -> &DiscoveredDevices {
        &self.devices
    }

    pub(crate) fn video(&self) -> AttachedInputs {
        self.video
    }

    pub(crate) fn set_video(&mut self, video: AttachedInputs) {
        self.video = video;
    }

    pub(crate) fn output(&self) -> Option<OutputHandle> {
        self.output
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// A camera input attached off the owning task
///
/// Detached again on drop unless [`PendingCamera::claim`] handed it to a
/// [`Session`], so an abandoned swap does not leave an untracked input wired.
pub(crate) struct PendingCamera {
    runtime: Arc<dyn MediaRuntime>,
    session: SessionHandle,
    attached: AttachedInputs,
}

impl PendingCamera {
    /// Open and attach the camera for `position`
    pub(crate) fn attach(
        runtime: Arc<dyn MediaRuntime>,
        session: SessionHandle,
        device: Option<&DeviceInfo>,
        position: CameraPosition,
    ) -> Result<Self, SetupError> {
        let attached = attach_camera(runtime.as_ref(), session, device, position)?;
        Ok(Self {
            runtime,
            session,
            attached,
        })
    }

    /// Take ownership of the attached input
    pub(crate) fn claim(mut self) -> AttachedInputs {
        std::mem::take(&mut self.attached)
    }
}

impl Drop for PendingCamera {
    fn drop(&mut self) {
        if let Some(input) = self.attached.input() {
            warn!("Detaching unclaimed camera input {} from {}", input, self.session);
            self.runtime.remove_input(self.session, input);
        }
    }
}

/// Enumerate devices and pick one per role
pub(crate) fn discover_devices(
    runtime: &dyn MediaRuntime,
    catalog: &dyn DeviceCatalog,
    config: &ControllerConfig,
) -> Result<DiscoveredDevices, SetupError> {
    let devices = catalog.devices()?;
    if devices.is_empty() {
        return Err(SetupError::NoCamerasAvailable { position: None });
    }

    let mut discovered = DiscoveredDevices::default();
    for device in devices.iter().filter(|d| d.kind == DeviceKind::Camera) {
        match device.position {
            DevicePosition::Front if discovered.front.is_none() => {
                discovered.front = Some(device.clone());
            }
            DevicePosition::Back if discovered.rear.is_none() => {
                runtime.configure_device(
                    device,
                    &DeviceSettings {
                        focus_mode: config.rear_focus_mode,
                    },
                )?;
                discovered.rear = Some(device.clone());
            }
            _ => {}
        }
    }
    discovered.microphone = catalog.default_microphone()?;

    debug!(
        "Discovered front={} rear={} microphone={}",
        discovered.front.is_some(),
        discovered.rear.is_some(),
        discovered.microphone.is_some()
    );
    Ok(discovered)
}

/// Open and attach the camera for `position`
pub(crate) fn attach_camera(
    runtime: &dyn MediaRuntime,
    session: SessionHandle,
    device: Option<&DeviceInfo>,
    position: CameraPosition,
) -> Result<AttachedInputs, SetupError> {
    let device = device.ok_or(SetupError::NoCamerasAvailable {
        position: Some(position),
    })?;

    let input = add_device_input(runtime, session, device)?;
    debug!("Attached {} camera {}", position, device.id);
    Ok(AttachedInputs::at(position, input))
}

/// Open an input for `device` and wire it in; nothing is left behind on failure
fn add_device_input(
    runtime: &dyn MediaRuntime,
    session: SessionHandle,
    device: &DeviceInfo,
) -> Result<InputHandle, SetupError> {
    let input = runtime.create_input(session, device)?;
    if !runtime.can_add_input(session, input) {
        runtime.remove_input(session, input);
        return Err(SetupError::InputsInvalid {
            device_id: device.id.clone(),
        });
    }
    if let Err(e) = runtime.add_input(session, input) {
        runtime.remove_input(session, input);
        return Err(e.into());
    }
    Ok(input)
}
