//! In-memory media runtime
//!
//! Behaves like a platform capture framework at the level the controller can
//! observe: handles, accept/reject answers, running state, and one finish
//! callback per recording. No frames flow; recordings produce empty files.

use camrec_core::{
    ConnectionCapabilities, ConnectionSettings, DeviceInfo, DeviceKind, DevicePosition,
    DeviceSettings, FinishCallback, InputHandle, MediaRuntime, OutputHandle, PreviewHandle,
    PreviewSettings, PreviewTarget, RecordingOutcome, RuntimeError, RuntimeResult, SessionHandle,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Knobs controlling how the simulated runtime answers
#[derive(Debug, Clone)]
pub struct SimulatedBehavior {
    /// Camera positions whose inputs `can_add_input` refuses
    pub rejected_camera_positions: HashSet<DevicePosition>,
    /// Refuse microphone inputs
    pub reject_microphone: bool,
    /// Fail `create_input` for cameras at these positions
    pub unavailable_camera_positions: HashSet<DevicePosition>,
    /// Refuse the movie-file output
    pub reject_output: bool,
    /// Fail `start_running`
    pub fail_start: bool,
    /// Fail `configure_device`
    pub fail_device_configuration: bool,
    /// Capabilities of every output's video connection
    pub capabilities: ConnectionCapabilities,
    /// Writer error reported when a recording finishes
    pub finish_error: Option<String>,
    /// Create the destination file when recording starts
    pub write_files: bool,
}

impl Default for SimulatedBehavior {
    fn default() -> Self {
        Self {
            rejected_camera_positions: HashSet::new(),
            reject_microphone: false,
            unavailable_camera_positions: HashSet::new(),
            reject_output: false,
            fail_start: false,
            fail_device_configuration: false,
            capabilities: ConnectionCapabilities {
                orientation: true,
                stabilization: true,
            },
            finish_error: None,
            write_files: true,
        }
    }
}

#[derive(Debug, Default)]
struct SessionRecord {
    inputs: Vec<InputHandle>,
    outputs: Vec<OutputHandle>,
    running: bool,
}

#[derive(Debug)]
struct InputRecord {
    session: SessionHandle,
    device: DeviceInfo,
}

struct ActiveRecording {
    path: PathBuf,
    on_finish: FinishCallback,
}

#[derive(Default)]
struct OutputRecord {
    session: Option<SessionHandle>,
    owner: Option<SessionHandle>,
    settings: ConnectionSettings,
    recording: Option<ActiveRecording>,
}

#[derive(Debug)]
struct PreviewRecord {
    session: SessionHandle,
    target: PreviewTarget,
    settings: PreviewSettings,
}

#[derive(Default)]
struct RuntimeInner {
    behavior: SimulatedBehavior,
    sessions: HashMap<SessionHandle, SessionRecord>,
    inputs: HashMap<InputHandle, InputRecord>,
    outputs: HashMap<OutputHandle, OutputRecord>,
    previews: HashMap<PreviewHandle, PreviewRecord>,
    configured_devices: HashMap<String, DeviceSettings>,
    sessions_created: u64,
    recordings_started: u64,
}

impl RuntimeInner {
    fn session(&self, session: SessionHandle) -> RuntimeResult<&SessionRecord> {
        self.sessions.get(&session).ok_or(RuntimeError::UnknownHandle {
            what: "session",
            id: session.0,
        })
    }

    fn session_mut(&mut self, session: SessionHandle) -> RuntimeResult<&mut SessionRecord> {
        self.sessions
            .get_mut(&session)
            .ok_or(RuntimeError::UnknownHandle {
                what: "session",
                id: session.0,
            })
    }

    fn output_mut(&mut self, output: OutputHandle) -> RuntimeResult<&mut OutputRecord> {
        self.outputs
            .get_mut(&output)
            .ok_or(RuntimeError::UnknownHandle {
                what: "output",
                id: output.0,
            })
    }

    fn attached_camera(&self, session: SessionHandle) -> Option<&DeviceInfo> {
        let record = self.sessions.get(&session)?;
        record
            .inputs
            .iter()
            .filter_map(|input| self.inputs.get(input))
            .map(|input| &input.device)
            .find(|device| device.kind == DeviceKind::Camera)
    }

    /// Detach the active recording of every output on `session`
    fn take_session_recordings(&mut self, session: SessionHandle) -> Vec<ActiveRecording> {
        let Some(record) = self.sessions.get(&session) else {
            return Vec::new();
        };
        let outputs = record.outputs.clone();
        outputs
            .iter()
            .filter_map(|output| {
                self.outputs
                    .get_mut(output)
                    .and_then(|record| record.recording.take())
            })
            .collect()
    }
}

/// Media runtime that keeps all state in memory
pub struct SimulatedRuntime {
    inner: Mutex<RuntimeInner>,
    next_handle: AtomicU64,
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimulatedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SimulatedRuntime")
            .field("sessions", &inner.sessions.len())
            .field("inputs", &inner.inputs.len())
            .field("outputs", &inner.outputs.len())
            .field("previews", &inner.previews.len())
            .finish()
    }
}

impl SimulatedRuntime {
    /// Runtime that accepts everything
    pub fn new() -> Self {
        Self::with_behavior(SimulatedBehavior::default())
    }

    /// Runtime with the given behavior
    pub fn with_behavior(behavior: SimulatedBehavior) -> Self {
        Self {
            inner: Mutex::new(RuntimeInner {
                behavior,
                ..RuntimeInner::default()
            }),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Change the behavior in place
    pub fn update_behavior(&self, update: impl FnOnce(&mut SimulatedBehavior)) {
        update(&mut self.inner.lock().behavior);
    }

    fn next_id(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Devices whose inputs are attached to the session
    pub fn attached_devices(&self, session: SessionHandle) -> Vec<DeviceInfo> {
        let inner = self.inner.lock();
        inner
            .sessions
            .get(&session)
            .map(|record| {
                record
                    .inputs
                    .iter()
                    .filter_map(|input| inner.inputs.get(input))
                    .map(|input| input.device.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total inputs attached across every session
    pub fn attached_input_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.sessions.values().map(|s| s.inputs.len()).sum()
    }

    /// Total outputs attached across every session
    pub fn attached_output_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.sessions.values().map(|s| s.outputs.len()).sum()
    }

    /// Number of sessions currently running
    pub fn running_session_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.sessions.values().filter(|s| s.running).count()
    }

    /// Settings last applied to the output's connection
    pub fn connection_settings(&self, output: OutputHandle) -> Option<ConnectionSettings> {
        let inner = self.inner.lock();
        inner.outputs.get(&output).map(|record| record.settings)
    }

    /// Connection settings of every attached output
    pub fn applied_connection_settings(&self) -> Vec<ConnectionSettings> {
        let inner = self.inner.lock();
        inner
            .outputs
            .values()
            .filter(|record| record.session.is_some())
            .map(|record| record.settings)
            .collect()
    }

    /// Targets of every bound preview
    pub fn bound_previews(&self) -> Vec<(PreviewTarget, PreviewSettings)> {
        let inner = self.inner.lock();
        inner
            .previews
            .values()
            .map(|record| (record.target.clone(), record.settings))
            .collect()
    }

    /// Current settings of every device passed to `configure_device`, by id
    pub fn configured_devices(&self) -> Vec<(String, DeviceSettings)> {
        let mut devices: Vec<_> = self
            .inner
            .lock()
            .configured_devices
            .iter()
            .map(|(id, settings)| (id.clone(), *settings))
            .collect();
        devices.sort_by(|a, b| a.0.cmp(&b.0));
        devices
    }

    /// Sessions created over the runtime's lifetime
    pub fn sessions_created(&self) -> u64 {
        self.inner.lock().sessions_created
    }

    /// Sessions not yet destroyed
    pub fn live_session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// Input records held, attached or not
    pub fn open_input_count(&self) -> usize {
        self.inner.lock().inputs.len()
    }

    /// Recordings started over the runtime's lifetime
    pub fn recordings_started(&self) -> u64 {
        self.inner.lock().recordings_started
    }

    fn finish(&self, recordings: Vec<ActiveRecording>) {
        let error = self.inner.lock().behavior.finish_error.clone();
        for recording in recordings {
            info!("Finalized recording at {}", recording.path.display());
            (recording.on_finish)(RecordingOutcome {
                path: recording.path,
                error: error.clone(),
            });
        }
    }
}

impl MediaRuntime for SimulatedRuntime {
    fn create_session(&self) -> RuntimeResult<SessionHandle> {
        let handle = SessionHandle(self.next_id());
        let mut inner = self.inner.lock();
        inner.sessions.insert(handle, SessionRecord::default());
        inner.sessions_created += 1;
        debug!("Created {}", handle);
        Ok(handle)
    }

    fn configure_device(
        &self,
        device: &DeviceInfo,
        settings: &DeviceSettings,
    ) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        if inner.behavior.fail_device_configuration {
            return Err(RuntimeError::DeviceConfiguration {
                device_id: device.id.clone(),
                reason: "device is locked by another client".to_string(),
            });
        }
        inner
            .configured_devices
            .insert(device.id.clone(), *settings);
        Ok(())
    }

    fn create_input(
        &self,
        session: SessionHandle,
        device: &DeviceInfo,
    ) -> RuntimeResult<InputHandle> {
        let mut inner = self.inner.lock();
        inner.session(session)?;
        if device.kind == DeviceKind::Camera
            && inner
                .behavior
                .unavailable_camera_positions
                .contains(&device.position)
        {
            return Err(RuntimeError::InputUnavailable {
                device_id: device.id.clone(),
                reason: "camera in use".to_string(),
            });
        }
        let handle = InputHandle(self.next_id());
        inner.inputs.insert(
            handle,
            InputRecord {
                session,
                device: device.clone(),
            },
        );
        Ok(handle)
    }

    fn can_add_input(&self, session: SessionHandle, input: InputHandle) -> bool {
        let inner = self.inner.lock();
        let Ok(record) = inner.session(session) else {
            return false;
        };
        let Some(input_record) = inner.inputs.get(&input) else {
            return false;
        };
        if input_record.session != session || record.inputs.contains(&input) {
            return false;
        }
        let device = &input_record.device;
        match device.kind {
            DeviceKind::Microphone => !inner.behavior.reject_microphone,
            DeviceKind::Camera => {
                // one camera per session
                !inner
                    .behavior
                    .rejected_camera_positions
                    .contains(&device.position)
                    && inner.attached_camera(session).is_none()
            }
        }
    }

    fn add_input(&self, session: SessionHandle, input: InputHandle) -> RuntimeResult<()> {
        if !self.can_add_input(session, input) {
            return Err(RuntimeError::Rejected {
                operation: format!("add {input} to {session}"),
            });
        }
        self.inner.lock().session_mut(session)?.inputs.push(input);
        Ok(())
    }

    fn remove_input(&self, session: SessionHandle, input: InputHandle) {
        let mut inner = self.inner.lock();
        if let Ok(record) = inner.session_mut(session) {
            record.inputs.retain(|attached| *attached != input);
        }
        inner.inputs.remove(&input);
    }

    fn create_movie_output(&self, session: SessionHandle) -> RuntimeResult<OutputHandle> {
        let mut inner = self.inner.lock();
        inner.session(session)?;
        let handle = OutputHandle(self.next_id());
        inner.outputs.insert(
            handle,
            OutputRecord {
                owner: Some(session),
                ..OutputRecord::default()
            },
        );
        Ok(handle)
    }

    fn can_add_output(&self, session: SessionHandle, output: OutputHandle) -> bool {
        let inner = self.inner.lock();
        if inner.behavior.reject_output || inner.session(session).is_err() {
            return false;
        }
        matches!(
            inner.outputs.get(&output),
            Some(record) if record.owner == Some(session) && record.session.is_none()
        )
    }

    fn add_output(&self, session: SessionHandle, output: OutputHandle) -> RuntimeResult<()> {
        if !self.can_add_output(session, output) {
            return Err(RuntimeError::Rejected {
                operation: format!("add {output} to {session}"),
            });
        }
        let mut inner = self.inner.lock();
        inner.output_mut(output)?.session = Some(session);
        inner.session_mut(session)?.outputs.push(output);
        Ok(())
    }

    fn remove_output(&self, session: SessionHandle, output: OutputHandle) {
        let recording = {
            let mut inner = self.inner.lock();
            if let Ok(record) = inner.session_mut(session) {
                record.outputs.retain(|attached| *attached != output);
            }
            inner
                .outputs
                .remove(&output)
                .and_then(|record| record.recording)
        };
        if let Some(recording) = recording {
            warn!("Output removed while recording; finalizing");
            self.finish(vec![recording]);
        }
    }

    fn start_running(&self, session: SessionHandle) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        if inner.behavior.fail_start {
            return Err(RuntimeError::Rejected {
                operation: format!("start {session}"),
            });
        }
        inner.session_mut(session)?.running = true;
        info!("{} running", session);
        Ok(())
    }

    fn stop_running(&self, session: SessionHandle) {
        let recordings = {
            let mut inner = self.inner.lock();
            let recordings = inner.take_session_recordings(session);
            if let Ok(record) = inner.session_mut(session) {
                record.running = false;
            }
            inner.previews.retain(|_, preview| preview.session != session);
            recordings
        };
        info!("{} stopped", session);
        self.finish(recordings);
    }

    fn destroy_session(&self, session: SessionHandle) {
        let recordings = {
            let mut inner = self.inner.lock();
            let recordings = inner.take_session_recordings(session);
            inner.sessions.remove(&session);
            inner.inputs.retain(|_, input| input.session != session);
            inner.outputs.retain(|_, output| output.owner != Some(session));
            inner.previews.retain(|_, preview| preview.session != session);
            recordings
        };
        debug!("Destroyed {}", session);
        self.finish(recordings);
    }

    fn is_running(&self, session: SessionHandle) -> bool {
        self.inner
            .lock()
            .session(session)
            .map(|record| record.running)
            .unwrap_or(false)
    }

    fn connection_capabilities(&self, _output: OutputHandle) -> ConnectionCapabilities {
        self.inner.lock().behavior.capabilities
    }

    fn apply_connection_settings(
        &self,
        output: OutputHandle,
        settings: &ConnectionSettings,
    ) -> RuntimeResult<()> {
        let mut inner = self.inner.lock();
        let capabilities = inner.behavior.capabilities;
        if (settings.orientation.is_some() && !capabilities.orientation)
            || (settings.stabilization.is_some() && !capabilities.stabilization)
        {
            return Err(RuntimeError::Rejected {
                operation: format!("apply unsupported connection settings to {output}"),
            });
        }
        inner.output_mut(output)?.settings = *settings;
        Ok(())
    }

    fn start_recording(
        &self,
        output: OutputHandle,
        path: &Path,
        on_finish: FinishCallback,
    ) -> RuntimeResult<()> {
        let write_files = {
            let mut inner = self.inner.lock();
            let record = inner.output_mut(output)?;
            let Some(session) = record.session else {
                return Err(RuntimeError::Rejected {
                    operation: format!("record on detached {output}"),
                });
            };
            if record.recording.is_some() {
                return Err(RuntimeError::Rejected {
                    operation: format!("second recording on {output}"),
                });
            }
            if !inner.session(session)?.running {
                return Err(RuntimeError::Rejected {
                    operation: format!("record on stopped {session}"),
                });
            }
            inner.behavior.write_files
        };

        if write_files {
            std::fs::File::create(path)?;
        }

        let mut inner = self.inner.lock();
        inner.output_mut(output)?.recording = Some(ActiveRecording {
            path: path.to_path_buf(),
            on_finish,
        });
        inner.recordings_started += 1;
        info!("Recording {} to {}", output, path.display());
        Ok(())
    }

    fn stop_recording(&self, output: OutputHandle) -> RuntimeResult<()> {
        let recording = self.inner.lock().output_mut(output)?.recording.take();
        if let Some(recording) = recording {
            self.finish(vec![recording]);
        }
        Ok(())
    }

    fn is_recording(&self, output: OutputHandle) -> bool {
        self.inner
            .lock()
            .outputs
            .get(&output)
            .map(|record| record.recording.is_some())
            .unwrap_or(false)
    }

    fn bind_preview(
        &self,
        session: SessionHandle,
        target: &PreviewTarget,
        settings: &PreviewSettings,
    ) -> RuntimeResult<PreviewHandle> {
        let mut inner = self.inner.lock();
        if !inner.session(session)?.running {
            return Err(RuntimeError::Rejected {
                operation: format!("preview of stopped {session}"),
            });
        }
        let handle = PreviewHandle(self.next_id());
        inner.previews.insert(
            handle,
            PreviewRecord {
                session,
                target: target.clone(),
                settings: *settings,
            },
        );
        Ok(handle)
    }

    fn unbind_preview(&self, preview: PreviewHandle) {
        self.inner.lock().previews.remove(&preview);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrec_core::FocusMode;
    use std::sync::mpsc;

    fn running_session(runtime: &SimulatedRuntime) -> (SessionHandle, OutputHandle) {
        let session = runtime.create_session().unwrap();
        let output = runtime.create_movie_output(session).unwrap();
        runtime.add_output(session, output).unwrap();
        runtime.start_running(session).unwrap();
        (session, output)
    }

    #[test]
    fn test_single_camera_per_session() {
        let runtime = SimulatedRuntime::new();
        let session = runtime.create_session().unwrap();
        let front = DeviceInfo::camera("f", "Front", DevicePosition::Front);
        let rear = DeviceInfo::camera("r", "Rear", DevicePosition::Back);

        let front_input = runtime.create_input(session, &front).unwrap();
        runtime.add_input(session, front_input).unwrap();

        let rear_input = runtime.create_input(session, &rear).unwrap();
        assert!(!runtime.can_add_input(session, rear_input));

        runtime.remove_input(session, front_input);
        assert!(runtime.can_add_input(session, rear_input));
    }

    #[test]
    fn test_recording_finishes_once() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = SimulatedRuntime::new();
        let (_session, output) = running_session(&runtime);
        let path = dir.path().join("clip.mp4");

        let (tx, rx) = mpsc::channel();
        runtime
            .start_recording(output, &path, Box::new(move |outcome| tx.send(outcome).unwrap()))
            .unwrap();
        assert!(path.exists());
        assert!(runtime.is_recording(output));

        runtime.stop_recording(output).unwrap();
        runtime.stop_recording(output).unwrap();

        let outcome = rx.recv().unwrap();
        assert_eq!(outcome.path, path);
        assert!(outcome.error.is_none());
        assert!(rx.try_recv().is_err());
        assert!(!runtime.is_recording(output));
    }

    #[test]
    fn test_stop_running_finalizes_recording() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = SimulatedRuntime::new();
        let (session, output) = running_session(&runtime);

        let (tx, rx) = mpsc::channel();
        runtime
            .start_recording(
                output,
                &dir.path().join("a.mp4"),
                Box::new(move |outcome| tx.send(outcome).unwrap()),
            )
            .unwrap();
        runtime.stop_running(session);

        assert!(rx.recv().is_ok());
        assert!(!runtime.is_running(session));
    }

    #[test]
    fn test_destroy_session_releases_records() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = SimulatedRuntime::new();
        let (session, output) = running_session(&runtime);
        let mic = DeviceInfo::microphone("mic", "Microphone");
        let input = runtime.create_input(session, &mic).unwrap();
        runtime.add_input(session, input).unwrap();
        // created but never attached
        runtime.create_input(session, &mic).unwrap();

        let (tx, rx) = mpsc::channel();
        runtime
            .start_recording(
                output,
                &dir.path().join("b.mp4"),
                Box::new(move |outcome| tx.send(outcome).unwrap()),
            )
            .unwrap();

        runtime.destroy_session(session);

        assert!(rx.recv().is_ok());
        assert_eq!(runtime.sessions_created(), 1);
        assert_eq!(runtime.live_session_count(), 0);
        assert_eq!(runtime.open_input_count(), 0);
        assert!(!runtime.is_running(session));
        assert!(runtime.create_movie_output(session).is_err());
    }

    #[test]
    fn test_configured_devices_keep_latest_settings() {
        let runtime = SimulatedRuntime::new();
        let rear = DeviceInfo::camera("r", "Rear", DevicePosition::Back);
        for focus_mode in [FocusMode::AutoFocus, FocusMode::ContinuousAutoFocus] {
            runtime
                .configure_device(&rear, &DeviceSettings { focus_mode })
                .unwrap();
        }

        let configured = runtime.configured_devices();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].1.focus_mode, FocusMode::ContinuousAutoFocus);
    }

    #[test]
    fn test_unsupported_connection_settings_rejected() {
        let runtime = SimulatedRuntime::new();
        runtime.update_behavior(|b| b.capabilities.stabilization = false);
        let (_session, output) = running_session(&runtime);

        let settings = ConnectionSettings {
            orientation: None,
            stabilization: Some(camrec_core::StabilizationMode::Auto),
        };
        assert!(runtime.apply_connection_settings(output, &settings).is_err());
    }

    #[test]
    fn test_recording_requires_running_session() {
        let runtime = SimulatedRuntime::new();
        let session = runtime.create_session().unwrap();
        let output = runtime.create_movie_output(session).unwrap();
        runtime.add_output(session, output).unwrap();

        let result = runtime.start_recording(
            output,
            Path::new("/nonexistent/clip.mp4"),
            Box::new(|_| {}),
        );
        assert!(matches!(result, Err(RuntimeError::Rejected { .. })));
    }
}
