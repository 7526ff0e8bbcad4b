//! Capture session controller
//!
//! Sequences device discovery, input/output wiring and recording against the
//! collaborator traits, and exposes the result as a small state machine:
//!
//! ```text
//! Unconfigured -> Configuring -> Ready <-> Recording
//!                      |           |
//!                      v           v (clear)
//!                Failed(kind)  Unconfigured
//! ```
//!
//! `prepare` and the re-attachment half of `swap_camera` run on tokio's
//! blocking pool. Both take `&mut self`, so they cannot overlap each other or
//! a teardown. Dropping either future early is allowed: the background work
//! still finishes, and whatever it wired up is released again.

use crate::config::{ControllerConfig, SwapPolicy};
use crate::recording::{allocate_destination, CapturedArtifact, RecordingHandle};
use crate::session::{AttachedInputs, PendingCamera, Session};
use camrec_core::{
    CameraPosition, ConfigError, ConnectionSettings, ControllerEvent, ControllerState,
    DeviceCatalog, FinishCallback, MediaRuntime, OutputHandle, PreviewError, PreviewHandle,
    PreviewTarget, RecordError, RecordingOutcome, SessionHandle, SetupError, SwapError,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State shared with the runtime's finish callback
#[derive(Debug, Default)]
struct Shared {
    state: ControllerState,
    recording: Option<RecordingHandle>,
}

impl Shared {
    fn transition(&mut self, to: ControllerState, events: &broadcast::Sender<ControllerEvent>) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!("Controller state {} -> {}", from, to);
        let _ = events.send(ControllerEvent::StateChanged { from, to });
    }
}

/// Returns an abandoned `prepare` to [`ControllerState::Unconfigured`]
///
/// The blocking task keeps running; its session tears itself down when the
/// result is dropped.
struct ConfiguringGuard {
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<ControllerEvent>,
    armed: bool,
}

impl ConfiguringGuard {
    fn new(shared: &Arc<Mutex<Shared>>, events: &broadcast::Sender<ControllerEvent>) -> Self {
        Self {
            shared: Arc::clone(shared),
            events: events.clone(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConfiguringGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut shared = self.shared.lock();
        if shared.state == ControllerState::Configuring {
            warn!("prepare abandoned before completion");
            shared.transition(ControllerState::Unconfigured, &self.events);
        }
    }
}

#[derive(Debug)]
struct BoundPreview {
    handle: PreviewHandle,
    surface_id: String,
}

/// Fluent builder for a [`CaptureSessionController`]
#[derive(Default)]
pub struct ControllerBuilder {
    catalog: Option<Arc<dyn DeviceCatalog>>,
    runtime: Option<Arc<dyn MediaRuntime>>,
    config: ControllerConfig,
}

impl ControllerBuilder {
    /// Device enumeration service (required)
    pub fn catalog(mut self, catalog: Arc<dyn DeviceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Media pipeline runtime (required)
    pub fn runtime(mut self, runtime: Arc<dyn MediaRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Camera used by the first `prepare`
    pub fn preferred_camera(mut self, position: CameraPosition) -> Self {
        self.config.preferred_camera = position;
        self
    }

    /// Directory recordings are written to
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    /// Swap failure handling
    pub fn swap_policy(mut self, policy: SwapPolicy) -> Self {
        self.config.swap_policy = policy;
        self
    }

    /// Build the controller with current configuration
    pub fn build(self) -> Result<CaptureSessionController, ConfigError> {
        let catalog = self
            .catalog
            .ok_or(ConfigError::MissingCollaborator { field: "catalog" })?;
        let runtime = self
            .runtime
            .ok_or(ConfigError::MissingCollaborator { field: "runtime" })?;
        CaptureSessionController::new(catalog, runtime, self.config)
    }
}

/// Owns the lifecycle of one capture session
pub struct CaptureSessionController {
    catalog: Arc<dyn DeviceCatalog>,
    runtime: Arc<dyn MediaRuntime>,
    config: ControllerConfig,
    preferred: CameraPosition,
    session: Option<Session>,
    preview: Option<BoundPreview>,
    shared: Arc<Mutex<Shared>>,
    event_tx: broadcast::Sender<ControllerEvent>,
}

impl std::fmt::Debug for CaptureSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSessionController")
            .field("state", &self.state())
            .field("preferred", &self.preferred)
            .field("session", &self.session)
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

impl CaptureSessionController {
    /// Start building a controller
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    /// Create an unconfigured controller
    pub fn new(
        catalog: Arc<dyn DeviceCatalog>,
        runtime: Arc<dyn MediaRuntime>,
        config: ControllerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            catalog,
            runtime,
            preferred: config.preferred_camera,
            config,
            session: None,
            preview: None,
            shared: Arc::new(Mutex::new(Shared::default())),
            event_tx,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> ControllerState {
        self.shared.lock().state
    }

    /// Whether a recording is in flight
    pub fn is_recording(&self) -> bool {
        self.shared.lock().recording.is_some()
    }

    /// Destination of the in-flight recording
    pub fn recording_path(&self) -> Option<PathBuf> {
        self.shared
            .lock()
            .recording
            .as_ref()
            .map(|handle| handle.path().to_path_buf())
    }

    /// Camera the next input attachment will use
    pub fn preferred_camera(&self) -> CameraPosition {
        self.preferred
    }

    /// Camera currently attached to the session
    pub fn active_camera(&self) -> Option<CameraPosition> {
        self.attached_inputs().position()
    }

    /// Which camera input is attached
    pub fn attached_inputs(&self) -> AttachedInputs {
        self.session
            .as_ref()
            .map(Session::video)
            .unwrap_or_default()
    }

    /// Runtime handle of the current session
    pub fn session_handle(&self) -> Option<SessionHandle> {
        self.session.as_ref().map(Session::handle)
    }

    /// Whether the runtime session is running
    pub fn is_running(&self) -> bool {
        self.running_session().is_some()
    }

    /// Whether a preview surface is bound
    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Active configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    fn running_session(&self) -> Option<&Session> {
        self.session
            .as_ref()
            .filter(|session| self.runtime.is_running(session.handle()))
    }

    fn set_state(&self, to: ControllerState) {
        self.shared.lock().transition(to, &self.event_tx);
    }

    /// Build and start a fresh session
    ///
    /// Any previous configuration is torn down first. The wiring runs on the
    /// blocking pool; the returned future resolves once it has finished or
    /// failed. A failure leaves nothing attached and the controller in
    /// [`ControllerState::Failed`]. If the future is dropped before it
    /// resolves, the controller returns to [`ControllerState::Unconfigured`]
    /// and the session built in the background is torn down.
    pub async fn prepare(&mut self) -> Result<(), SetupError> {
        if self.is_recording() {
            return Err(SetupError::SessionAlreadyRunning);
        }

        info!("Preparing capture session ({} camera)", self.preferred);
        self.clear_configuration();
        self.set_state(ControllerState::Configuring);
        let guard = ConfiguringGuard::new(&self.shared, &self.event_tx);

        let runtime = self.runtime.clone();
        let catalog = self.catalog.clone();
        let config = self.config.clone();
        let preferred = self.preferred;

        let result = match tokio::task::spawn_blocking(move || {
            Session::configure(runtime, catalog.as_ref(), &config, preferred)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => Err(SetupError::TaskAborted {
                reason: e.to_string(),
            }),
        };
        guard.disarm();

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.set_state(ControllerState::Ready);
                info!("Capture session ready");
                Ok(())
            }
            Err(e) => {
                warn!("Capture session setup failed: {}", e);
                self.set_state(ControllerState::Failed(e.kind()));
                let _ = self
                    .event_tx
                    .send(ControllerEvent::PrepareFailed { kind: e.kind() });
                Err(e)
            }
        }
    }

    /// Bind a live preview to `target`
    pub fn display_preview(&mut self, target: &PreviewTarget) -> Result<(), PreviewError> {
        let session = self.running_session().ok_or(PreviewError::SessionMissing)?;

        if let Some(bound) = &self.preview {
            return Err(PreviewError::PreviewAlreadyBound {
                surface_id: bound.surface_id.clone(),
            });
        }

        let handle =
            self.runtime
                .bind_preview(session.handle(), target, &self.config.preview_settings())?;
        info!("Preview bound to surface {}", target.surface_id);
        self.preview = Some(BoundPreview {
            handle,
            surface_id: target.surface_id.clone(),
        });
        let _ = self.event_tx.send(ControllerEvent::PreviewBound {
            surface_id: target.surface_id.clone(),
        });
        Ok(())
    }

    /// Remove the bound preview, if any
    pub fn detach_preview(&mut self) {
        if let Some(bound) = self.preview.take() {
            self.runtime.unbind_preview(bound.handle);
            debug!("Preview detached from surface {}", bound.surface_id);
            let _ = self.event_tx.send(ControllerEvent::PreviewDetached {
                surface_id: bound.surface_id,
            });
        }
    }

    /// Start writing a new file
    ///
    /// Returns the freshly allocated destination. `on_complete` runs exactly
    /// once, when the runtime finalizes the file, possibly on a runtime
    /// thread.
    pub fn start_recording<F>(&self, on_complete: F) -> Result<PathBuf, RecordError>
    where
        F: FnOnce(Result<CapturedArtifact, RecordError>) + Send + 'static,
    {
        let session = self.running_session().ok_or(RecordError::SessionMissing)?;
        let output = session.output().ok_or(RecordError::SessionMissing)?;

        if let Some(active) = self.recording_path() {
            return Err(RecordError::AlreadyCapturing { path: active });
        }

        self.apply_connection_settings(output);

        let id = Uuid::new_v4();
        let path = allocate_destination(
            &self.config.output_directory(),
            id,
            &self.config.file_extension,
        )?;
        let handle = RecordingHandle::new(
            id,
            path.clone(),
            output,
            session.video().position(),
            Box::new(on_complete),
        );

        {
            // another caller may have claimed the slot since the check above
            let mut shared = self.shared.lock();
            if let Some(active) = shared.recording.as_ref() {
                return Err(RecordError::AlreadyCapturing {
                    path: active.path().to_path_buf(),
                });
            }
            shared.recording = Some(handle);
            shared.transition(ControllerState::Recording, &self.event_tx);
        }

        let finish = self.finish_callback(id);
        if let Err(e) = self.runtime.start_recording(output, &path, finish) {
            warn!("Runtime refused to record to {}: {}", path.display(), e);
            let mut shared = self.shared.lock();
            if shared.recording.as_ref().map(RecordingHandle::id) == Some(id) {
                shared.recording = None;
                shared.transition(ControllerState::Ready, &self.event_tx);
            }
            return Err(e.into());
        }

        info!("Recording to {}", path.display());
        let _ = self
            .event_tx
            .send(ControllerEvent::RecordingStarted { path: path.clone() });
        Ok(path)
    }

    fn apply_connection_settings(&self, output: OutputHandle) {
        let capabilities = self.runtime.connection_capabilities(output);
        let settings = ConnectionSettings {
            orientation: capabilities
                .orientation
                .then_some(self.config.video_orientation),
            stabilization: capabilities
                .stabilization
                .then_some(self.config.stabilization),
        };
        if settings.is_empty() {
            return;
        }
        if let Err(e) = self.runtime.apply_connection_settings(output, &settings) {
            warn!("Ignoring connection settings failure: {}", e);
        }
    }

    /// Callback handed to the runtime for the recording `id`
    fn finish_callback(&self, id: Uuid) -> FinishCallback {
        let shared = Arc::clone(&self.shared);
        let events = self.event_tx.clone();
        Box::new(move |outcome: RecordingOutcome| {
            let handle = {
                let mut shared = shared.lock();
                match shared.recording.as_ref() {
                    Some(active) if active.id() == id => {
                        let handle = shared.recording.take();
                        if shared.state == ControllerState::Recording {
                            shared.transition(ControllerState::Ready, &events);
                        }
                        handle
                    }
                    _ => None,
                }
            };

            let Some(handle) = handle else {
                warn!("Ignoring finish for stale recording {}", id);
                return;
            };
            let path = outcome.path.clone();
            let success = handle.complete(outcome);
            info!("Recording finished at {} (success={})", path.display(), success);
            let _ = events.send(ControllerEvent::RecordingFinished { path, success });
        })
    }

    /// Finalize the in-flight recording
    ///
    /// Succeeds without doing anything when nothing is being recorded.
    pub fn stop_recording(&self) -> Result<(), RecordError> {
        self.running_session().ok_or(RecordError::SessionMissing)?;

        let output = self
            .shared
            .lock()
            .recording
            .as_ref()
            .map(RecordingHandle::output);

        match output {
            Some(output) => {
                debug!("Stopping recording on {}", output);
                self.runtime.stop_recording(output)?;
            }
            None => debug!("stop_recording with nothing in flight"),
        }
        Ok(())
    }

    /// Switch between the front and rear camera
    ///
    /// The old camera is detached and the preferred position flipped
    /// immediately; the new camera is attached on the blocking pool. With
    /// [`SwapPolicy::BestEffort`] an attachment failure is logged and the
    /// call still succeeds, leaving no camera attached.
    pub async fn swap_camera(&mut self) -> Result<(), SwapError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SwapError::SessionMissing);
        };

        let previous = session.detach_camera();
        self.preferred = self.preferred.flipped();
        let position = self.preferred;
        info!(
            "Swapping camera {} -> {}",
            previous.map(|p| p.to_string()).unwrap_or_else(|| "none".to_string()),
            position
        );

        let runtime = self.runtime.clone();
        let handle = session.handle();
        let device = session.devices().camera(position).cloned();

        let result = match tokio::task::spawn_blocking(move || {
            PendingCamera::attach(runtime, handle, device.as_ref(), position)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => Err(SetupError::TaskAborted {
                reason: e.to_string(),
            }),
        };

        match result {
            Ok(pending) => {
                if let Some(session) = self.session.as_mut() {
                    session.set_video(pending.claim());
                }
                let _ = self
                    .event_tx
                    .send(ControllerEvent::CameraSwapped { position });
                Ok(())
            }
            Err(source) => {
                let _ = self
                    .event_tx
                    .send(ControllerEvent::SwapFailed { kind: source.kind() });
                match self.config.swap_policy {
                    SwapPolicy::Strict => {
                        warn!("Attaching {} camera failed: {}", position, source);
                        Err(SwapError::Reattach { position, source })
                    }
                    SwapPolicy::BestEffort => {
                        warn!(
                            "Attaching {} camera failed, continuing without camera: {}",
                            position, source
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    /// Tear the session down and return to [`ControllerState::Unconfigured`]
    ///
    /// An in-flight recording is finalized first so its callback still runs.
    pub fn clear(&mut self) {
        if self.is_recording() {
            if let Err(e) = self.stop_recording() {
                warn!("Failed to finalize recording during clear: {}", e);
            }
        }
        self.clear_configuration();
        self.set_state(ControllerState::Unconfigured);
        info!("Capture session cleared");
    }

    fn clear_configuration(&mut self) {
        self.detach_preview();
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }
}

impl Drop for CaptureSessionController {
    fn drop(&mut self) {
        self.clear_configuration();
    }
}
