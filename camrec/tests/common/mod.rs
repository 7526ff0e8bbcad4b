//! Shared fixtures for controller integration tests

#![allow(dead_code)]

use camrec::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub struct Fixture {
    pub controller: CaptureSessionController,
    pub runtime: Arc<SimulatedRuntime>,
    pub catalog: Arc<StaticDeviceCatalog>,
    pub dir: TempDir,
}

pub fn fixture() -> Fixture {
    fixture_with(StaticDeviceCatalog::phone(), ControllerConfig::default())
}

pub fn fixture_with(catalog: StaticDeviceCatalog, config: ControllerConfig) -> Fixture {
    let runtime = Arc::new(SimulatedRuntime::new());
    fixture_on(runtime.clone(), runtime, catalog, config)
}

/// Fixture whose controller talks to `driven`; `runtime` is what tests inspect
pub fn fixture_on(
    driven: Arc<dyn MediaRuntime>,
    runtime: Arc<SimulatedRuntime>,
    catalog: StaticDeviceCatalog,
    mut config: ControllerConfig,
) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    config.output_dir = Some(dir.path().to_path_buf());

    let catalog = Arc::new(catalog);
    let controller = CaptureSessionController::builder()
        .catalog(catalog.clone())
        .runtime(driven)
        .config(config)
        .build()
        .unwrap();

    Fixture {
        controller,
        runtime,
        catalog,
        dir,
    }
}

pub type Completion = Result<CapturedArtifact, RecordError>;

/// Completion callback that forwards its result over a channel
pub fn completion_channel() -> (
    impl FnOnce(Completion) + Send + 'static,
    mpsc::Receiver<Completion>,
) {
    let (tx, rx) = mpsc::channel();
    let callback = move |result: Completion| {
        let _ = tx.send(result);
    };
    (callback, rx)
}

pub fn wait_for(rx: &mpsc::Receiver<Completion>) -> Completion {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("completion callback did not fire")
}

pub fn camera_ids(fixture: &Fixture) -> Vec<String> {
    let Some(session) = fixture.controller.session_handle() else {
        return Vec::new();
    };
    fixture
        .runtime
        .attached_devices(session)
        .into_iter()
        .filter(|device| device.kind == DeviceKind::Camera)
        .map(|device| device.id)
        .collect()
}

pub fn front_camera_only() -> StaticDeviceCatalog {
    StaticDeviceCatalog::new(vec![DeviceInfo::camera(
        "front-wide",
        "Front Camera",
        DevicePosition::Front,
    )])
}

/// Whether the runtime holds nothing for any session
pub fn fully_released(runtime: &SimulatedRuntime) -> bool {
    runtime.attached_input_count() == 0
        && runtime.attached_output_count() == 0
        && runtime.running_session_count() == 0
        && runtime.live_session_count() == 0
        && runtime.open_input_count() == 0
}

/// Poll `condition` until it holds or five seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Simulated runtime that can hold selected calls until the test lets go
pub struct GatedRuntime {
    inner: Arc<SimulatedRuntime>,
    held_input: Mutex<Option<mpsc::Receiver<()>>>,
    capabilities_barrier: Option<Barrier>,
    inputs_removed: AtomicUsize,
}

impl GatedRuntime {
    pub fn new(inner: Arc<SimulatedRuntime>) -> Self {
        Self {
            inner,
            held_input: Mutex::new(None),
            capabilities_barrier: None,
            inputs_removed: AtomicUsize::new(0),
        }
    }

    /// Every `connection_capabilities` call waits until `parties` callers arrive
    pub fn with_capabilities_barrier(inner: Arc<SimulatedRuntime>, parties: usize) -> Self {
        Self {
            capabilities_barrier: Some(Barrier::new(parties)),
            ..Self::new(inner)
        }
    }

    /// Block the next `create_input` until the returned sender fires
    pub fn hold_next_input(&self) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.held_input.lock().unwrap() = Some(rx);
        tx
    }

    /// `remove_input` calls seen so far
    pub fn inputs_removed(&self) -> usize {
        self.inputs_removed.load(Ordering::SeqCst)
    }
}

impl MediaRuntime for GatedRuntime {
    fn create_session(&self) -> RuntimeResult<SessionHandle> {
        self.inner.create_session()
    }

    fn configure_device(&self, device: &DeviceInfo, settings: &DeviceSettings) -> RuntimeResult<()> {
        self.inner.configure_device(device, settings)
    }

    fn create_input(&self, session: SessionHandle, device: &DeviceInfo) -> RuntimeResult<InputHandle> {
        let held = self.held_input.lock().unwrap().take();
        if let Some(release) = held {
            let _ = release.recv();
        }
        self.inner.create_input(session, device)
    }

    fn can_add_input(&self, session: SessionHandle, input: InputHandle) -> bool {
        self.inner.can_add_input(session, input)
    }

    fn add_input(&self, session: SessionHandle, input: InputHandle) -> RuntimeResult<()> {
        self.inner.add_input(session, input)
    }

    fn remove_input(&self, session: SessionHandle, input: InputHandle) {
        self.inner.remove_input(session, input);
        self.inputs_removed.fetch_add(1, Ordering::SeqCst);
    }

    fn create_movie_output(&self, session: SessionHandle) -> RuntimeResult<OutputHandle> {
        self.inner.create_movie_output(session)
    }

    fn can_add_output(&self, session: SessionHandle, output: OutputHandle) -> bool {
        self.inner.can_add_output(session, output)
    }

    fn add_output(&self, session: SessionHandle, output: OutputHandle) -> RuntimeResult<()> {
        self.inner.add_output(session, output)
    }

    fn remove_output(&self, session: SessionHandle, output: OutputHandle) {
        self.inner.remove_output(session, output)
    }

    fn start_running(&self, session: SessionHandle) -> RuntimeResult<()> {
        self.inner.start_running(session)
    }

    fn stop_running(&self, session: SessionHandle) {
        self.inner.stop_running(session)
    }

    fn destroy_session(&self, session: SessionHandle) {
        self.inner.destroy_session(session)
    }

    fn is_running(&self, session: SessionHandle) -> bool {
        self.inner.is_running(session)
    }

    fn connection_capabilities(&self, output: OutputHandle) -> ConnectionCapabilities {
        if let Some(barrier) = &self.capabilities_barrier {
            barrier.wait();
        }
        self.inner.connection_capabilities(output)
    }

    fn apply_connection_settings(
        &self,
        output: OutputHandle,
        settings: &ConnectionSettings,
    ) -> RuntimeResult<()> {
        self.inner.apply_connection_settings(output, settings)
    }

    fn start_recording(
        &self,
        output: OutputHandle,
        path: &Path,
        on_finish: FinishCallback,
    ) -> RuntimeResult<()> {
        self.inner.start_recording(output, path, on_finish)
    }

    fn stop_recording(&self, output: OutputHandle) -> RuntimeResult<()> {
        self.inner.stop_recording(output)
    }

    fn is_recording(&self, output: OutputHandle) -> bool {
        self.inner.is_recording(output)
    }

    fn bind_preview(
        &self,
        session: SessionHandle,
        target: &PreviewTarget,
        settings: &PreviewSettings,
    ) -> RuntimeResult<PreviewHandle> {
        self.inner.bind_preview(session, target, settings)
    }

    fn unbind_preview(&self, preview: PreviewHandle) {
        self.inner.unbind_preview(preview)
    }
}
