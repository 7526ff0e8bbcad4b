//! Integration tests for the simulated runtime and static catalog
//!
//! These exercise the backend purely through the `camrec-core` traits, the
//! way the controller sees it.

use camrec_core::*;
use camrec_media::*;
use std::sync::mpsc;
use std::sync::Arc;

fn wire_session(runtime: &dyn MediaRuntime, catalog: &dyn DeviceCatalog) -> (SessionHandle, OutputHandle) {
    let session = runtime.create_session().unwrap();
    for device in catalog.devices().unwrap() {
        if device.kind == DeviceKind::Camera && device.position == DevicePosition::Back {
            continue;
        }
        let input = runtime.create_input(session, &device).unwrap();
        runtime.add_input(session, input).unwrap();
    }
    let output = runtime.create_movie_output(session).unwrap();
    runtime.add_output(session, output).unwrap();
    runtime.start_running(session).unwrap();
    (session, output)
}

// ============================================================================
// CATALOG TESTS
// ============================================================================

#[tokio::test]
async fn test_phone_catalog_through_trait() {
    let catalog: Arc<dyn DeviceCatalog> = Arc::new(StaticDeviceCatalog::phone());

    let devices = catalog.devices().unwrap();
    assert_eq!(devices.len(), 3);
    assert!(devices.iter().any(|d| d.is_camera_at(CameraPosition::Front)));
    assert!(devices.iter().any(|d| d.is_camera_at(CameraPosition::Rear)));

    let microphone = catalog.default_microphone().unwrap().unwrap();
    assert_eq!(microphone.kind, DeviceKind::Microphone);
}

#[tokio::test]
async fn test_catalog_failure_is_reported() {
    let catalog = StaticDeviceCatalog::phone();
    catalog.set_failure(Some("permission denied"));
    assert!(matches!(
        catalog.devices(),
        Err(RuntimeError::Enumeration { .. })
    ));

    catalog.set_failure(None);
    assert!(catalog.devices().is_ok());
}

// ============================================================================
// RUNTIME TESTS
// ============================================================================

#[tokio::test]
async fn test_full_session_wiring() {
    let runtime = SimulatedRuntime::new();
    let catalog = StaticDeviceCatalog::phone();
    let (session, output) = wire_session(&runtime, &catalog);

    assert!(runtime.is_running(session));
    assert_eq!(runtime.attached_devices(session).len(), 2);
    assert_eq!(runtime.attached_output_count(), 1);
    assert!(!runtime.is_recording(output));
}

#[tokio::test]
async fn test_recording_finishes_on_session_stop() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = SimulatedRuntime::new();
    let (session, output) = wire_session(&runtime, &StaticDeviceCatalog::front_only());

    let (tx, rx) = mpsc::channel();
    let path = dir.path().join("clip.mp4");
    runtime
        .start_recording(
            output,
            &path,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        )
        .unwrap();
    assert!(path.exists());
    assert!(runtime.is_recording(output));

    runtime.stop_running(session);

    let outcome = rx.try_recv().unwrap();
    assert_eq!(outcome.path, path);
    assert!(outcome.error.is_none());
    assert!(!runtime.is_recording(output));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_recording_refused_on_stopped_session() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = SimulatedRuntime::new();
    let (session, output) = wire_session(&runtime, &StaticDeviceCatalog::front_only());
    runtime.stop_running(session);

    let result = runtime.start_recording(output, &dir.path().join("clip.mp4"), Box::new(|_| {}));
    assert!(matches!(result, Err(RuntimeError::Rejected { .. })));
    assert_eq!(runtime.recordings_started(), 0);
}

#[tokio::test]
async fn test_unavailable_camera_fails_input_creation() {
    let runtime = SimulatedRuntime::new();
    runtime.update_behavior(|behavior| {
        behavior
            .unavailable_camera_positions
            .insert(DevicePosition::Front);
    });
    let session = runtime.create_session().unwrap();
    let camera = DeviceInfo::camera("front-wide", "Front Camera", DevicePosition::Front);

    assert!(matches!(
        runtime.create_input(session, &camera),
        Err(RuntimeError::InputUnavailable { .. })
    ));
}
