//! Record session demo for camrec
//!
//! Walks a controller through prepare, preview, two recordings and a camera
//! swap on the simulated runtime, then prints the session profile.
//!
//! Run with `cargo run --example record_session`. Set `RUST_LOG` to change
//! the log level, e.g. `RUST_LOG=camrec=trace`.

use anyhow::Context;
use camrec::{
    CaptureSessionController, ControllerConfig, PreviewTarget, SessionProfiler, SimulatedRuntime,
    StaticDeviceCatalog,
};
use camrec_diagnostics::DebugLogger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    DebugLogger::init_logging();

    let output_dir = std::env::temp_dir().join("camrec-demo");
    let config = ControllerConfig {
        output_dir: Some(output_dir.clone()),
        ..ControllerConfig::default()
    };

    let mut controller = CaptureSessionController::builder()
        .catalog(Arc::new(StaticDeviceCatalog::phone()))
        .runtime(Arc::new(SimulatedRuntime::new()))
        .config(config)
        .build()
        .context("building controller")?;

    let events = controller.subscribe();
    let profiler = tokio::spawn(async move {
        let mut profiler = SessionProfiler::new();
        profiler.drain(events).await;
        profiler
    });

    println!("📷 Preparing capture session...");
    controller.prepare().await.context("preparing session")?;
    println!("✅ Session ready ({} camera)", controller.preferred_camera());

    controller
        .display_preview(&PreviewTarget::new("viewfinder", 390.0, 844.0))
        .context("binding preview")?;
    println!("🖼️  Preview bound");

    record_clip(&controller, Duration::from_millis(300)).await?;

    println!("🔄 Swapping camera...");
    controller.swap_camera().await.context("swapping camera")?;
    println!("✅ Now using {} camera", controller.preferred_camera());

    record_clip(&controller, Duration::from_millis(300)).await?;

    controller.clear();
    drop(controller);

    let profiler = profiler.await.context("profiler task")?;
    println!("📊 Session profile:");
    println!("{}", profiler.stats().to_json()?);
    println!("📁 Recordings written to {}", output_dir.display());
    Ok(())
}

async fn record_clip(
    controller: &CaptureSessionController,
    length: Duration,
) -> anyhow::Result<()> {
    let (done_tx, done_rx) = oneshot::channel();
    let path = controller
        .start_recording(move |result| {
            let _ = done_tx.send(result);
        })
        .context("starting recording")?;
    println!("🔴 Recording to {}", path.display());

    tokio::time::sleep(length).await;
    controller.stop_recording().context("stopping recording")?;

    let artifact = done_rx
        .await
        .context("completion callback dropped")?
        .context("finalizing recording")?;
    println!(
        "⏹️  Finished {} ({} ms)",
        artifact.path.display(),
        artifact.duration().num_milliseconds()
    );
    Ok(())
}
