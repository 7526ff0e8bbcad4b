//! In-flight recording bookkeeping

use camrec_core::{CameraPosition, OutputHandle, RecordError, RecordingOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Called once with the finished recording
pub type CompletionCallback =
    Box<dyn FnOnce(Result<CapturedArtifact, RecordError>) + Send + 'static>;

/// A recorded media file handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedArtifact {
    /// File on durable storage
    pub path: PathBuf,
    /// When the runtime was told to start writing
    pub started_at: DateTime<Utc>,
    /// When the runtime reported the file finalized
    pub finished_at: DateTime<Utc>,
    /// Camera attached when recording started
    pub camera: Option<CameraPosition>,
}

impl CapturedArtifact {
    /// Wall-clock time between start and finalization
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// The single in-flight recording
///
/// Created by `start_recording` and consumed by [`RecordingHandle::complete`],
/// so its callback can only ever run once.
pub struct RecordingHandle {
    id: Uuid,
    path: PathBuf,
    output: OutputHandle,
    camera: Option<CameraPosition>,
    started_at: DateTime<Utc>,
    on_complete: CompletionCallback,
}

impl std::fmt::Debug for RecordingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("output", &self.output)
            .field("camera", &self.camera)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl RecordingHandle {
    pub(crate) fn new(
        id: Uuid,
        path: PathBuf,
        output: OutputHandle,
        camera: Option<CameraPosition>,
        on_complete: CompletionCallback,
    ) -> Self {
        Self {
            id,
            path,
            output,
            camera,
            started_at: Utc::now(),
            on_complete,
        }
    }

    /// Unique recording id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output writing the file
    pub fn output(&self) -> OutputHandle {
        self.output
    }

    /// Start timestamp
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Deliver the runtime's outcome to the caller; returns whether it succeeded
    pub(crate) fn complete(self, outcome: RecordingOutcome) -> bool {
        let result = match outcome.error {
            None => Ok(CapturedArtifact {
                path: outcome.path,
                started_at: self.started_at,
                finished_at: Utc::now(),
                camera: self.camera,
            }),
            Some(reason) => Err(RecordError::Finished {
                path: outcome.path,
                reason,
            }),
        };
        let success = result.is_ok();
        debug!("Recording {} complete (success={})", self.id, success);
        (self.on_complete)(result);
        success
    }
}

/// Fresh destination inside `dir`, named after `id`
pub(crate) fn allocate_destination(
    dir: &Path,
    id: Uuid,
    extension: &str,
) -> Result<PathBuf, RecordError> {
    std::fs::create_dir_all(dir).map_err(|e| RecordError::Destination {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(dir.join(format!("{}.{}", id.as_hyphenated(), extension)))
}
