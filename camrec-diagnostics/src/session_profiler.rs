//! Session profiling from the controller's event stream

use camrec_core::{CaptureErrorKind, ControllerEvent, ControllerState};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Counters folded from controller events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Successful `prepare` calls
    pub prepares_completed: u64,
    /// Failed `prepare` calls by kind
    pub setup_failures: BTreeMap<CaptureErrorKind, u64>,
    /// Preview surfaces bound
    pub previews_bound: u64,
    /// Recordings the runtime started
    pub recordings_started: u64,
    /// Recordings finalized successfully
    pub recordings_finished: u64,
    /// Recordings finalized with a writer error
    pub recordings_failed: u64,
    /// Successful camera swaps
    pub swaps: u64,
    /// Swaps whose re-attachment failed
    pub swap_failures: u64,
    /// Events missed because the receiver fell behind
    pub events_lagged: u64,
}

impl SessionStats {
    /// Total setup failures of any kind
    pub fn total_setup_failures(&self) -> u64 {
        self.setup_failures.values().sum()
    }

    /// Recordings started but not finalized yet
    pub fn recordings_in_flight(&self) -> u64 {
        self.recordings_started
            .saturating_sub(self.recordings_finished + self.recordings_failed)
    }

    /// Stats as a JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Folds controller events into [`SessionStats`]
#[derive(Debug, Default)]
pub struct SessionProfiler {
    stats: SessionStats,
}

impl SessionProfiler {
    /// Create new session profiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one event
    pub fn record(&mut self, event: &ControllerEvent) {
        debug!("Profiling {}", event.event_type());
        let stats = &mut self.stats;
        match event {
            ControllerEvent::StateChanged {
                from: ControllerState::Configuring,
                to: ControllerState::Ready,
            } => stats.prepares_completed += 1,
            ControllerEvent::StateChanged { .. } => {}
            ControllerEvent::PrepareFailed { kind } => {
                *stats.setup_failures.entry(*kind).or_default() += 1;
            }
            ControllerEvent::PreviewBound { .. } => stats.previews_bound += 1,
            ControllerEvent::PreviewDetached { .. } => {}
            ControllerEvent::RecordingStarted { .. } => stats.recordings_started += 1,
            ControllerEvent::RecordingFinished { success: true, .. } => {
                stats.recordings_finished += 1
            }
            ControllerEvent::RecordingFinished { success: false, .. } => {
                stats.recordings_failed += 1
            }
            ControllerEvent::CameraSwapped { .. } => stats.swaps += 1,
            ControllerEvent::SwapFailed { .. } => stats.swap_failures += 1,
        }
    }

    /// Record every event already queued on the receiver; returns how many
    pub fn record_pending(&mut self, events: &mut broadcast::Receiver<ControllerEvent>) -> usize {
        let mut recorded = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    self.record(&event);
                    recorded += 1;
                }
                Err(TryRecvError::Lagged(missed)) => self.lagged(missed),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        recorded
    }

    /// Record events until the controller is dropped
    pub async fn drain(&mut self, mut events: broadcast::Receiver<ControllerEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.record(&event),
                Err(RecvError::Lagged(missed)) => self.lagged(missed),
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn lagged(&mut self, missed: u64) {
        warn!("Session profiler missed {} events", missed);
        self.stats.events_lagged += missed;
    }

    /// Current counters
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.stats = SessionStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrec_core::CameraPosition;
    use std::path::PathBuf;

    #[test]
    fn test_counts_lifecycle() {
        let mut profiler = SessionProfiler::new();
        profiler.record(&ControllerEvent::StateChanged {
            from: ControllerState::Unconfigured,
            to: ControllerState::Configuring,
        });
        profiler.record(&ControllerEvent::StateChanged {
            from: ControllerState::Configuring,
            to: ControllerState::Ready,
        });
        profiler.record(&ControllerEvent::RecordingStarted {
            path: PathBuf::from("/tmp/a.mp4"),
        });
        assert_eq!(profiler.stats().recordings_in_flight(), 1);

        profiler.record(&ControllerEvent::RecordingFinished {
            path: PathBuf::from("/tmp/a.mp4"),
            success: true,
        });
        profiler.record(&ControllerEvent::CameraSwapped {
            position: CameraPosition::Rear,
        });

        let stats = profiler.stats();
        assert_eq!(stats.prepares_completed, 1);
        assert_eq!(stats.recordings_finished, 1);
        assert_eq!(stats.recordings_in_flight(), 0);
        assert_eq!(stats.swaps, 1);
    }

    #[test]
    fn test_failures_grouped_by_kind() {
        let mut profiler = SessionProfiler::new();
        for _ in 0..2 {
            profiler.record(&ControllerEvent::PrepareFailed {
                kind: CaptureErrorKind::NoCamerasAvailable,
            });
        }
        profiler.record(&ControllerEvent::PrepareFailed {
            kind: CaptureErrorKind::InputsInvalid,
        });

        let stats = profiler.stats();
        assert_eq!(stats.total_setup_failures(), 3);
        assert_eq!(
            stats.setup_failures.get(&CaptureErrorKind::NoCamerasAvailable),
            Some(&2)
        );
        let json = stats.to_json().unwrap();
        assert!(json.contains("no_cameras_available"));

        profiler.reset();
        assert_eq!(profiler.stats(), &SessionStats::default());
    }

    #[test]
    fn test_drain_until_closed() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(ControllerEvent::PreviewBound {
            surface_id: "viewfinder".to_string(),
        })
        .unwrap();
        tx.send(ControllerEvent::SwapFailed {
            kind: CaptureErrorKind::InputsInvalid,
        })
        .unwrap();
        drop(tx);

        let mut profiler = SessionProfiler::new();
        tokio_test::block_on(profiler.drain(rx));
        assert_eq!(profiler.stats().previews_bound, 1);
        assert_eq!(profiler.stats().swap_failures, 1);
    }

    #[test]
    fn test_record_pending_counts_lag() {
        let (tx, mut rx) = broadcast::channel(2);
        for i in 0..4 {
            tx.send(ControllerEvent::RecordingStarted {
                path: PathBuf::from(format!("/tmp/{i}.mp4")),
            })
            .unwrap();
        }

        let mut profiler = SessionProfiler::new();
        let recorded = profiler.record_pending(&mut rx);
        assert_eq!(recorded, 2);
        assert_eq!(profiler.stats().events_lagged, 2);
        assert_eq!(profiler.stats().recordings_started, 2);
    }
}
