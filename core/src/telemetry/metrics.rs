use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counter registry shared across the scheduling path and the processing
/// pipeline. Soft conditions land here as counters instead of in `Result`s.
pub struct CoreMetrics {
    inner: Mutex<Counters>,
    degraded_threshold: u64,
}

#[derive(Default)]
struct Counters {
    switch_overruns: u64,
    dropped_dwells: u64,
    truncated_dwells: u64,
    processed_dwells: u64,
    slot_transitions: u64,
    frames_completed: u64,
    detections_reported: u64,
}

/// Point-in-time copy of the counters, exposed for external observability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub switch_overruns: u64,
    pub dropped_dwells: u64,
    pub truncated_dwells: u64,
    pub processed_dwells: u64,
    pub slot_transitions: u64,
    pub frames_completed: u64,
    pub detections_reported: u64,
}

impl CoreMetrics {
    pub fn new() -> Self {
        Self::with_degraded_threshold(8)
    }

    /// `threshold`: combined overrun + drop count beyond which the core
    /// reports itself degraded.
    pub fn with_degraded_threshold(threshold: u64) -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
            degraded_threshold: threshold,
        }
    }

    pub fn record_switch_overrun(&self) {
        self.bump(|c| c.switch_overruns += 1);
    }

    pub fn record_dropped_dwell(&self) {
        self.bump(|c| c.dropped_dwells += 1);
    }

    pub fn record_truncated_dwell(&self) {
        self.bump(|c| c.truncated_dwells += 1);
    }

    pub fn record_processed_dwell(&self) {
        self.bump(|c| c.processed_dwells += 1);
    }

    pub fn record_slot_transition(&self) {
        self.bump(|c| c.slot_transitions += 1);
    }

    pub fn record_frame_completed(&self) {
        self.bump(|c| c.frames_completed += 1);
    }

    pub fn record_detections(&self, count: usize) {
        self.bump(|c| c.detections_reported += count as u64);
    }

    /// Persistent overrun or drop growth shows up as a single degraded flag,
    /// not as per-event errors.
    pub fn degraded(&self) -> bool {
        let snap = self.snapshot();
        snap.switch_overruns + snap.dropped_dwells >= self.degraded_threshold
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(counters) => MetricsSnapshot {
                switch_overruns: counters.switch_overruns,
                dropped_dwells: counters.dropped_dwells,
                truncated_dwells: counters.truncated_dwells,
                processed_dwells: counters.processed_dwells,
                slot_transitions: counters.slot_transitions,
                frames_completed: counters.frames_completed,
                detections_reported: counters.detections_reported,
            },
            Err(_) => MetricsSnapshot::default(),
        }
    }

    fn bump(&self, apply: impl FnOnce(&mut Counters)) {
        if let Ok(mut counters) = self.inner.lock() {
            apply(&mut counters);
        }
    }
}

impl Default for CoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}
