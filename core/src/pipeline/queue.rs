use crate::prelude::BeamId;
use crate::telemetry::CoreMetrics;
use num_complex::Complex32;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One dwell's capture, handed from the scheduling path to the processing
/// pipeline by value.
#[derive(Debug, Clone)]
pub struct CapturedDwell {
    pub cycle_index: u64,
    pub dwell_index: usize,
    pub beam_id: BeamId,
    pub azimuth_deg: f32,
    pub captured_at: u64,
    pub samples: Vec<Complex32>,
}

/// Bounded hand-off queue between dwell capture and the processing stage.
///
/// Capture must never block: pushing onto a full queue evicts the oldest
/// unprocessed dwell and counts the drop. Freshness beats completeness.
pub struct DwellQueue {
    inner: Mutex<VecDeque<CapturedDwell>>,
    capacity: usize,
    metrics: Arc<CoreMetrics>,
}

impl DwellQueue {
    pub fn new(capacity: usize, metrics: Arc<CoreMetrics>) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            metrics,
        }
    }

    pub fn push(&self, dwell: CapturedDwell) {
        let Ok(mut queue) = self.inner.lock() else {
            return;
        };
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.metrics.record_dropped_dwell();
        }
        queue.push_back(dwell);
    }

    pub fn pop(&self) -> Option<CapturedDwell> {
        self.inner.lock().ok()?.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
