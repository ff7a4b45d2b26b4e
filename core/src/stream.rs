use crate::detect::Detection;
use crate::prelude::ModeTag;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A contiguous chunk of the complex baseband stream, positioned by absolute
/// sample count.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    pub start: u64,
    pub samples: Vec<Complex32>,
}

impl SampleBlock {
    pub fn range(&self) -> Range<u64> {
        self.start..self.start + self.samples.len() as u64
    }
}

/// A sample block annotated with the scheduler's mode tags; comms-slot ranges
/// pass through to the communication stack untouched.
#[derive(Debug, Clone)]
pub struct TaggedBlock {
    pub block: SampleBlock,
    pub tags: Vec<(Range<u64>, ModeTag)>,
}

/// Per-scan-cycle output record for external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub cycle_index: u64,
    /// Absolute sample position at which the cycle's processing finished.
    pub completed_at: u64,
    /// Sorted by descending SNR.
    pub detections: Vec<Detection>,
    /// Raised while overrun/drop counters grow persistently.
    pub degraded: bool,
}
