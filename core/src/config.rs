use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Lengths of the five frame sub-slots, in samples. Their sum must equal the
/// frame length exactly; boundaries never move mid-frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotLengths {
    pub guard_pre: u64,
    pub radar: u64,
    pub guard_mid: u64,
    pub comms: u64,
    pub guard_post: u64,
}

impl SlotLengths {
    pub fn total(&self) -> u64 {
        self.guard_pre + self.radar + self.guard_mid + self.comms + self.guard_post
    }
}

/// CFAR windowing and threshold parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CfarParams {
    /// Guard ring half-width around the cell under test, in cells.
    pub guard_cells: usize,
    /// Training ring half-width beyond the guard ring, in cells.
    pub training_cells: usize,
    /// Target probability of false alarm.
    pub pfa: f64,
    /// Cells with fewer valid training cells than this are skipped.
    pub min_training_cells: usize,
}

/// Full configuration surface of the core. Supplied at start; swappable only
/// between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsacConfig {
    pub sample_rate: f64,
    /// Frame length in samples at `sample_rate`.
    pub frame_len: u64,
    pub slots: SlotLengths,
    /// Residency of one beam inside the radar sub-slot, in samples.
    pub dwell_len: u64,
    pub num_dwells: usize,
    /// Length of one transmitted repetition (the matched-filter reference).
    pub pulse_len: usize,
    /// Repetitions coherently integrated per dwell.
    pub num_pulses: usize,
    pub bandwidth_hz: f64,
    pub carrier_hz: f64,
    /// Settling budget for a pre-loaded beam switch, in samples.
    pub switch_budget: u64,
    /// Settling budget for the immediate (not pre-loaded) fallback path.
    pub immediate_budget: u64,
    pub cfar: CfarParams,
    /// Fraction of each scan cycle granted to track-priority beams.
    pub priority_split: f64,
    /// Seconds of silence after which a track is dropped.
    pub track_timeout_s: f64,
    /// Angular gate for detection-to-track association, degrees.
    pub association_gate_deg: f32,
    /// Bounded length of each track's angle history.
    pub track_history: usize,
}

impl Default for IsacConfig {
    /// Hardware-verified operating point: 30.72 Msps, 10 ms frame, nine-beam
    /// sector scan, 50 us pre-loaded switching budget.
    fn default() -> Self {
        Self {
            sample_rate: 30.72e6,
            frame_len: 307_200,
            slots: SlotLengths {
                guard_pre: 1_536,
                radar: 61_440,
                guard_mid: 1_536,
                comms: 241_152,
                guard_post: 1_536,
            },
            dwell_len: 6_826,
            num_dwells: 9,
            pulse_len: 512,
            num_pulses: 13,
            bandwidth_hz: 20e6,
            carrier_hz: 28e9,
            switch_budget: 1_536,
            immediate_budget: 6_144,
            cfar: CfarParams {
                guard_cells: 2,
                training_cells: 8,
                pfa: 1e-3,
                min_training_cells: 16,
            },
            priority_split: 0.7,
            track_timeout_s: 1.0,
            association_gate_deg: 7.5,
            track_history: 16,
        }
    }
}

impl IsacConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.frame_len == 0 {
            return Err(CoreError::ConfigInvalid("frame length is zero".into()));
        }
        if self.slots.total() != self.frame_len {
            return Err(CoreError::ConfigInvalid(format!(
                "sub-slot lengths sum to {} but frame length is {}",
                self.slots.total(),
                self.frame_len
            )));
        }
        let dwell_total = self.dwell_len * self.num_dwells as u64;
        if dwell_total > self.slots.radar {
            return Err(CoreError::ConfigInvalid(format!(
                "{} dwells of {} samples exceed the {}-sample radar slot",
                self.num_dwells, self.dwell_len, self.slots.radar
            )));
        }
        let pulse_total = (self.pulse_len * self.num_pulses) as u64;
        if self.pulse_len == 0 || self.num_pulses == 0 || pulse_total > self.dwell_len {
            return Err(CoreError::ConfigInvalid(format!(
                "{} pulses of {} samples do not fit a {}-sample dwell",
                self.num_pulses, self.pulse_len, self.dwell_len
            )));
        }
        if !(self.cfar.pfa > 0.0 && self.cfar.pfa < 1.0) {
            return Err(CoreError::ConfigInvalid(format!(
                "pfa {} outside (0, 1)",
                self.cfar.pfa
            )));
        }
        if !(0.0..=1.0).contains(&self.priority_split) {
            return Err(CoreError::ConfigInvalid(format!(
                "priority split {} outside [0, 1]",
                self.priority_split
            )));
        }
        Ok(())
    }

    /// Pulse repetition frequency implied by the pulse spacing.
    pub fn prf_hz(&self) -> f64 {
        self.sample_rate / self.pulse_len as f64
    }

    /// Seconds represented by `samples` at the configured rate.
    pub fn seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate
    }
}
