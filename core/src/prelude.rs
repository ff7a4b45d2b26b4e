use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one entry in the loaded scan table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeamId(pub u16);

impl fmt::Display for BeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "beam#{}", self.0)
    }
}

/// Sub-slot of the TDM frame, in strict cyclic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    GuardPre,
    Radar,
    GuardMid,
    Comms,
    GuardPost,
}

impl SlotKind {
    pub fn next(self) -> SlotKind {
        match self {
            SlotKind::GuardPre => SlotKind::Radar,
            SlotKind::Radar => SlotKind::GuardMid,
            SlotKind::GuardMid => SlotKind::Comms,
            SlotKind::Comms => SlotKind::GuardPost,
            SlotKind::GuardPost => SlotKind::GuardPre,
        }
    }

    pub fn is_guard(self) -> bool {
        matches!(
            self,
            SlotKind::GuardPre | SlotKind::GuardMid | SlotKind::GuardPost
        )
    }
}

/// Per-sample-range annotation attached to the stream by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeTag {
    Guard,
    Radar { dwell_index: usize, beam_id: BeamId },
    Comms,
}

/// Calibration status supplied by the external calibration service.
///
/// The core only reacts to this signal; it never computes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationHealth {
    Good,
    Warn,
    Fail,
}

/// Hard failures of the core. Soft conditions (switch overruns, truncated
/// dwells, queue overflow) are telemetry counters, never errors.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("unknown {0}")]
    InvalidBeam(BeamId),
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("sample stream lost: {0}")]
    StreamLost(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
