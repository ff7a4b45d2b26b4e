use crate::prelude::BeamId;
use serde::{Deserialize, Serialize};

/// One detected target for a completed scan cycle. Detections are never
/// mutated, only superseded by the next cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub beam_id: BeamId,
    /// Angle inherited from the dwell's beam.
    pub azimuth_deg: f32,
    pub range_m: f64,
    pub velocity_mps: f64,
    pub snr_db: f32,
    /// In (0, 1]; reduced for detections out of partial (truncated) dwells.
    pub confidence: f32,
}

impl Detection {
    /// Output ordering: strongest first.
    pub fn sort_by_snr(detections: &mut [Detection]) {
        detections.sort_by(|a, b| {
            b.snr_db
                .partial_cmp(&a.snr_db)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorting_is_descending_by_snr() {
        let mut detections = vec![
            Detection {
                beam_id: BeamId(0),
                azimuth_deg: 0.0,
                range_m: 10.0,
                velocity_mps: 0.0,
                snr_db: 9.0,
                confidence: 1.0,
            },
            Detection {
                beam_id: BeamId(1),
                azimuth_deg: 5.0,
                range_m: 20.0,
                velocity_mps: 0.0,
                snr_db: 14.0,
                confidence: 1.0,
            },
        ];
        Detection::sort_by_snr(&mut detections);
        assert_eq!(detections[0].beam_id, BeamId(1));
    }
}
