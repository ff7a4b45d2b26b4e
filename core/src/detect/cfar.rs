use crate::config::CfarParams;
use crate::detect::detection::Detection;
use crate::math::StatsHelper;
use crate::pipeline::{DwellProcessor, RangeDopplerSlice, ScanCube};
use crate::telemetry::CoreMetrics;
use std::sync::Arc;

struct Candidate {
    doppler_bin: usize,
    range_bin: usize,
    power: f32,
    snr: f32,
}

/// Two-dimensional CFAR over range-Doppler power maps.
///
/// The noise floor under each cell is the median of a training ring outside a
/// guard ring. The order statistic keeps the estimate anchored at the true
/// floor when sidelobes of a strong return leak into the ring, where a ring
/// mean would scale with the return and flatten every SNR toward the sidelobe
/// ratio. The threshold multiplier follows from the configured false alarm
/// probability under exponential noise statistics.
pub struct CfarDetector {
    params: CfarParams,
    range_bin_m: f64,
    velocity_bin_mps: f64,
    metrics: Arc<CoreMetrics>,
}

impl CfarDetector {
    pub fn new(params: CfarParams, processor: &DwellProcessor, metrics: Arc<CoreMetrics>) -> Self {
        Self {
            params,
            range_bin_m: processor.range_bin_m(),
            velocity_bin_mps: processor.velocity_bin_mps(),
            metrics,
        }
    }

    /// Threshold multiplier for `n` training cells: n * (pfa^(-1/n) - 1).
    fn threshold_factor(&self, training_count: usize) -> f32 {
        let n = training_count as f64;
        (n * (self.params.pfa.powf(-1.0 / n) - 1.0)) as f32
    }

    pub fn detect(&self, slice: &RangeDopplerSlice) -> Vec<Detection> {
        let candidates = self.scan_cells(slice);
        let kept = suppress_neighbors(candidates);

        let half_doppler = slice.doppler_bins() / 2;
        let confidence_scale = if slice.partial { 0.5 } else { 1.0 };
        let mut detections: Vec<Detection> = kept
            .into_iter()
            .map(|cell| Detection {
                beam_id: slice.beam_id,
                azimuth_deg: slice.azimuth_deg,
                range_m: cell.range_bin as f64 * self.range_bin_m,
                velocity_mps: (cell.doppler_bin as f64 - half_doppler as f64)
                    * self.velocity_bin_mps,
                snr_db: StatsHelper::power_db(cell.snr),
                confidence: confidence_scale * (1.0 - 1.0 / cell.snr.max(1.0)),
            })
            .collect();
        Detection::sort_by_snr(&mut detections);
        self.metrics.record_detections(detections.len());
        detections
    }

    /// Runs per-beam detection over a full scan cycle, strongest first.
    pub fn detect_cube(&self, cube: &ScanCube) -> Vec<Detection> {
        let mut detections: Vec<Detection> = cube
            .slices()
            .iter()
            .flat_map(|slice| self.detect(slice))
            .collect();
        Detection::sort_by_snr(&mut detections);
        detections
    }

    fn scan_cells(&self, slice: &RangeDopplerSlice) -> Vec<Candidate> {
        let rows = slice.doppler_bins();
        let cols = slice.range_bins();
        let guard = self.params.guard_cells as isize;
        let outer = guard + self.params.training_cells as isize;
        let mut candidates = Vec::new();
        let mut training: Vec<f32> = Vec::new();

        for doppler_bin in 0..rows {
            for range_bin in 0..cols {
                training.clear();
                for dd in -outer..=outer {
                    for dr in -outer..=outer {
                        if dd.abs() <= guard && dr.abs() <= guard {
                            continue;
                        }
                        let d = doppler_bin as isize + dd;
                        let r = range_bin as isize + dr;
                        if d < 0 || r < 0 || d >= rows as isize || r >= cols as isize {
                            continue;
                        }
                        training.push(slice.power[[d as usize, r as usize]]);
                    }
                }
                // incomplete statistics near the edges: skip, never flag
                if training.len() < self.params.min_training_cells {
                    continue;
                }
                let mid = training.len() / 2;
                let (_, median, _) = training.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
                let noise = *median;
                if noise <= 0.0 {
                    continue;
                }
                let power = slice.power[[doppler_bin, range_bin]];
                let threshold = noise * self.threshold_factor(training.len());
                if power > threshold {
                    candidates.push(Candidate {
                        doppler_bin,
                        range_bin,
                        power,
                        snr: power / noise,
                    });
                }
            }
        }
        candidates
    }
}

/// Non-maximum suppression: adjacent hits within one cell in both axes
/// collapse into the strongest, so one physical target yields one detection.
fn suppress_neighbors(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.power
            .partial_cmp(&a.power)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let shadowed = kept.iter().any(|winner| {
            winner.doppler_bin.abs_diff(candidate.doppler_bin) <= 1
                && winner.range_bin.abs_diff(candidate.range_bin) <= 1
        });
        if !shadowed {
            kept.push(candidate);
        }
    }
    kept
}
