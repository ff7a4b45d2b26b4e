use crate::prelude::BeamId;
use ndarray::Array2;

/// Per-dwell power map over (Doppler bin, range bin), tagged with the beam it
/// was captured on. Owned by the pipeline until handed to the detector.
#[derive(Debug, Clone)]
pub struct RangeDopplerSlice {
    pub beam_id: BeamId,
    pub azimuth_deg: f32,
    /// Squared-magnitude power, shape (doppler_bins, range_bins), zero
    /// Doppler centered.
    pub power: Array2<f32>,
    /// Set when the dwell was truncated and zero-padded; downstream treats
    /// the slice as lower confidence but still processes it.
    pub partial: bool,
}

impl RangeDopplerSlice {
    pub fn doppler_bins(&self) -> usize {
        self.power.nrows()
    }

    pub fn range_bins(&self) -> usize {
        self.power.ncols()
    }
}

/// One scan cycle's slices stacked along the beam axis.
#[derive(Debug, Default)]
pub struct ScanCube {
    pub cycle_index: u64,
    slices: Vec<RangeDopplerSlice>,
}

impl ScanCube {
    pub fn new(cycle_index: u64) -> Self {
        Self {
            cycle_index,
            slices: Vec::new(),
        }
    }

    pub fn push(&mut self, slice: RangeDopplerSlice) {
        self.slices.push(slice);
    }

    pub fn slices(&self) -> &[RangeDopplerSlice] {
        &self.slices
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}
