use crate::config::IsacConfig;
use crate::math::{window, FftHelper};
use crate::pipeline::map::RangeDopplerSlice;
use crate::prelude::BeamId;
use crate::telemetry::CoreMetrics;
use ndarray::Array2;
use num_complex::Complex32;
use std::sync::Arc;

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Turns one dwell's raw samples plus the transmitted reference into a
/// range-Doppler power slice.
///
/// Fast time: matched filter as a transform-domain multiply against the
/// conjugated reference spectrum. Slow time: Hann window, then a second
/// transform across repetitions, shifted so zero Doppler sits in the center
/// row.
pub struct DwellProcessor {
    pulse_len: usize,
    num_pulses: usize,
    range_fft: FftHelper,
    doppler_fft: FftHelper,
    slow_window: Vec<f32>,
    range_bin_m: f64,
    range_resolution_m: f64,
    velocity_bin_mps: f64,
    metrics: Arc<CoreMetrics>,
}

impl DwellProcessor {
    pub fn new(config: &IsacConfig, metrics: Arc<CoreMetrics>) -> Self {
        let doppler_bin_hz = config.prf_hz() / config.num_pulses as f64;
        let wavelength = SPEED_OF_LIGHT / config.carrier_hz;
        Self {
            pulse_len: config.pulse_len,
            num_pulses: config.num_pulses,
            range_fft: FftHelper::new(config.pulse_len),
            doppler_fft: FftHelper::new(config.num_pulses),
            slow_window: window::hann(config.num_pulses),
            range_bin_m: SPEED_OF_LIGHT / (2.0 * config.sample_rate),
            range_resolution_m: SPEED_OF_LIGHT / (2.0 * config.bandwidth_hz),
            velocity_bin_mps: doppler_bin_hz * wavelength / 2.0,
            metrics,
        }
    }

    /// Samples one dwell must deliver for a full set of repetitions.
    pub fn expected_samples(&self) -> usize {
        self.pulse_len * self.num_pulses
    }

    /// Range pitch of one fast-time bin. Bins advance at the sample clock,
    /// so the pitch is c / (2 * sample_rate) regardless of chirp bandwidth.
    pub fn range_bin_m(&self) -> f64 {
        self.range_bin_m
    }

    /// Waveform range resolution, c / (2 * bandwidth). Coarser than the bin
    /// pitch whenever the chirp is oversampled.
    pub fn range_resolution_m(&self) -> f64 {
        self.range_resolution_m
    }

    /// Radial velocity represented by one Doppler bin.
    pub fn velocity_bin_mps(&self) -> f64 {
        self.velocity_bin_mps
    }

    pub fn range_of_bin(&self, range_bin: usize) -> f64 {
        range_bin as f64 * self.range_bin_m
    }

    /// Velocity of a (shifted) Doppler row; the center row is zero.
    pub fn velocity_of_bin(&self, doppler_bin: usize) -> f64 {
        (doppler_bin as f64 - (self.num_pulses / 2) as f64) * self.velocity_bin_mps
    }

    pub fn process_dwell(
        &mut self,
        samples: &[Complex32],
        reference: &[Complex32],
        beam_id: BeamId,
        azimuth_deg: f32,
    ) -> RangeDopplerSlice {
        let expected = self.expected_samples();
        let partial = samples.len() < expected;
        if partial {
            self.metrics.record_truncated_dwell();
        }

        let mut padded = vec![Complex32::new(0.0, 0.0); expected];
        let copy = samples.len().min(expected);
        padded[..copy].copy_from_slice(&samples[..copy]);

        // conjugated reference spectrum for the matched filter
        let mut ref_spectrum = vec![Complex32::new(0.0, 0.0); self.pulse_len];
        let ref_copy = reference.len().min(self.pulse_len);
        ref_spectrum[..ref_copy].copy_from_slice(&reference[..ref_copy]);
        self.range_fft.forward(&mut ref_spectrum);
        for bin in ref_spectrum.iter_mut() {
            *bin = bin.conj();
        }

        // fast-time compression, one range profile per repetition
        let mut profiles = Array2::<Complex32>::zeros((self.num_pulses, self.pulse_len));
        let mut segment = vec![Complex32::new(0.0, 0.0); self.pulse_len];
        for pulse in 0..self.num_pulses {
            let start = pulse * self.pulse_len;
            segment.copy_from_slice(&padded[start..start + self.pulse_len]);
            self.range_fft.forward(&mut segment);
            for (bin, reference_bin) in segment.iter_mut().zip(&ref_spectrum) {
                *bin *= reference_bin;
            }
            self.range_fft.inverse(&mut segment);
            for (range_bin, value) in segment.iter().enumerate() {
                profiles[[pulse, range_bin]] = *value;
            }
        }

        // slow-time transform per range bin, zero Doppler centered
        let half = self.num_pulses / 2;
        let mut power = Array2::<f32>::zeros((self.num_pulses, self.pulse_len));
        let mut slow = vec![Complex32::new(0.0, 0.0); self.num_pulses];
        for range_bin in 0..self.pulse_len {
            for pulse in 0..self.num_pulses {
                slow[pulse] = profiles[[pulse, range_bin]] * self.slow_window[pulse];
            }
            self.doppler_fft.forward(&mut slow);
            for (doppler_bin, value) in slow.iter().enumerate() {
                let shifted = (doppler_bin + half) % self.num_pulses;
                power[[shifted, range_bin]] = value.norm_sqr();
            }
        }

        self.metrics.record_processed_dwell();
        RangeDopplerSlice {
            beam_id,
            azimuth_deg,
            power,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::BeamId;

    fn small_config() -> IsacConfig {
        let mut config = IsacConfig::default();
        config.pulse_len = 64;
        config.num_pulses = 8;
        config.dwell_len = 512;
        config
    }

    fn processor() -> DwellProcessor {
        DwellProcessor::new(&small_config(), Arc::new(CoreMetrics::new()))
    }

    fn reference(pulse_len: usize) -> Vec<Complex32> {
        // short linear up-chirp
        (0..pulse_len)
            .map(|i| {
                let t = i as f32 / pulse_len as f32;
                let phase = std::f32::consts::PI * 16.0 * t * t;
                Complex32::new(phase.cos(), phase.sin())
            })
            .collect()
    }

    fn delayed_dwell(reference: &[Complex32], pulses: usize, delay: usize) -> Vec<Complex32> {
        let pulse_len = reference.len();
        let mut samples = vec![Complex32::new(0.0, 0.0); pulse_len * pulses];
        for pulse in 0..pulses {
            for (i, &value) in reference.iter().enumerate() {
                let position = i + delay;
                if position < pulse_len {
                    samples[pulse * pulse_len + position] = value;
                }
            }
        }
        samples
    }

    #[test]
    fn exact_length_dwell_is_never_partial() {
        let mut proc = processor();
        let reference = reference(64);
        let samples = delayed_dwell(&reference, 8, 0);
        assert_eq!(samples.len(), proc.expected_samples());
        let slice = proc.process_dwell(&samples, &reference, BeamId(0), 0.0);
        assert!(!slice.partial);
    }

    #[test]
    fn one_sample_short_is_always_partial() {
        let metrics = Arc::new(CoreMetrics::new());
        let mut proc = DwellProcessor::new(&small_config(), metrics.clone());
        let reference = reference(64);
        let mut samples = delayed_dwell(&reference, 8, 0);
        samples.pop();
        let slice = proc.process_dwell(&samples, &reference, BeamId(0), 0.0);
        assert!(slice.partial);
        assert_eq!(metrics.snapshot().truncated_dwells, 1);
    }

    #[test]
    fn stationary_echo_peaks_at_delay_bin_and_zero_doppler() {
        let mut proc = processor();
        let reference = reference(64);
        let delay = 11usize;
        let samples = delayed_dwell(&reference, 8, delay);
        let slice = proc.process_dwell(&samples, &reference, BeamId(3), 15.0);

        let mut peak = (0usize, 0usize);
        let mut peak_power = f32::MIN;
        for doppler in 0..slice.doppler_bins() {
            for range in 0..slice.range_bins() {
                if slice.power[[doppler, range]] > peak_power {
                    peak_power = slice.power[[doppler, range]];
                    peak = (doppler, range);
                }
            }
        }
        assert_eq!(peak.1, delay);
        assert_eq!(peak.0, 4); // zero-Doppler row for 8 pulses
        assert_eq!(slice.beam_id, BeamId(3));
    }

    #[test]
    fn resolution_follows_bandwidth_and_prf() {
        let proc = processor();
        // bin pitch runs at the 30.72 Msps sample clock
        assert!((proc.range_bin_m() - 4.879_4).abs() < 1e-3);
        // c / (2 * 20 MHz) = 7.495 m
        assert!((proc.range_resolution_m() - 7.494_811).abs() < 1e-3);
        assert!(proc.velocity_bin_mps() > 0.0);
        assert_eq!(proc.velocity_of_bin(4), 0.0);
    }
}
