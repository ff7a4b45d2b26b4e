use isaccore::pipeline::SPEED_OF_LIGHT;
use num_complex::Complex32;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One ideal point scatterer in the simulated scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointTarget {
    pub range_m: f64,
    pub velocity_mps: f64,
    pub azimuth_deg: f32,
    pub amplitude: f32,
}

/// Configuration for the synthetic echo generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub targets: Vec<PointTarget>,
    pub noise: f32,
    pub seed: u64,
    /// Half-power beamwidth of the simulated array pattern, degrees.
    pub beamwidth_deg: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            targets: vec![PointTarget {
                range_m: 150.0,
                velocity_mps: 0.0,
                azimuth_deg: 0.0,
                amplitude: 8.0,
            }],
            noise: 0.05,
            seed: 0,
            beamwidth_deg: 12.0,
        }
    }
}

/// Plays the configured scene back as dwell captures: delayed,
/// Doppler-rotated copies of the reference pulse, weighted by the array
/// pattern toward each target, plus receiver noise.
pub struct ScenePlayback {
    config: SceneConfig,
    rng: StdRng,
    sample_rate: f64,
    carrier_hz: f64,
}

impl ScenePlayback {
    pub fn new(config: SceneConfig, sample_rate: f64, carrier_hz: f64) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            sample_rate,
            carrier_hz,
        }
    }

    /// Gaussian main-lobe approximation of the array gain toward an angle
    /// `offset_deg` off beam center. Strictly decreasing in the offset
    /// magnitude, unity at boresight.
    pub fn beam_gain(beamwidth_deg: f32, offset_deg: f32) -> f32 {
        let sigma = (beamwidth_deg / 2.0).max(1e-3);
        (-(offset_deg * offset_deg) / (2.0 * sigma * sigma)).exp()
    }

    /// Samples received during one dwell pointed at `beam_azimuth_deg`.
    pub fn dwell_samples(
        &mut self,
        beam_azimuth_deg: f32,
        reference: &[Complex32],
        num_pulses: usize,
    ) -> Vec<Complex32> {
        let pulse_len = reference.len();
        let mut samples = vec![Complex32::new(0.0, 0.0); pulse_len * num_pulses];
        let wavelength = SPEED_OF_LIGHT / self.carrier_hz;
        let pri_s = pulse_len as f64 / self.sample_rate;

        for target in &self.config.targets {
            let delay =
                (2.0 * target.range_m / SPEED_OF_LIGHT * self.sample_rate).round() as usize;
            if delay >= pulse_len {
                continue;
            }
            let offset = target.azimuth_deg - beam_azimuth_deg;
            let amplitude = target.amplitude * Self::beam_gain(self.config.beamwidth_deg, offset);
            let doppler_hz = 2.0 * target.velocity_mps / wavelength;
            for pulse in 0..num_pulses {
                let phase = 2.0 * PI * doppler_hz * pulse as f64 * pri_s;
                let rotation =
                    Complex32::new(phase.cos() as f32, phase.sin() as f32) * amplitude;
                let base = pulse * pulse_len + delay;
                for (i, &value) in reference[..pulse_len - delay].iter().enumerate() {
                    samples[base + i] += value * rotation;
                }
            }
        }

        if self.config.noise > 0.0 {
            let noise = self.config.noise;
            for sample in samples.iter_mut() {
                sample.re += self.rng.gen_range(-noise..noise);
                sample.im += self.rng.gen_range(-noise..noise);
            }
        }
        samples
    }
}
