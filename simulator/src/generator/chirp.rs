use num_complex::Complex32;
use std::f64::consts::PI;

/// Linear up-chirp reference waveform: unit magnitude, sweeping
/// `bandwidth_hz` over `pulse_len` samples.
pub fn linear_chirp(pulse_len: usize, sample_rate: f64, bandwidth_hz: f64) -> Vec<Complex32> {
    let duration = pulse_len as f64 / sample_rate;
    let rate = bandwidth_hz / duration;
    (0..pulse_len)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let phase = PI * rate * t * t;
            Complex32::new(phase.cos() as f32, phase.sin() as f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chirp_has_unit_magnitude() {
        let chirp = linear_chirp(512, 30.72e6, 20e6);
        assert_eq!(chirp.len(), 512);
        for sample in &chirp {
            assert!((sample.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn chirp_starts_at_zero_phase() {
        let chirp = linear_chirp(64, 30.72e6, 20e6);
        assert!((chirp[0].re - 1.0).abs() < 1e-6);
        assert!(chirp[0].im.abs() < 1e-6);
    }
}
