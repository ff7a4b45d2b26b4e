use std::f32::consts::PI;

/// Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f32> {
    raised_cosine(n, 0.5, 0.5)
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f32> {
    raised_cosine(n, 0.54, 0.46)
}

fn raised_cosine(n: usize, a0: f32, a1: f32) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| a0 - a1 * (2.0 * PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}
