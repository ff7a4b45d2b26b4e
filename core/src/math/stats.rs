pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(values: &[f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f32>() / values.len() as f32
    }

    /// Linear power ratio expressed in decibels. Clamped away from zero so a
    /// silent cell never produces -inf.
    pub fn power_db(ratio: f32) -> f32 {
        10.0 * ratio.max(1e-12).log10()
    }
}
