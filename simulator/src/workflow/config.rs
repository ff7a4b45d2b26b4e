use crate::generator::scene::SceneConfig;
use anyhow::Context;
use isaccore::config::IsacConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything one simulated run needs: the radio operating point handed to
/// the core, the scene played back into it, and the harness knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of frames (scan cycles) to simulate.
    pub frames: u64,
    /// Settling latency of the simulated beamformer, in samples.
    pub settle_samples: u64,
    /// Capacity of the capture-to-processing hand-off queue.
    pub queue_capacity: usize,
    pub radio: IsacConfig,
    pub scene: SceneConfig,
    pub beam_count: usize,
    pub scan_span_deg: f32,
    pub array_elements: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            frames: 4,
            settle_samples: 1_024,
            queue_capacity: 16,
            radio: IsacConfig::default(),
            scene: SceneConfig::default(),
            beam_count: 9,
            scan_span_deg: 90.0,
            array_elements: 16,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_radio_point_is_valid() {
        let cfg = WorkflowConfig::default();
        cfg.radio.validate().unwrap();
        assert_eq!(cfg.beam_count, 9);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"frames: 2\nsettle_samples: 512\n").unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.frames, 2);
        assert_eq!(cfg.settle_samples, 512);
        // unspecified fields fall back to the defaults
        assert_eq!(cfg.queue_capacity, 16);
    }
}
