use crate::prelude::{BeamId, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};

/// One row of the externally loaded scan table: pointing direction plus the
/// per-element steering vector sent to the beamformer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamEntry {
    pub id: BeamId,
    pub azimuth_deg: f32,
    pub elevation_deg: f32,
    /// Per-element phase settings, degrees.
    pub phase_deg: Vec<f32>,
    /// Per-element gain settings, dB.
    pub gain_db: Vec<f32>,
    pub expected_gain_db: f32,
    pub sidelobe_db: f32,
}

/// Ordered, read-only collection of beams for one run. The active table is
/// swapped whole between runs, never edited element-wise while in use.
#[derive(Debug, Clone)]
pub struct BeamTable {
    entries: Vec<BeamEntry>,
    index: HashMap<BeamId, usize>,
}

impl BeamTable {
    pub fn new(entries: Vec<BeamEntry>) -> CoreResult<Self> {
        if entries.is_empty() {
            return Err(CoreError::ConfigInvalid("scan table is empty".into()));
        }
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.id, position).is_some() {
                return Err(CoreError::ConfigInvalid(format!(
                    "duplicate {} in scan table",
                    entry.id
                )));
            }
        }
        Ok(Self { entries, index })
    }

    /// Sector-scan table with `count` beams spread evenly over `span_deg`
    /// centered on boresight, steered by a half-wavelength linear array of
    /// `elements` elements.
    pub fn uniform_linear(count: usize, span_deg: f32, elements: usize) -> Self {
        let entries = (0..count)
            .map(|i| {
                let azimuth_deg = if count > 1 {
                    -span_deg / 2.0 + span_deg * i as f32 / (count - 1) as f32
                } else {
                    0.0
                };
                let sin_az = azimuth_deg.to_radians().sin();
                let phase_deg = (0..elements)
                    .map(|k| -(180.0 * k as f32 * sin_az) % 360.0)
                    .collect();
                BeamEntry {
                    id: BeamId(i as u16),
                    azimuth_deg,
                    elevation_deg: 0.0,
                    phase_deg,
                    gain_db: vec![0.0; elements],
                    expected_gain_db: 10.0 * (elements as f32).log10(),
                    sidelobe_db: -13.2,
                }
            })
            .collect();
        Self::new(entries).expect("generated table has unique ids")
    }

    pub fn get(&self, id: BeamId) -> Option<&BeamEntry> {
        self.index.get(&id).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, id: BeamId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BeamEntry] {
        &self.entries
    }

    /// Beam whose nominal azimuth is closest to `azimuth_deg`.
    pub fn nearest(&self, azimuth_deg: f32) -> BeamId {
        self.entries
            .iter()
            .min_by(|a, b| {
                let da = (a.azimuth_deg - azimuth_deg).abs();
                let db = (b.azimuth_deg - azimuth_deg).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|entry| entry.id)
            .expect("table is never empty")
    }

    /// The default uniform-coverage sweep: table order.
    pub fn default_order(&self) -> Vec<BeamId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub fn from_json_reader<R: Read>(reader: R) -> CoreResult<Self> {
        let entries: Vec<BeamEntry> = serde_json::from_reader(reader)
            .map_err(|err| CoreError::ConfigInvalid(format!("scan table parse: {}", err)))?;
        Self::new(entries)
    }

    pub fn to_json_writer<W: Write>(&self, writer: W) -> CoreResult<()> {
        serde_json::to_writer_pretty(writer, &self.entries)
            .map_err(|err| CoreError::ConfigInvalid(format!("scan table encode: {}", err)))
    }
}
