use crate::beam::BeamTable;
use crate::prelude::BeamId;
use crate::track::track::TrackSet;

/// Turns track predictions into the next scan order: beams covering
/// predicted targets are front-loaded, the rest of the sweep follows.
pub struct ScanStrategy {
    priority_split: f64,
}

impl ScanStrategy {
    pub fn new(priority_split: f64) -> Self {
        Self {
            priority_split: priority_split.clamp(0.0, 1.0),
        }
    }

    /// With no live tracks the full configured sweep runs in default order.
    /// Otherwise each track's predicted angle maps to its nearest beam and
    /// those priority beams take the first `round(split * n)` slots, truncated
    /// if tracks outnumber the allotment (the surplus beams rejoin the sweep);
    /// surveillance beams fill the rest in default order, skipping beams
    /// already scheduled.
    pub fn next_scan_order(&self, tracks: &TrackSet, table: &BeamTable, now: f64) -> Vec<BeamId> {
        let sweep = table.default_order();
        if tracks.is_empty() {
            return sweep;
        }

        let mut priority: Vec<BeamId> = Vec::new();
        for track in tracks.tracks() {
            let beam = table.nearest(track.predict(now));
            if !priority.contains(&beam) {
                priority.push(beam);
            }
        }

        let slots = sweep.len();
        let priority_slots = ((self.priority_split * slots as f64).round() as usize).clamp(1, slots);
        let mut order: Vec<BeamId> = Vec::with_capacity(slots);
        order.extend(priority.into_iter().take(priority_slots));

        for beam in sweep {
            if order.len() == slots {
                break;
            }
            if !order.contains(&beam) {
                order.push(beam);
            }
        }
        order
    }
}
