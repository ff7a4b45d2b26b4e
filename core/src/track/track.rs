use crate::detect::Detection;
use std::collections::VecDeque;

/// Minimal single-target state: a bounded angle history used solely for
/// linear angle prediction. No Kalman, no multi-hypothesis.
#[derive(Debug, Clone)]
pub struct TargetTrack {
    id: u32,
    /// (azimuth_deg, seconds), oldest first, bounded.
    history: VecDeque<(f32, f64)>,
    capacity: usize,
    last_seen: f64,
}

impl TargetTrack {
    fn new(id: u32, azimuth_deg: f32, now: f64, capacity: usize) -> Self {
        let mut history = VecDeque::with_capacity(capacity);
        history.push_back((azimuth_deg, now));
        Self {
            id,
            history,
            capacity: capacity.max(2),
            last_seen: now,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    pub fn last_angle(&self) -> f32 {
        self.history.back().map(|&(angle, _)| angle).unwrap_or(0.0)
    }

    fn observe(&mut self, azimuth_deg: f32, now: f64) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back((azimuth_deg, now));
        self.last_seen = now;
    }

    /// Least-squares linear extrapolation of azimuth over the history.
    /// With fewer than two points the last known angle is returned unchanged.
    pub fn predict(&self, at: f64) -> f32 {
        if self.history.len() < 2 {
            return self.last_angle();
        }
        let n = self.history.len() as f64;
        let mean_t: f64 = self.history.iter().map(|&(_, t)| t).sum::<f64>() / n;
        let mean_a: f64 = self.history.iter().map(|&(a, _)| a as f64).sum::<f64>() / n;
        let mut covariance = 0.0f64;
        let mut variance = 0.0f64;
        for &(angle, time) in &self.history {
            let dt = time - mean_t;
            covariance += dt * (angle as f64 - mean_a);
            variance += dt * dt;
        }
        if variance <= f64::EPSILON {
            return self.last_angle();
        }
        let slope = covariance / variance;
        (mean_a + slope * (at - mean_t)) as f32
    }
}

/// Owns the live tracks and the association step, kept separate from
/// prediction so both can be exercised independently.
#[derive(Debug)]
pub struct TrackSet {
    tracks: Vec<TargetTrack>,
    next_id: u32,
    gate_deg: f32,
    timeout_s: f64,
    history: usize,
}

impl TrackSet {
    pub fn new(gate_deg: f32, timeout_s: f64, history: usize) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 0,
            gate_deg,
            timeout_s,
            history,
        }
    }

    pub fn tracks(&self) -> &[TargetTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Detection-to-track association by angular proximity. Each track claims
    /// at most one detection per cycle (strongest first, as delivered);
    /// unmatched detections open new tracks. Silent tracks are pruned.
    pub fn associate(&mut self, detections: &[Detection], now: f64) {
        let mut claimed = vec![false; self.tracks.len()];
        for detection in detections {
            let mut best: Option<(usize, f32)> = None;
            for (index, track) in self.tracks.iter().enumerate() {
                if claimed[index] {
                    continue;
                }
                let distance = (track.predict(now) - detection.azimuth_deg).abs();
                if distance > self.gate_deg {
                    continue;
                }
                if best.map_or(true, |(_, previous)| distance < previous) {
                    best = Some((index, distance));
                }
            }
            match best {
                Some((index, _)) => {
                    claimed[index] = true;
                    self.tracks[index].observe(detection.azimuth_deg, now);
                }
                None => {
                    let track =
                        TargetTrack::new(self.next_id, detection.azimuth_deg, now, self.history);
                    self.next_id = self.next_id.wrapping_add(1);
                    self.tracks.push(track);
                    claimed.push(true);
                }
            }
        }
        self.prune(now);
    }

    fn prune(&mut self, now: f64) {
        let timeout = self.timeout_s;
        self.tracks
            .retain(|track| now - track.last_seen() <= timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::BeamId;

    fn detection(azimuth_deg: f32) -> Detection {
        Detection {
            beam_id: BeamId(0),
            azimuth_deg,
            range_m: 100.0,
            velocity_mps: 0.0,
            snr_db: 15.0,
            confidence: 0.9,
        }
    }

    #[test]
    fn single_point_predicts_last_angle() {
        let mut set = TrackSet::new(7.5, 1.0, 8);
        set.associate(&[detection(12.0)], 0.0);
        assert_eq!(set.tracks()[0].predict(5.0), 12.0);
    }

    #[test]
    fn two_points_extrapolate_linearly() {
        let mut set = TrackSet::new(7.5, 10.0, 8);
        set.associate(&[detection(10.0)], 0.0);
        set.associate(&[detection(14.0)], 1.0);
        let predicted = set.tracks()[0].predict(2.0);
        assert!((predicted - 18.0).abs() < 1e-4);
    }

    #[test]
    fn detection_outside_gate_opens_new_track() {
        let mut set = TrackSet::new(5.0, 10.0, 8);
        set.associate(&[detection(0.0)], 0.0);
        set.associate(&[detection(20.0)], 1.0);
        assert_eq!(set.tracks().len(), 2);
    }

    #[test]
    fn silent_track_is_dropped_after_timeout() {
        let mut set = TrackSet::new(5.0, 1.0, 8);
        set.associate(&[detection(0.0)], 0.0);
        assert_eq!(set.tracks().len(), 1);
        set.associate(&[], 2.0);
        assert!(set.is_empty());
    }

    #[test]
    fn one_track_claims_one_detection_per_cycle() {
        let mut set = TrackSet::new(5.0, 10.0, 8);
        set.associate(&[detection(0.0)], 0.0);
        set.associate(&[detection(1.0), detection(-1.0)], 1.0);
        // the second detection could not re-claim the same track
        assert_eq!(set.tracks().len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut set = TrackSet::new(90.0, 100.0, 4);
        for step in 0..20 {
            set.associate(&[detection(step as f32)], step as f64);
        }
        assert_eq!(set.tracks().len(), 1);
        assert_eq!(set.tracks()[0].history.len(), 4);
    }
}
