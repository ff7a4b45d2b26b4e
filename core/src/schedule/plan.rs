use crate::config::IsacConfig;
use crate::prelude::{CoreResult, SlotKind};

const SLOT_ORDER: [SlotKind; 5] = [
    SlotKind::GuardPre,
    SlotKind::Radar,
    SlotKind::GuardMid,
    SlotKind::Comms,
    SlotKind::GuardPost,
];

/// Precomputed, sample-exact slot and dwell boundaries of one frame.
///
/// Boundaries are fixed for the lifetime of the plan; a reconfiguration
/// builds a new plan between runs, never mid-frame.
#[derive(Debug, Clone)]
pub struct FramePlan {
    frame_len: u64,
    starts: [u64; 5],
    ends: [u64; 5],
    dwell_len: u64,
    num_dwells: usize,
    /// Sorted within-frame offsets at which a slot or dwell begins.
    boundaries: Vec<u64>,
}

impl FramePlan {
    pub fn new(config: &IsacConfig) -> CoreResult<Self> {
        config.validate()?;
        let lengths = [
            config.slots.guard_pre,
            config.slots.radar,
            config.slots.guard_mid,
            config.slots.comms,
            config.slots.guard_post,
        ];
        let mut starts = [0u64; 5];
        let mut ends = [0u64; 5];
        let mut cursor = 0u64;
        for (i, len) in lengths.iter().enumerate() {
            starts[i] = cursor;
            cursor += len;
            ends[i] = cursor;
        }

        let mut boundaries: Vec<u64> = starts.to_vec();
        let radar_start = starts[1];
        for dwell in 1..config.num_dwells {
            boundaries.push(radar_start + dwell as u64 * config.dwell_len);
        }
        boundaries.sort_unstable();
        boundaries.dedup();

        Ok(Self {
            frame_len: config.frame_len,
            starts,
            ends,
            dwell_len: config.dwell_len,
            num_dwells: config.num_dwells,
            boundaries,
        })
    }

    pub fn frame_len(&self) -> u64 {
        self.frame_len
    }

    pub fn num_dwells(&self) -> usize {
        self.num_dwells
    }

    pub fn dwell_len(&self) -> u64 {
        self.dwell_len
    }

    /// Sub-slot containing the given within-frame offset.
    pub fn slot_at(&self, offset: u64) -> SlotKind {
        debug_assert!(offset < self.frame_len);
        for (i, kind) in SLOT_ORDER.iter().enumerate() {
            if offset < self.ends[i] {
                return *kind;
            }
        }
        SlotKind::GuardPost
    }

    pub fn slot_bounds(&self, kind: SlotKind) -> (u64, u64) {
        let i = SLOT_ORDER.iter().position(|&k| k == kind).unwrap_or(0);
        (self.starts[i], self.ends[i])
    }

    /// Non-empty slot beginning exactly at `offset`. Zero-length guards never
    /// occur, so at most one slot starts at any offset.
    pub fn slot_starting_at(&self, offset: u64) -> Option<SlotKind> {
        SLOT_ORDER
            .iter()
            .enumerate()
            .find(|&(i, _)| self.starts[i] == offset && self.ends[i] > self.starts[i])
            .map(|(_, &kind)| kind)
    }

    /// Dwell index covering `offset`, if the offset lies inside the dwelled
    /// part of the radar slot (the remainder is idle guard).
    pub fn dwell_at(&self, offset: u64) -> Option<usize> {
        let (radar_start, radar_end) = self.slot_bounds(SlotKind::Radar);
        if offset < radar_start || offset >= radar_end {
            return None;
        }
        let index = ((offset - radar_start) / self.dwell_len) as usize;
        (index < self.num_dwells).then_some(index)
    }

    /// Dwell index beginning exactly at `offset`, if any.
    pub fn dwell_starting_at(&self, offset: u64) -> Option<usize> {
        let (radar_start, _) = self.slot_bounds(SlotKind::Radar);
        if offset < radar_start {
            return None;
        }
        let rel = offset - radar_start;
        (rel % self.dwell_len == 0)
            .then(|| (rel / self.dwell_len) as usize)
            .filter(|&index| index < self.num_dwells)
    }

    /// Within-frame offset at which the dwell begins.
    pub fn dwell_start(&self, index: usize) -> u64 {
        let (radar_start, _) = self.slot_bounds(SlotKind::Radar);
        radar_start + index as u64 * self.dwell_len
    }

    /// Smallest absolute boundary position at or after `abs`.
    pub fn next_boundary_at_or_after(&self, abs: u64) -> u64 {
        let frame = abs / self.frame_len;
        let offset = abs % self.frame_len;
        match self.boundaries.iter().find(|&&b| b >= offset) {
            Some(&b) => frame * self.frame_len + b,
            None => (frame + 1) * self.frame_len,
        }
    }

    /// Within-frame offset where the tag region containing `offset` ends:
    /// the end of the current dwell inside radar, otherwise the end of the
    /// current slot.
    pub fn region_end(&self, offset: u64) -> u64 {
        let kind = self.slot_at(offset);
        let (start, end) = self.slot_bounds(kind);
        if kind != SlotKind::Radar {
            return end;
        }
        match self.dwell_at(offset) {
            Some(index) => (start + (index as u64 + 1) * self.dwell_len).min(end),
            // idle tail after the last dwell
            None => end,
        }
    }
}
