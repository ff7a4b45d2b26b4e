use crate::beam::{BeamCoordinator, SlotContext};
use crate::prelude::{BeamId, CalibrationHealth, CoreError, CoreResult, ModeTag, SlotKind};
use crate::schedule::plan::FramePlan;
use crate::telemetry::{CoreMetrics, LogManager};
use std::ops::Range;
use std::sync::Arc;

/// Exactly-once notifications emitted at slot and dwell boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    SlotEntered {
        at: u64,
        frame_index: u64,
        kind: SlotKind,
    },
    DwellStarted {
        at: u64,
        dwell_index: usize,
        beam_id: BeamId,
    },
    SwitchOverrun {
        at: u64,
        beam_id: BeamId,
    },
    Parked {
        at: u64,
        beam_id: BeamId,
    },
    Stopped {
        at: u64,
    },
}

/// Drives the TDM frame in lock-step with the running sample count.
///
/// The scheduler never blocks and never waits for the beamformer: a pending
/// steering command at a boundary is charged as an overrun and scheduling
/// proceeds. All boundary evaluation is idempotent per sample position.
pub struct FrameScheduler {
    plan: FramePlan,
    /// Next sample position not yet evaluated.
    cursor: u64,
    scan_order: Vec<BeamId>,
    pending_order: Option<Vec<BeamId>>,
    best_beam: BeamId,
    calibration: CalibrationHealth,
    pending_calibration: Option<CalibrationHealth>,
    stop_requested: bool,
    stopped: bool,
    metrics: Arc<CoreMetrics>,
    logger: LogManager,
}

impl FrameScheduler {
    pub fn new(
        plan: FramePlan,
        scan_order: Vec<BeamId>,
        best_beam: BeamId,
        metrics: Arc<CoreMetrics>,
    ) -> CoreResult<Self> {
        if scan_order.is_empty() {
            return Err(CoreError::ConfigInvalid("scan order is empty".into()));
        }
        Ok(Self {
            plan,
            cursor: 0,
            scan_order,
            pending_order: None,
            best_beam,
            calibration: CalibrationHealth::Good,
            pending_calibration: None,
            stop_requested: false,
            stopped: false,
            metrics,
            logger: LogManager::new(),
        })
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    pub fn scan_order(&self) -> &[BeamId] {
        &self.scan_order
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Installs a new scan order; takes effect at the next scan-cycle
    /// (frame) boundary, never inside a radar slot.
    pub fn set_scan_order(&mut self, order: Vec<BeamId>) {
        if order.is_empty() {
            self.logger.alert("ignoring empty scan order");
            return;
        }
        self.pending_order = Some(order);
    }

    /// Beam held during comms slots, normally the strongest recent detection.
    pub fn set_best_beam(&mut self, beam_id: BeamId) {
        self.best_beam = beam_id;
    }

    /// Calibration gate: `Warn` halves the dwell duty, `Fail` idles the radar
    /// slot entirely. Applied at the next frame boundary.
    pub fn set_calibration(&mut self, health: CalibrationHealth) {
        self.pending_calibration = Some(health);
    }

    /// Stop is honored at the next sub-slot boundary at the latest; the beam
    /// is parked at the safe zero-angle position before the machine halts.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Evaluates every boundary in `[cursor, target)` exactly once and emits
    /// the corresponding events. Re-invoking with the same target emits
    /// nothing further.
    pub fn advance_to(
        &mut self,
        target: u64,
        coordinator: &mut BeamCoordinator,
    ) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        if self.stopped {
            return events;
        }
        while self.cursor < target {
            let boundary = self.plan.next_boundary_at_or_after(self.cursor);
            if boundary >= target {
                break;
            }
            self.handle_boundary(boundary, coordinator, &mut events);
            self.cursor = boundary + 1;
            if self.stopped {
                return events;
            }
        }
        self.cursor = self.cursor.max(target);
        events
    }

    /// The sample stream is gone: park and halt immediately, then hand the
    /// fatal error upward. Unlike the soft conditions this one ends the run.
    pub fn stream_lost(
        &mut self,
        at: u64,
        reason: &str,
        coordinator: &mut BeamCoordinator,
    ) -> (Vec<SchedulerEvent>, CoreError) {
        let mut events = Vec::new();
        if !self.stopped {
            let frame_index = at / self.plan.frame_len();
            let slot = self.plan.slot_at(at % self.plan.frame_len());
            self.halt(at, frame_index, slot, coordinator, &mut events);
        }
        (events, CoreError::StreamLost(reason.into()))
    }

    /// Mode tags for an absolute sample range, split wherever the tag
    /// changes. Pure with respect to the current plan, scan order, and
    /// calibration duty.
    pub fn tag_block(&self, range: Range<u64>) -> Vec<(Range<u64>, ModeTag)> {
        let frame_len = self.plan.frame_len();
        let mut tags: Vec<(Range<u64>, ModeTag)> = Vec::new();
        let mut pos = range.start;
        while pos < range.end {
            let frame_start = pos - pos % frame_len;
            let offset = pos % frame_len;
            let tag = self.tag_at(offset);
            let region_end = (frame_start + self.plan.region_end(offset)).min(range.end);
            match tags.last_mut() {
                Some((prev_range, prev_tag)) if *prev_tag == tag => {
                    prev_range.end = region_end;
                }
                _ => tags.push((pos..region_end, tag)),
            }
            pos = region_end;
        }
        tags
    }

    fn tag_at(&self, offset: u64) -> ModeTag {
        match self.plan.slot_at(offset) {
            SlotKind::Comms => ModeTag::Comms,
            SlotKind::Radar => match self.plan.dwell_at(offset) {
                Some(index) if self.dwell_active(index) => ModeTag::Radar {
                    dwell_index: index,
                    beam_id: self.beam_for_dwell(index),
                },
                _ => ModeTag::Guard,
            },
            _ => ModeTag::Guard,
        }
    }

    fn handle_boundary(
        &mut self,
        at: u64,
        coordinator: &mut BeamCoordinator,
        events: &mut Vec<SchedulerEvent>,
    ) {
        let frame_len = self.plan.frame_len();
        let frame_index = at / frame_len;
        let offset = at % frame_len;

        if offset == 0 {
            if let Some(health) = self.pending_calibration.take() {
                self.calibration = health;
                self.logger
                    .record(&format!("calibration gate now {:?}", health));
            }
            if let Some(order) = self.pending_order.take() {
                self.scan_order = order;
            }
            if frame_index > 0 {
                self.metrics.record_frame_completed();
            }
        }

        if let Some(kind) = self.plan.slot_starting_at(offset) {
            if self.stop_requested {
                self.halt(at, frame_index, kind, coordinator, events);
                return;
            }
            self.metrics.record_slot_transition();
            events.push(SchedulerEvent::SlotEntered {
                at,
                frame_index,
                kind,
            });
            match kind {
                SlotKind::GuardPre => self.preload_first_dwell(at, coordinator),
                SlotKind::Comms => self.hold_best_beam(at, frame_index, coordinator),
                _ => {}
            }
        }

        if let Some(index) = self.plan.dwell_starting_at(offset) {
            self.handle_dwell(at, frame_index, index, coordinator, events);
        }
    }

    fn handle_dwell(
        &mut self,
        at: u64,
        frame_index: u64,
        index: usize,
        coordinator: &mut BeamCoordinator,
        events: &mut Vec<SchedulerEvent>,
    ) {
        if !self.dwell_active(index) {
            return;
        }
        coordinator.poll_status();
        if let Some(beam_id) = coordinator.check_overrun_at(at) {
            events.push(SchedulerEvent::SwitchOverrun { at, beam_id });
        }

        let beam_id = self.beam_for_dwell(index);
        let context = SlotContext {
            frame_index,
            slot: SlotKind::Radar,
            dwell_index: Some(index),
        };
        let activation = if coordinator.prepared() == Some(beam_id) {
            coordinator.activate_prepared(at, context).map(|_| ())
        } else {
            coordinator.activate_immediate(beam_id, at, context)
        };
        if let Err(err) = activation {
            self.logger
                .alert(&format!("dwell {} activation failed: {}", index, err));
            return;
        }
        events.push(SchedulerEvent::DwellStarted {
            at,
            dwell_index: index,
            beam_id,
        });

        if let Some(next) = self.next_active_dwell(index) {
            let next_beam = self.beam_for_dwell(next);
            if let Err(err) = coordinator.prepare(next_beam, at) {
                self.logger
                    .alert(&format!("pre-load of {} failed: {}", next_beam, err));
            }
        }
    }

    fn preload_first_dwell(&mut self, at: u64, coordinator: &mut BeamCoordinator) {
        let Some(first) = self.first_active_dwell() else {
            return;
        };
        let beam_id = self.beam_for_dwell(first);
        if let Err(err) = coordinator.prepare(beam_id, at) {
            self.logger
                .alert(&format!("pre-load of {} failed: {}", beam_id, err));
        }
    }

    fn hold_best_beam(&mut self, at: u64, frame_index: u64, coordinator: &mut BeamCoordinator) {
        if coordinator.active() == Some(self.best_beam) {
            return;
        }
        let context = SlotContext {
            frame_index,
            slot: SlotKind::Comms,
            dwell_index: None,
        };
        if let Err(err) = coordinator.activate_immediate(self.best_beam, at, context) {
            self.logger
                .alert(&format!("comms hold at {} failed: {}", self.best_beam, err));
        }
    }

    fn halt(
        &mut self,
        at: u64,
        frame_index: u64,
        slot: SlotKind,
        coordinator: &mut BeamCoordinator,
        events: &mut Vec<SchedulerEvent>,
    ) {
        let context = SlotContext {
            frame_index,
            slot,
            dwell_index: None,
        };
        match coordinator.park(at, context) {
            Ok(beam_id) => events.push(SchedulerEvent::Parked { at, beam_id }),
            Err(err) => self.logger.alert(&format!("park failed: {}", err)),
        }
        events.push(SchedulerEvent::Stopped { at });
        self.stopped = true;
        self.logger.record("scheduler stopped");
    }

    fn dwell_active(&self, index: usize) -> bool {
        match self.calibration {
            CalibrationHealth::Good => true,
            CalibrationHealth::Warn => index % 2 == 0,
            CalibrationHealth::Fail => false,
        }
    }

    fn beam_for_dwell(&self, index: usize) -> BeamId {
        self.scan_order[index % self.scan_order.len()]
    }

    fn first_active_dwell(&self) -> Option<usize> {
        (0..self.plan.num_dwells()).find(|&index| self.dwell_active(index))
    }

    fn next_active_dwell(&self, index: usize) -> Option<usize> {
        (index + 1..self.plan.num_dwells()).find(|&next| self.dwell_active(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::{status_channel, BeamEntry, BeamTable, BeamformerDriver, SteeringStatus};
    use crate::config::IsacConfig;
    use crate::prelude::CoreResult;
    use tokio::sync::mpsc::UnboundedSender;

    struct InstantDriver {
        tx: UnboundedSender<SteeringStatus>,
        settle: u64,
    }

    impl BeamformerDriver for InstantDriver {
        fn set_beam(&mut self, entry: &BeamEntry, issued_at: u64) -> CoreResult<()> {
            let _ = self.tx.send(SteeringStatus {
                beam_id: entry.id,
                issued_at,
                settled_at: issued_at + self.settle,
            });
            Ok(())
        }
    }

    fn rig(settle: u64) -> (FrameScheduler, BeamCoordinator, Arc<CoreMetrics>) {
        let config = IsacConfig::default();
        let table = Arc::new(BeamTable::uniform_linear(9, 90.0, 16));
        let metrics = Arc::new(CoreMetrics::new());
        let (tx, rx) = status_channel();
        let coordinator = BeamCoordinator::new(
            table.clone(),
            Box::new(InstantDriver { tx, settle }),
            rx,
            config.switch_budget,
            config.immediate_budget,
            metrics.clone(),
        );
        let plan = FramePlan::new(&config).unwrap();
        let scheduler =
            FrameScheduler::new(plan, table.default_order(), BeamId(4), metrics.clone()).unwrap();
        (scheduler, coordinator, metrics)
    }

    fn dwell_starts(events: &[SchedulerEvent]) -> Vec<(usize, BeamId)> {
        events
            .iter()
            .filter_map(|event| match event {
                SchedulerEvent::DwellStarted {
                    dwell_index,
                    beam_id,
                    ..
                } => Some((*dwell_index, *beam_id)),
                _ => None,
            })
            .collect()
    }

    fn slot_entries(events: &[SchedulerEvent]) -> Vec<SlotKind> {
        events
            .iter()
            .filter_map(|event| match event {
                SchedulerEvent::SlotEntered { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_frame_emits_nine_activations_and_one_comms_entry() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        let events = scheduler.advance_to(307_200, &mut coordinator);

        let dwells = dwell_starts(&events);
        assert_eq!(dwells.len(), 9);
        let expected: Vec<BeamId> = (0..9).map(|i| BeamId(i as u16)).collect();
        let observed: Vec<BeamId> = dwells.iter().map(|&(_, beam)| beam).collect();
        assert_eq!(observed, expected);

        let slots = slot_entries(&events);
        assert_eq!(
            slots,
            vec![
                SlotKind::GuardPre,
                SlotKind::Radar,
                SlotKind::GuardMid,
                SlotKind::Comms,
                SlotKind::GuardPost,
            ]
        );
        assert_eq!(
            slots.iter().filter(|&&k| k == SlotKind::Comms).count(),
            1
        );
        assert_eq!(coordinator.activations().len(), 10); // 9 dwells + comms hold
    }

    #[test]
    fn boundary_evaluation_is_idempotent() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        let first = scheduler.advance_to(70_000, &mut coordinator);
        assert!(!first.is_empty());
        let second = scheduler.advance_to(70_000, &mut coordinator);
        assert!(second.is_empty());
        let third = scheduler.advance_to(69_000, &mut coordinator);
        assert!(third.is_empty());
    }

    #[test]
    fn no_drift_after_many_frames() {
        let (mut scheduler, mut coordinator, metrics) = rig(100);
        let frames = 25u64;
        let mut activations = 0usize;
        for frame in 0..frames {
            let events = scheduler.advance_to((frame + 1) * 307_200, &mut coordinator);
            activations += dwell_starts(&events).len();
        }
        assert_eq!(activations, 9 * frames as usize);
        let snap = metrics.snapshot();
        assert_eq!(snap.slot_transitions, 5 * frames);
        assert_eq!(snap.frames_completed, frames - 1);
        assert_eq!(snap.switch_overruns, 0);
    }

    #[test]
    fn activation_order_follows_new_scan_order_next_cycle() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        scheduler.advance_to(100_000, &mut coordinator);
        let reordered: Vec<BeamId> = (0..9).rev().map(|i| BeamId(i as u16)).collect();
        scheduler.set_scan_order(reordered.clone());
        // rest of the current frame still uses the old order
        let events = scheduler.advance_to(307_200, &mut coordinator);
        assert!(dwell_starts(&events).is_empty());
        // next frame picks up the new order
        let events = scheduler.advance_to(2 * 307_200, &mut coordinator);
        let observed: Vec<BeamId> = dwell_starts(&events).iter().map(|&(_, b)| b).collect();
        assert_eq!(observed, reordered);
    }

    #[test]
    fn slow_switching_is_counted_not_blocking() {
        // settles far beyond both budgets
        let (mut scheduler, mut coordinator, metrics) = rig(50_000);
        let events = scheduler.advance_to(307_200, &mut coordinator);
        assert_eq!(dwell_starts(&events).len(), 9);
        assert!(metrics.snapshot().switch_overruns > 0);
    }

    struct MuteDriver;

    impl BeamformerDriver for MuteDriver {
        fn set_beam(&mut self, _entry: &BeamEntry, _issued_at: u64) -> CoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn unacknowledged_comms_hold_is_charged_next_frame() {
        let config = IsacConfig::default();
        let table = Arc::new(BeamTable::uniform_linear(9, 90.0, 16));
        let metrics = Arc::new(CoreMetrics::new());
        let (_tx, rx) = status_channel();
        let mut coordinator = BeamCoordinator::new(
            table.clone(),
            Box::new(MuteDriver),
            rx,
            config.switch_budget,
            config.immediate_budget,
            metrics.clone(),
        );
        let plan = FramePlan::new(&config).unwrap();
        let mut scheduler =
            FrameScheduler::new(plan, table.default_order(), BeamId(4), metrics.clone()).unwrap();

        scheduler.advance_to(307_200, &mut coordinator);
        // dwells 1..8 each judge the pre-load issued one dwell earlier
        assert_eq!(metrics.snapshot().switch_overruns, 8);
        // the comms hold never settled either; the next frame's pre-load
        // judges it instead of silently replacing it
        scheduler.advance_to(308_000, &mut coordinator);
        assert_eq!(metrics.snapshot().switch_overruns, 9);
    }

    #[test]
    fn tags_use_the_order_latched_at_frame_start() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        scheduler.advance_to(100, &mut coordinator);
        let reordered: Vec<BeamId> = (0..9).rev().map(|i| BeamId(i as u16)).collect();
        scheduler.set_scan_order(reordered);
        // the running frame still tags with the order it started with
        let tags = scheduler.tag_block(1_536..1_600);
        assert_eq!(
            tags[0].1,
            ModeTag::Radar {
                dwell_index: 0,
                beam_id: BeamId(0),
            }
        );
        // the swap lands at the next frame boundary
        scheduler.advance_to(307_201, &mut coordinator);
        let tags = scheduler.tag_block(308_736..308_800);
        assert_eq!(
            tags[0].1,
            ModeTag::Radar {
                dwell_index: 0,
                beam_id: BeamId(8),
            }
        );
    }

    #[test]
    fn calibration_warn_halves_duty_and_fail_idles_radar() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        scheduler.set_calibration(CalibrationHealth::Warn);
        let events = scheduler.advance_to(307_200, &mut coordinator);
        let dwells = dwell_starts(&events);
        assert_eq!(dwells.len(), 5); // dwells 0, 2, 4, 6, 8
        assert!(dwells.iter().all(|&(index, _)| index % 2 == 0));

        scheduler.set_calibration(CalibrationHealth::Fail);
        let events = scheduler.advance_to(2 * 307_200, &mut coordinator);
        assert!(dwell_starts(&events).is_empty());
        assert!(slot_entries(&events).contains(&SlotKind::Comms));
    }

    #[test]
    fn stop_parks_at_next_slot_boundary() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        scheduler.advance_to(10_000, &mut coordinator); // inside radar slot
        scheduler.request_stop();
        let events = scheduler.advance_to(307_200, &mut coordinator);
        let parked = events
            .iter()
            .any(|event| matches!(event, SchedulerEvent::Parked { beam_id, .. } if *beam_id == BeamId(4)));
        assert!(parked);
        assert!(matches!(events.last(), Some(SchedulerEvent::Stopped { at }) if *at == 62_976));
        assert!(scheduler.stopped());
        assert!(scheduler.advance_to(500_000, &mut coordinator).is_empty());
    }

    #[test]
    fn losing_the_stream_parks_and_halts() {
        let (mut scheduler, mut coordinator, _) = rig(100);
        scheduler.advance_to(10_000, &mut coordinator);
        let (events, err) = scheduler.stream_lost(10_000, "source closed", &mut coordinator);
        assert!(matches!(err, CoreError::StreamLost(_)));
        assert!(events
            .iter()
            .any(|event| matches!(event, SchedulerEvent::Parked { beam_id, .. } if *beam_id == BeamId(4))));
        assert!(scheduler.stopped());
        assert!(scheduler.advance_to(307_200, &mut coordinator).is_empty());
    }

    #[test]
    fn tag_block_partitions_frame_by_mode() {
        let (scheduler, _coordinator, _metrics) = rig(100);
        let tags = scheduler.tag_block(0..307_200);
        assert_eq!(tags.first().unwrap().1, ModeTag::Guard);
        assert_eq!(
            tags.iter()
                .filter(|(_, tag)| matches!(tag, ModeTag::Radar { .. }))
                .count(),
            9
        );
        assert!(tags
            .iter()
            .any(|(range, tag)| *tag == ModeTag::Comms && range.start == 64_512));
        let covered: u64 = tags.iter().map(|(range, _)| range.end - range.start).sum();
        assert_eq!(covered, 307_200);
    }

    #[test]
    fn tag_block_marks_idle_dwell_tail_as_guard() {
        let (scheduler, _coordinator, _metrics) = rig(100);
        // the 6 samples after the ninth dwell are idle guard
        let tags = scheduler.tag_block(1_536 + 9 * 6_826..62_976);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].1, ModeTag::Guard);
    }
}
