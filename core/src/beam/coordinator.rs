use crate::beam::table::{BeamEntry, BeamTable};
use crate::prelude::{BeamId, CoreError, CoreResult, SlotKind};
use crate::telemetry::{CoreMetrics, LogManager};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Where in the frame an activation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotContext {
    pub frame_index: u64,
    pub slot: SlotKind,
    pub dwell_index: Option<usize>,
}

/// A steering request in flight. "Pending" until the matching
/// [`SteeringStatus`] arrives, then judged against its settling budget.
#[derive(Debug, Clone, Copy)]
pub struct SteeringCommand {
    pub beam_id: BeamId,
    pub issued_at: u64,
    pub immediate: bool,
}

/// Settle acknowledgement reported back by the beamformer driver.
#[derive(Debug, Clone, Copy)]
pub struct SteeringStatus {
    pub beam_id: BeamId,
    pub issued_at: u64,
    pub settled_at: u64,
}

/// Audit record of one beam activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationRecord {
    pub beam_id: BeamId,
    pub requested_at: u64,
    pub context: SlotContext,
}

/// External beamformer seam. `set_beam` must return immediately; settling is
/// reported asynchronously on the status channel handed to the driver.
pub trait BeamformerDriver: Send {
    fn set_beam(&mut self, entry: &BeamEntry, issued_at: u64) -> CoreResult<()>;
}

/// Channel pair connecting a driver's acknowledgements to the coordinator.
pub fn status_channel() -> (UnboundedSender<SteeringStatus>, UnboundedReceiver<SteeringStatus>) {
    mpsc::unbounded_channel()
}

/// Issues steering commands ahead of need and tracks their completion without
/// ever blocking the scheduling path.
struct PendingCommand {
    command: SteeringCommand,
    /// Set once the command has been charged as an overrun, so a late ack
    /// does not count the same miss twice.
    judged: bool,
}

pub struct BeamCoordinator {
    table: Arc<BeamTable>,
    driver: Box<dyn BeamformerDriver>,
    status_rx: UnboundedReceiver<SteeringStatus>,
    prepared: Option<BeamId>,
    pending: Option<PendingCommand>,
    active: Option<BeamId>,
    activations: Vec<ActivationRecord>,
    switch_budget: u64,
    immediate_budget: u64,
    metrics: Arc<CoreMetrics>,
    logger: LogManager,
}

impl BeamCoordinator {
    pub fn new(
        table: Arc<BeamTable>,
        driver: Box<dyn BeamformerDriver>,
        status_rx: UnboundedReceiver<SteeringStatus>,
        switch_budget: u64,
        immediate_budget: u64,
        metrics: Arc<CoreMetrics>,
    ) -> Self {
        Self {
            table,
            driver,
            status_rx,
            prepared: None,
            pending: None,
            active: None,
            activations: Vec::new(),
            switch_budget,
            immediate_budget,
            metrics,
            logger: LogManager::new(),
        }
    }

    /// Pushes the steering vector for a future activation. Does not change the
    /// active beam. A command still outstanding is judged before it is
    /// superseded, so its overrun cannot go unrecorded.
    pub fn prepare(&mut self, beam_id: BeamId, now: u64) -> CoreResult<()> {
        if !self.table.contains(beam_id) {
            return Err(CoreError::InvalidBeam(beam_id));
        }
        self.settle_outstanding(now);
        let entry = self.table.get(beam_id).ok_or(CoreError::InvalidBeam(beam_id))?;
        self.driver.set_beam(entry, now)?;
        self.prepared = Some(beam_id);
        self.pending = Some(PendingCommand {
            command: SteeringCommand {
                beam_id,
                issued_at: now,
                immediate: false,
            },
            judged: false,
        });
        Ok(())
    }

    /// Switches to the most recently prepared beam. Settling must land within
    /// the short pre-loaded budget; the budget is the hardware's contract, the
    /// coordinator only verifies it through the ack stream.
    pub fn activate_prepared(&mut self, now: u64, context: SlotContext) -> CoreResult<BeamId> {
        let beam_id = self
            .prepared
            .take()
            .ok_or_else(|| CoreError::ConfigInvalid("no beam prepared".into()))?;
        self.active = Some(beam_id);
        self.activations.push(ActivationRecord {
            beam_id,
            requested_at: now,
            context,
        });
        Ok(beam_id)
    }

    /// Fallback path when no beam was pre-loaded; allowed the longer budget.
    pub fn activate_immediate(
        &mut self,
        beam_id: BeamId,
        now: u64,
        context: SlotContext,
    ) -> CoreResult<()> {
        if !self.table.contains(beam_id) {
            return Err(CoreError::InvalidBeam(beam_id));
        }
        self.settle_outstanding(now);
        let entry = self.table.get(beam_id).ok_or(CoreError::InvalidBeam(beam_id))?;
        self.driver.set_beam(entry, now)?;
        self.pending = Some(PendingCommand {
            command: SteeringCommand {
                beam_id,
                issued_at: now,
                immediate: true,
            },
            judged: false,
        });
        self.active = Some(beam_id);
        self.activations.push(ActivationRecord {
            beam_id,
            requested_at: now,
            context,
        });
        Ok(())
    }

    /// Steers to the safe zero-angle position, used on stop.
    pub fn park(&mut self, now: u64, context: SlotContext) -> CoreResult<BeamId> {
        let beam_id = self.table.nearest(0.0);
        self.activate_immediate(beam_id, now, context)?;
        Ok(beam_id)
    }

    /// Drains settle acknowledgements and judges each against the budget of
    /// the command that produced it. Never blocks.
    pub fn poll_status(&mut self) {
        while let Ok(status) = self.status_rx.try_recv() {
            let Some(pending) = self.pending.as_ref() else {
                continue;
            };
            let command = pending.command;
            if command.beam_id != status.beam_id || command.issued_at != status.issued_at {
                continue;
            }
            let judged = pending.judged;
            self.pending = None;
            let latency = status.settled_at.saturating_sub(status.issued_at);
            if !judged && latency > self.budget_for(&command) {
                self.metrics.record_switch_overrun();
                self.logger.alert(&format!(
                    "{} settled in {} samples, budget {}",
                    status.beam_id,
                    latency,
                    self.budget_for(&command)
                ));
            }
        }
    }

    /// Real-time-path check at an activation boundary: if the outstanding
    /// command has already exceeded its budget, charge the overrun now and
    /// keep scheduling. Returns the offending beam, if any.
    pub fn check_overrun_at(&mut self, now: u64) -> Option<BeamId> {
        let switch_budget = self.switch_budget;
        let immediate_budget = self.immediate_budget;
        let pending = self.pending.as_mut()?;
        let budget = if pending.command.immediate {
            immediate_budget
        } else {
            switch_budget
        };
        let elapsed = now.saturating_sub(pending.command.issued_at);
        if pending.judged || elapsed <= budget {
            return None;
        }
        pending.judged = true;
        self.metrics.record_switch_overrun();
        self.logger.alert(&format!(
            "{} not settled after {} samples, budget {}",
            pending.command.beam_id, elapsed, budget
        ));
        Some(pending.command.beam_id)
    }

    /// True while a steering command is awaiting its acknowledgement.
    pub fn pending(&self) -> bool {
        self.pending.is_some()
    }

    fn budget_for(&self, command: &SteeringCommand) -> u64 {
        if command.immediate {
            self.immediate_budget
        } else {
            self.switch_budget
        }
    }

    pub fn active(&self) -> Option<BeamId> {
        self.active
    }

    pub fn prepared(&self) -> Option<BeamId> {
        self.prepared
    }

    pub fn activations(&self) -> &[ActivationRecord] {
        &self.activations
    }

    pub fn table(&self) -> &BeamTable {
        &self.table
    }

    /// Resolves or judges whatever command is still in flight before a new
    /// one takes its slot.
    fn settle_outstanding(&mut self, now: u64) {
        self.poll_status();
        let _ = self.check_overrun_at(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingDriver {
        tx: UnboundedSender<SteeringStatus>,
        settle: u64,
        issued: Vec<BeamId>,
    }

    impl BeamformerDriver for RecordingDriver {
        fn set_beam(&mut self, entry: &BeamEntry, issued_at: u64) -> CoreResult<()> {
            self.issued.push(entry.id);
            let _ = self.tx.send(SteeringStatus {
                beam_id: entry.id,
                issued_at,
                settled_at: issued_at + self.settle,
            });
            Ok(())
        }
    }

    fn coordinator(settle: u64) -> (BeamCoordinator, Arc<CoreMetrics>) {
        let table = Arc::new(BeamTable::uniform_linear(9, 90.0, 16));
        let metrics = Arc::new(CoreMetrics::new());
        let (tx, rx) = status_channel();
        let driver = Box::new(RecordingDriver {
            tx,
            settle,
            issued: Vec::new(),
        });
        (
            BeamCoordinator::new(table, driver, rx, 100, 500, metrics.clone()),
            metrics,
        )
    }

    fn ctx() -> SlotContext {
        SlotContext {
            frame_index: 0,
            slot: SlotKind::Radar,
            dwell_index: Some(0),
        }
    }

    #[test]
    fn unknown_beam_is_rejected_and_state_unchanged() {
        let (mut coord, _) = coordinator(10);
        coord.activate_immediate(BeamId(2), 0, ctx()).unwrap();
        let err = coord.prepare(BeamId(99), 10).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBeam(BeamId(99))));
        assert_eq!(coord.active(), Some(BeamId(2)));
        assert!(coord.prepared().is_none());
    }

    #[test]
    fn prepare_then_activate_switches_beam() {
        let (mut coord, _) = coordinator(10);
        coord.prepare(BeamId(3), 0).unwrap();
        assert!(coord.active().is_none());
        let activated = coord.activate_prepared(50, ctx()).unwrap();
        assert_eq!(activated, BeamId(3));
        assert_eq!(coord.active(), Some(BeamId(3)));
        assert_eq!(coord.activations().len(), 1);
    }

    #[test]
    fn ack_within_budget_clears_pending_without_overrun() {
        let (mut coord, metrics) = coordinator(10);
        coord.prepare(BeamId(1), 0).unwrap();
        assert!(coord.pending());
        coord.poll_status();
        assert!(!coord.pending());
        assert_eq!(metrics.snapshot().switch_overruns, 0);
    }

    #[test]
    fn late_ack_counts_overrun() {
        let (mut coord, metrics) = coordinator(400);
        coord.prepare(BeamId(1), 0).unwrap();
        coord.poll_status();
        assert_eq!(metrics.snapshot().switch_overruns, 1);
    }

    #[test]
    fn immediate_path_gets_longer_budget() {
        let (mut coord, metrics) = coordinator(400);
        coord.activate_immediate(BeamId(1), 0, ctx()).unwrap();
        coord.poll_status();
        assert_eq!(metrics.snapshot().switch_overruns, 0);
    }

    struct SilentDriver;

    impl BeamformerDriver for SilentDriver {
        fn set_beam(&mut self, _entry: &BeamEntry, _issued_at: u64) -> CoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn boundary_check_charges_missing_ack_once() {
        let table = Arc::new(BeamTable::uniform_linear(9, 90.0, 16));
        let metrics = Arc::new(CoreMetrics::new());
        let (_tx, rx) = status_channel();
        let mut coord =
            BeamCoordinator::new(table, Box::new(SilentDriver), rx, 100, 500, metrics.clone());
        coord.prepare(BeamId(2), 0).unwrap();
        assert!(coord.check_overrun_at(50).is_none());
        assert_eq!(coord.check_overrun_at(200), Some(BeamId(2)));
        assert!(coord.check_overrun_at(300).is_none());
        assert_eq!(metrics.snapshot().switch_overruns, 1);
    }

    #[test]
    fn superseded_stale_command_is_charged_before_replacement() {
        let table = Arc::new(BeamTable::uniform_linear(9, 90.0, 16));
        let metrics = Arc::new(CoreMetrics::new());
        let (_tx, rx) = status_channel();
        let mut coord =
            BeamCoordinator::new(table, Box::new(SilentDriver), rx, 100, 500, metrics.clone());
        coord.activate_immediate(BeamId(1), 0, ctx()).unwrap();
        // the hold never settles; issuing the next command judges it first
        coord.prepare(BeamId(2), 1_000).unwrap();
        assert_eq!(metrics.snapshot().switch_overruns, 1);
        // the fresh command is the only one pending afterwards
        assert!(coord.check_overrun_at(1_050).is_none());
        assert_eq!(coord.check_overrun_at(2_000), Some(BeamId(2)));
    }

    #[test]
    fn park_steers_to_boresight() {
        let (mut coord, _) = coordinator(10);
        let parked = coord.park(0, ctx()).unwrap();
        assert_eq!(parked, BeamId(4));
    }
}
