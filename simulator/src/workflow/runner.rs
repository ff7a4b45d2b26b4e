use crate::driver::SimBeamformer;
use crate::generator::chirp::linear_chirp;
use crate::generator::scene::ScenePlayback;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use isaccore::beam::{status_channel, BeamCoordinator, BeamTable};
use isaccore::detect::CfarDetector;
use isaccore::pipeline::{CapturedDwell, DwellProcessor, DwellQueue, ScanCube};
use isaccore::prelude::{ModeTag, SlotKind};
use isaccore::schedule::{FramePlan, FrameScheduler, SchedulerEvent};
use isaccore::stream::ScanReport;
use isaccore::telemetry::{CoreMetrics, MetricsSnapshot};
use isaccore::track::{ScanStrategy, TrackSet};
use log::info;
use std::sync::Arc;

/// Capture granularity of the simulated receive stream.
const BLOCK_LEN: u64 = 4_096;

pub struct RunSummary {
    pub frames: u64,
    pub dwell_activations: usize,
    pub comms_entries: usize,
    /// Samples handed through untouched to the communication stack.
    pub comms_samples: u64,
    pub reports: Vec<ScanReport>,
    pub metrics: MetricsSnapshot,
}

/// Wires the full loop together: scheduler and coordinator on the capture
/// side, queue hand-off, range-Doppler processing, detection, tracking, and
/// the track-fed scan order for the next cycle.
#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<RunSummary> {
        let radio = &self.config.radio;
        radio
            .validate()
            .context("validating radio configuration")?;

        let table = Arc::new(BeamTable::uniform_linear(
            self.config.beam_count,
            self.config.scan_span_deg,
            self.config.array_elements,
        ));
        let metrics = Arc::new(CoreMetrics::new());
        let (tx, rx) = status_channel();
        let driver = SimBeamformer::new(tx, self.config.settle_samples);
        let mut coordinator = BeamCoordinator::new(
            table.clone(),
            Box::new(driver),
            rx,
            radio.switch_budget,
            radio.immediate_budget,
            metrics.clone(),
        );
        let plan = FramePlan::new(radio).context("building frame plan")?;
        let mut scheduler =
            FrameScheduler::new(plan, table.default_order(), table.nearest(0.0), metrics.clone())
                .context("building frame scheduler")?;
        let mut processor = DwellProcessor::new(radio, metrics.clone());
        let detector = CfarDetector::new(radio.cfar, &processor, metrics.clone());
        let mut tracks =
            TrackSet::new(radio.association_gate_deg, radio.track_timeout_s, radio.track_history);
        let strategy = ScanStrategy::new(radio.priority_split);
        let queue = DwellQueue::new(self.config.queue_capacity, metrics.clone());
        let mut scene =
            ScenePlayback::new(self.config.scene.clone(), radio.sample_rate, radio.carrier_hz);
        let reference = linear_chirp(radio.pulse_len, radio.sample_rate, radio.bandwidth_hz);

        let mut reports = Vec::new();
        let mut dwell_activations = 0usize;
        let mut comms_entries = 0usize;
        let mut comms_samples = 0u64;

        for frame in 0..self.config.frames {
            let frame_start = frame * radio.frame_len;
            let frame_end = frame_start + radio.frame_len;
            let mut position = frame_start;
            while position < frame_end {
                let block_end = (position + BLOCK_LEN).min(frame_end);
                for event in scheduler.advance_to(block_end, &mut coordinator) {
                    match event {
                        SchedulerEvent::DwellStarted {
                            at,
                            dwell_index,
                            beam_id,
                        } => {
                            dwell_activations += 1;
                            let azimuth_deg = table
                                .get(beam_id)
                                .map(|entry| entry.azimuth_deg)
                                .unwrap_or(0.0);
                            let samples =
                                scene.dwell_samples(azimuth_deg, &reference, radio.num_pulses);
                            queue.push(CapturedDwell {
                                cycle_index: frame,
                                dwell_index,
                                beam_id,
                                azimuth_deg,
                                captured_at: at,
                                samples,
                            });
                        }
                        SchedulerEvent::SlotEntered {
                            kind: SlotKind::Comms,
                            ..
                        } => comms_entries += 1,
                        _ => {}
                    }
                }
                position = block_end;
            }

            // tag only after the frame has been advanced, so radar tags carry
            // the scan order latched at this frame's start
            comms_samples += scheduler
                .tag_block(frame_start..frame_end)
                .iter()
                .filter(|(_, tag)| *tag == ModeTag::Comms)
                .map(|(range, _)| range.end - range.start)
                .sum::<u64>();

            let mut cube = ScanCube::new(frame);
            while let Some(dwell) = queue.pop() {
                let slice = processor.process_dwell(
                    &dwell.samples,
                    &reference,
                    dwell.beam_id,
                    dwell.azimuth_deg,
                );
                cube.push(slice);
            }
            let detections = detector.detect_cube(&cube);
            let now_s = radio.seconds(frame_end);
            tracks.associate(&detections, now_s);
            if let Some(strongest) = detections.first() {
                scheduler.set_best_beam(strongest.beam_id);
            }
            scheduler.set_scan_order(strategy.next_scan_order(&tracks, &table, now_s));
            info!("cycle {} produced {} detections", frame, detections.len());
            reports.push(ScanReport {
                cycle_index: frame,
                completed_at: frame_end,
                detections,
                degraded: metrics.degraded(),
            });
        }

        Ok(RunSummary {
            frames: self.config.frames,
            dwell_activations,
            comms_entries,
            comms_samples,
            reports,
            metrics: metrics.snapshot(),
        })
    }
}
