use isaccore::beam::{BeamEntry, BeamformerDriver, SteeringStatus};
use isaccore::prelude::CoreResult;
use log::debug;
use tokio::sync::mpsc::UnboundedSender;

/// Software beamformer stand-in. Accepts every steering command and reports
/// settling after a fixed number of samples on the status channel.
pub struct SimBeamformer {
    tx: UnboundedSender<SteeringStatus>,
    settle_samples: u64,
}

impl SimBeamformer {
    pub fn new(tx: UnboundedSender<SteeringStatus>, settle_samples: u64) -> Self {
        Self { tx, settle_samples }
    }
}

impl BeamformerDriver for SimBeamformer {
    fn set_beam(&mut self, entry: &BeamEntry, issued_at: u64) -> CoreResult<()> {
        debug!("steering {} to {:.2} deg", entry.id, entry.azimuth_deg);
        let _ = self.tx.send(SteeringStatus {
            beam_id: entry.id,
            issued_at,
            settled_at: issued_at + self.settle_samples,
        });
        Ok(())
    }
}
