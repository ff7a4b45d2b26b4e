pub mod coordinator;
pub mod table;

pub use coordinator::{
    status_channel, ActivationRecord, BeamCoordinator, BeamformerDriver, SlotContext,
    SteeringCommand, SteeringStatus,
};
pub use table::{BeamEntry, BeamTable};
