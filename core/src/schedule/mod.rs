pub mod plan;
pub mod scheduler;

pub use plan::FramePlan;
pub use scheduler::{FrameScheduler, SchedulerEvent};
