pub mod dwell;
pub mod map;
pub mod queue;

pub use dwell::{DwellProcessor, SPEED_OF_LIGHT};
pub use map::{RangeDopplerSlice, ScanCube};
pub use queue::{CapturedDwell, DwellQueue};
