pub mod strategy;
pub mod track;

pub use strategy::ScanStrategy;
pub use track::{TargetTrack, TrackSet};
