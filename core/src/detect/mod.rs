pub mod cfar;
pub mod detection;

pub use cfar::CfarDetector;
pub use detection::Detection;
