pub mod chirp;
pub mod scene;
