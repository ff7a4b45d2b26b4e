//! Real-time control and signal-processing core for the Rust TDM-ISAC
//! platform.
//!
//! A single RF front end alternates between radar sensing and data
//! communication inside a fixed periodic frame while a phased-array beam is
//! re-pointed in lock-step. The modules split along that seam: `schedule`
//! drives the frame state machine on the hard-real-time path, `beam` issues
//! steering commands ahead of need, `pipeline` and `detect` turn captured
//! dwells into a target list off the critical path, and `track` biases the
//! next scan toward angles where targets were seen.

pub mod beam;
pub mod config;
pub mod detect;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod schedule;
pub mod stream;
pub mod telemetry;
pub mod track;

pub use prelude::{BeamId, CalibrationHealth, CoreError, CoreResult, ModeTag, SlotKind};
