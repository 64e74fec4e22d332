//! NEAI-Core: Foundation types for the NanoEdge AI monitor
//!
//! Readings, learning progress, display states and the status classifier,
//! plus the two seams the monitor loop is built on.

pub mod error;
pub mod reading;
pub mod learning;
pub mod display_state;
pub mod source;
pub mod engine;

pub use error::{NeaiError, NeaiResult};
pub use reading::*;
pub use learning::*;
pub use display_state::*;
pub use source::LineSource;
pub use engine::{AnomalyEngine, LearnStatus};
