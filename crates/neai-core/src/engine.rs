//! Anomaly detection engine seam

use serde::{Deserialize, Serialize};
use crate::error::NeaiResult;
use crate::reading::SampleBuffer;

/// Outcome of a learning call as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnStatus {
    pub status: String,
}

impl LearnStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}

/// Learns a baseline from sample buffers and scores new ones against it
pub trait AnomalyEngine: Send {
    /// Reset the engine's knowledge
    fn initialize(&mut self) -> NeaiResult<()>;

    /// Feed one nominal buffer into the baseline
    fn learn(&mut self, buffer: &SampleBuffer) -> NeaiResult<LearnStatus>;

    /// Similarity of `buffer` to the learned baseline, 0 to 100
    fn detect(&mut self, buffer: &SampleBuffer) -> NeaiResult<f32>;
}

impl<T: AnomalyEngine + ?Sized> AnomalyEngine for Box<T> {
    fn initialize(&mut self) -> NeaiResult<()> {
        (**self).initialize()
    }

    fn learn(&mut self, buffer: &SampleBuffer) -> NeaiResult<LearnStatus> {
        (**self).learn(buffer)
    }

    fn detect(&mut self, buffer: &SampleBuffer) -> NeaiResult<f32> {
        (**self).detect(buffer)
    }
}
