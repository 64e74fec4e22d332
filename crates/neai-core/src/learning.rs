//! Learning progress bookkeeping

use serde::{Deserialize, Serialize};
use crate::error::{NeaiError, NeaiResult};

/// Progress value at which learning is complete
pub const LEARNING_COMPLETE: f32 = 100.0;

/// Counter of learned samples against the target announced by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    counter: u32,
    target: f32,
    progress: f32,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start learning towards `target` samples
    pub fn start(&mut self, target: f32) -> NeaiResult<()> {
        if !target.is_finite() || target <= 0.0 {
            return Err(NeaiError::InvalidLearningTarget { target });
        }
        self.counter = 0;
        self.progress = 0.0;
        self.target = target;
        Ok(())
    }

    /// Account for one learned sample and return the progress percentage.
    ///
    /// Progress is computed from the counter before it is incremented, so
    /// the first sample reports 0% and the `target + 1`-th reports 100%.
    pub fn record_sample(&mut self) -> f32 {
        if self.target <= 0.0 {
            return 0.0;
        }
        let progress = (self.counter as f32 * 100.0 / self.target).min(LEARNING_COMPLETE);
        // Progress never goes backwards between resets
        self.progress = self.progress.max(progress);
        self.counter += 1;
        self.progress
    }

    /// Take a progress percentage reported by a device that counts itself
    pub fn observe(&mut self, progress: f32) {
        self.progress = progress.clamp(0.0, LEARNING_COMPLETE);
    }

    /// Forget everything; used on any connection failure
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_target(&self) -> bool {
        self.target > 0.0
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= LEARNING_COMPLETE
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}
