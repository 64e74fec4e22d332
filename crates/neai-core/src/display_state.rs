//! Display states and the status classifier

use serde::{Deserialize, Serialize};
use crate::learning::LEARNING_COMPLETE;
use crate::reading::SIMILARITY_OFFSET;

/// Status values at or below this (and at least 100) are anomalies
pub const ALARM_THRESHOLD: f32 = 190.0;

/// Why nothing is being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdleReason {
    /// Initial screen, waiting for the device to start
    Ready,
    /// The device was talking and stopped making sense
    ConnectionLost,
}

/// What the screen should show for the current iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DisplayState {
    Idle(IdleReason),
    Learning { progress: f32 },
    Normal { value: f32 },
    Anomaly { value: f32 },
}

impl DisplayState {
    pub const READY: DisplayState = DisplayState::Idle(IdleReason::Ready);
    pub const CONNECTION_LOST: DisplayState = DisplayState::Idle(IdleReason::ConnectionLost);

    pub fn is_idle(&self) -> bool {
        matches!(self, DisplayState::Idle(_))
    }

    /// Status value for detection states
    pub fn detection_value(&self) -> Option<f32> {
        match self {
            DisplayState::Normal { value } | DisplayState::Anomaly { value } => Some(*value),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayState::Idle(IdleReason::Ready) => "Ready",
            DisplayState::Idle(IdleReason::ConnectionLost) => "Connection lost",
            DisplayState::Learning { .. } => "Learning",
            DisplayState::Normal { .. } => "Normal",
            DisplayState::Anomaly { .. } => "Anomaly",
        }
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        DisplayState::READY
    }
}

/// Maps a status value and learning progress onto a display state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusClassifier {
    pub alarm_threshold: f32,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self {
            alarm_threshold: ALARM_THRESHOLD,
        }
    }
}

impl StatusClassifier {
    pub fn new(alarm_threshold: f32) -> Self {
        Self { alarm_threshold }
    }

    pub fn classify(&self, value: f32, progress: f32) -> DisplayState {
        if progress > 0.0 && progress < LEARNING_COMPLETE {
            return DisplayState::Learning { progress };
        }

        if progress >= LEARNING_COMPLETE {
            if (SIMILARITY_OFFSET..=self.alarm_threshold).contains(&value) {
                return DisplayState::Anomaly { value };
            }
            if value > self.alarm_threshold {
                return DisplayState::Normal { value };
            }
        }

        DisplayState::READY
    }

    /// Classify a value printed by firmware that runs the library itself.
    /// Values below 100 are its learning progress.
    pub fn classify_status_value(&self, value: f32) -> DisplayState {
        let progress = if value < LEARNING_COMPLETE {
            value
        } else {
            LEARNING_COMPLETE
        };
        self.classify(value, progress)
    }
}

/// Classify with the default alarm threshold
pub fn classify(value: f32, progress: f32) -> DisplayState {
    StatusClassifier::default().classify(value, progress)
}
