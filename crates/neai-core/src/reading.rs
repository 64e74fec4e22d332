//! Values read from the serial link

use serde::{Deserialize, Serialize};
use crate::error::{NeaiError, NeaiResult};

/// Offset the firmware and the emulator demo add to similarity scores,
/// so that 0..=100 similarity lands in 100..=200.
pub const SIMILARITY_OFFSET: f32 = 100.0;

/// Single numeric value obtained per loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f32,
}

impl Reading {
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    /// Parse one trimmed serial line as a decimal value
    pub fn parse(line: &str) -> NeaiResult<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(NeaiError::value_parse(line, "empty line"));
        }

        let value: f32 = trimmed
            .parse()
            .map_err(|_| NeaiError::value_parse(line, "not a decimal number"))?;

        if !value.is_finite() {
            return Err(NeaiError::value_parse(line, "value is not finite"));
        }

        Ok(Self { value })
    }

    /// Shift an engine similarity score into status-value space
    pub fn from_similarity(similarity: f32) -> Self {
        Self {
            value: similarity + SIMILARITY_OFFSET,
        }
    }
}

/// One emulator-mode line: whitespace-separated accelerometer samples
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    values: Vec<f32>,
}

impl SampleBuffer {
    pub fn new(values: Vec<f32>) -> NeaiResult<Self> {
        if values.is_empty() {
            return Err(NeaiError::value_parse("", "sample buffer is empty"));
        }
        Ok(Self { values })
    }

    /// Parse a line of decimal samples
    pub fn parse(line: &str) -> NeaiResult<Self> {
        let values = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| NeaiError::value_parse(line, "non-numeric sample"))
            })
            .collect::<NeaiResult<Vec<f32>>>()?;

        if values.is_empty() {
            return Err(NeaiError::value_parse(line, "sample buffer is empty"));
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples of one axis from an interleaved multi-axis buffer
    pub fn axis(&self, axis: usize, axis_count: usize) -> Vec<f32> {
        if axis_count == 0 || axis >= axis_count {
            return Vec::new();
        }
        self.values
            .iter()
            .skip(axis)
            .step_by(axis_count)
            .copied()
            .collect()
    }

    /// Samples rendered as command-line arguments
    pub fn to_args(&self) -> Vec<String> {
        self.values.iter().map(|v| v.to_string()).collect()
    }
}
