//! Simulated vibration sensor board speaking the firmware's serial protocol

use std::time::Duration;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use neai_core::{LineSource, NeaiResult, SampleBuffer, SIMILARITY_OFFSET};
use crate::spectral_engine::SpectralModel;
use crate::vibration_patterns::VibrationPattern;

/// Which firmware build the board is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceProtocol {
    /// Library on board: prints learning progress, then similarity + 100
    Library,
    /// Emulator on host: prints the learning number, then raw buffers
    Emulator,
}

/// Configuration for the simulated board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub protocol: DeviceProtocol,
    /// Number of buffers the board asks to learn
    pub learning_number: u32,
    /// Samples per axis in one buffer
    pub buffer_size: usize,
    pub axis_count: usize,
    pub sampling_rate: f32,
    pub nominal: VibrationPattern,
    pub anomalous: VibrationPattern,
    /// Probability that a post-learning buffer is anomalous
    pub anomaly_probability: f32,
    /// Gaussian sensor noise in g
    pub noise_std: f32,
    /// Pause before each line, standing in for acquisition time
    pub line_interval_ms: u64,
    /// Stop talking after this many lines
    pub silent_after: Option<u64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            protocol: DeviceProtocol::Emulator,
            learning_number: 90,
            buffer_size: 512,
            axis_count: 3,
            sampling_rate: 1600.0,
            nominal: VibrationPattern::default(),
            anomalous: VibrationPattern::Unbalanced {
                frequency: 50.0,
                amplitude: 0.3,
                severity: 1.0,
            },
            anomaly_probability: 0.25,
            noise_std: 0.01,
            line_interval_ms: 100,
            silent_after: None,
            seed: None,
        }
    }
}

/// Simulated board implementing the serial line protocol
pub struct DeviceSimulator {
    config: DeviceConfig,
    rng: rand::rngs::StdRng,
    noise_std: f32,
    time: f32,
    lines_sent: u64,
    buffers_sent: u32,
    model: SpectralModel,
}

impl DeviceSimulator {
    pub fn new(config: DeviceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };
        let noise_std = if config.noise_std.is_finite() { config.noise_std.max(0.0) } else { 0.0 };
        let model = SpectralModel::new(config.axis_count);

        info!(
            "Simulated {:?} board: {} learning buffers of {}x{} samples",
            config.protocol, config.learning_number, config.buffer_size, config.axis_count
        );

        Self {
            config,
            rng,
            noise_std,
            time: 0.0,
            lines_sent: 0,
            buffers_sent: 0,
            model,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn lines_sent(&self) -> u64 {
        self.lines_sent
    }

    /// Acquire one interleaved buffer with the given pattern
    fn acquire(&mut self, pattern: VibrationPattern) -> Vec<f32> {
        let dt = 1.0 / self.config.sampling_rate;
        let mut values = Vec::with_capacity(self.config.buffer_size * self.config.axis_count);
        for i in 0..self.config.buffer_size {
            let t = self.time + i as f32 * dt;
            for axis in 0..self.config.axis_count {
                let noise: f32 = self.rng.sample(StandardNormal);
                values.push(pattern.acceleration_at(axis, t) + noise * self.noise_std);
            }
        }
        self.time += self.config.buffer_size as f32 * dt;
        self.buffers_sent += 1;
        values
    }

    /// Pattern for the next buffer: nominal while learning, then sometimes faulty
    fn next_pattern(&mut self) -> VibrationPattern {
        let learning = self.buffers_sent <= self.config.learning_number;
        if !learning && self.rng.gen::<f32>() < self.config.anomaly_probability {
            self.config.anomalous
        } else {
            self.config.nominal
        }
    }

    fn next_emulator_line(&mut self) -> String {
        if self.lines_sent == 0 {
            return self.config.learning_number.to_string();
        }
        let pattern = self.next_pattern();
        let values = self.acquire(pattern);
        format_buffer(&values)
    }

    fn next_library_line(&mut self) -> NeaiResult<String> {
        let learned = self.buffers_sent;
        let pattern = self.next_pattern();
        let buffer = SampleBuffer::new(self.acquire(pattern))?;

        if learned < self.config.learning_number {
            self.model.learn(&buffer)?;
            let progress = learned * 100 / self.config.learning_number;
            return Ok(progress.to_string());
        }

        let similarity = self.model.similarity(&buffer)?;
        Ok(format!("{}", similarity.round() as i32 + SIMILARITY_OFFSET as i32))
    }
}

/// Buffers are printed with four decimals, space separated
pub fn format_buffer(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl LineSource for DeviceSimulator {
    fn read_line(&mut self) -> NeaiResult<Option<String>> {
        let interval = Duration::from_millis(self.config.line_interval_ms);
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }

        if let Some(limit) = self.config.silent_after {
            if self.lines_sent >= limit {
                debug!("Simulated board is silent");
                return Ok(None);
            }
        }

        let line = match self.config.protocol {
            DeviceProtocol::Emulator => self.next_emulator_line(),
            DeviceProtocol::Library => self.next_library_line()?,
        };
        self.lines_sent += 1;
        Ok(Some(line))
    }

    fn describe(&self) -> String {
        format!("simulated {:?} board", self.config.protocol).to_lowercase()
    }
}
