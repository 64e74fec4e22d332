//! Simulated anomaly engine based on averaged magnitude spectra

use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;
use num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use tracing::debug;
use neai_core::{AnomalyEngine, LearnStatus, NeaiError, NeaiResult, SampleBuffer};

/// Relative spectral distance at which similarity drops to 50
const DISTANCE_SCALE: f32 = 0.5;

/// Learns the mean spectrum of nominal buffers and scores new buffers
/// by their distance to it.
pub struct SpectralModel {
    axis_count: usize,
    plans: HashMap<usize, Arc<dyn RealToComplex<f32>>>,
    baseline: Vec<f32>,
    learned: u32,
}

impl SpectralModel {
    pub fn new(axis_count: usize) -> Self {
        Self {
            axis_count: axis_count.max(1),
            plans: HashMap::new(),
            baseline: Vec::new(),
            learned: 0,
        }
    }

    pub fn reset(&mut self) {
        self.baseline.clear();
        self.learned = 0;
    }

    pub fn learned(&self) -> u32 {
        self.learned
    }

    fn plan(&mut self, len: usize) -> Arc<dyn RealToComplex<f32>> {
        self.plans
            .entry(len)
            .or_insert_with(|| RealFftPlanner::<f32>::new().plan_fft_forward(len))
            .clone()
    }

    /// Concatenated per-axis magnitude spectra of a Hann-windowed buffer
    pub fn signature(&mut self, buffer: &SampleBuffer) -> NeaiResult<Vec<f32>> {
        let mut signature = Vec::new();

        for axis in 0..self.axis_count {
            let samples = buffer.axis(axis, self.axis_count);
            let len = samples.len();
            if len < 2 {
                return Err(NeaiError::value_parse("", "buffer too short for a spectrum"));
            }

            let mean = samples.iter().sum::<f32>() / len as f32;
            let mut input: Vec<f32> = samples
                .iter()
                .enumerate()
                .map(|(i, s)| (s - mean) * hann(i, len))
                .collect();

            let plan = self.plan(len);
            let mut spectrum = plan.make_output_vec();
            plan.process(&mut input, &mut spectrum)
                .map_err(|e| NeaiError::EngineFailure {
                    command: "spectrum",
                    reason: e.to_string(),
                })?;

            signature.extend(spectrum.iter().map(|c| magnitude(c) / len as f32));
        }

        Ok(signature)
    }

    pub fn learn(&mut self, buffer: &SampleBuffer) -> NeaiResult<()> {
        let signature = self.signature(buffer)?;

        if self.baseline.len() != signature.len() {
            if !self.baseline.is_empty() {
                debug!("Buffer length changed, restarting baseline");
            }
            self.baseline = signature;
            self.learned = 1;
            return Ok(());
        }

        self.learned += 1;
        let weight = 1.0 / self.learned as f32;
        for (base, value) in self.baseline.iter_mut().zip(signature) {
            *base += (value - *base) * weight;
        }
        Ok(())
    }

    /// Similarity to the baseline, 0 to 100
    pub fn similarity(&mut self, buffer: &SampleBuffer) -> NeaiResult<f32> {
        if self.learned == 0 {
            return Err(NeaiError::EngineFailure {
                command: "detect",
                reason: "no baseline learned".to_string(),
            });
        }

        let signature = self.signature(buffer)?;
        if signature.len() != self.baseline.len() {
            return Err(NeaiError::value_parse("", "buffer length differs from learned buffers"));
        }

        let norm = l2(&self.baseline).max(f32::EPSILON);
        let distance = self
            .baseline
            .iter()
            .zip(&signature)
            .map(|(b, s)| (b - s) * (b - s))
            .sum::<f32>()
            .sqrt()
            / norm;

        let ratio = distance / DISTANCE_SCALE;
        Ok(100.0 / (1.0 + ratio * ratio))
    }
}

fn hann(i: usize, len: usize) -> f32 {
    0.5 - 0.5 * (2.0 * PI * i as f32 / (len - 1) as f32).cos()
}

fn magnitude(c: &Complex32) -> f32 {
    c.norm()
}

fn l2(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// In-process stand-in for the emulator binary
pub struct SimulatedEngine {
    model: SpectralModel,
}

impl SimulatedEngine {
    pub fn new(axis_count: usize) -> Self {
        Self {
            model: SpectralModel::new(axis_count),
        }
    }

    pub fn model(&self) -> &SpectralModel {
        &self.model
    }
}

impl AnomalyEngine for SimulatedEngine {
    fn initialize(&mut self) -> NeaiResult<()> {
        self.model.reset();
        Ok(())
    }

    fn learn(&mut self, buffer: &SampleBuffer) -> NeaiResult<LearnStatus> {
        self.model.learn(buffer)?;
        Ok(LearnStatus::new("success"))
    }

    fn detect(&mut self, buffer: &SampleBuffer) -> NeaiResult<f32> {
        self.model.similarity(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibration_patterns::VibrationPattern;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    const RATE: f32 = 1600.0;
    const LEN: usize = 512;

    fn buffer(pattern: VibrationPattern, start: f32, rng: &mut rand::rngs::StdRng) -> SampleBuffer {
        let noise = Normal::new(0.0, 0.01).unwrap();
        let mut values = Vec::with_capacity(LEN * 3);
        for i in 0..LEN {
            let t = start + i as f32 / RATE;
            for axis in 0..3 {
                values.push(pattern.acceleration_at(axis, t) + noise.sample(rng));
            }
        }
        SampleBuffer::new(values).unwrap()
    }

    #[test]
    fn test_nominal_scores_above_anomalies() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut engine = SimulatedEngine::new(3);
        engine.initialize().unwrap();

        let nominal = VibrationPattern::default();
        for k in 0..30 {
            engine.learn(&buffer(nominal, k as f32 * 0.32, &mut rng)).unwrap();
        }
        assert_eq!(engine.model().learned(), 30);

        let healthy = engine.detect(&buffer(nominal, 20.0, &mut rng)).unwrap();
        let unbalanced = engine
            .detect(&buffer(VibrationPattern::presets()[2].1, 21.0, &mut rng))
            .unwrap();
        let stopped = engine.detect(&buffer(VibrationPattern::Still, 22.0, &mut rng)).unwrap();

        assert!(healthy > 90.0, "healthy similarity {}", healthy);
        assert!(unbalanced < 60.0, "unbalanced similarity {}", unbalanced);
        assert!(stopped < 60.0, "stopped similarity {}", stopped);
    }

    #[test]
    fn test_detect_requires_baseline() {
        let mut engine = SimulatedEngine::new(3);
        let sample = SampleBuffer::new(vec![0.0; 30]).unwrap();
        assert!(engine.detect(&sample).is_err());
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut model = SpectralModel::new(1);
        model.learn(&SampleBuffer::new(vec![0.1, 0.4, -0.2, 0.3]).unwrap()).unwrap();
        assert!(model
            .similarity(&SampleBuffer::new(vec![0.1, 0.4, -0.2, 0.3, 0.0, 0.1]).unwrap())
            .is_err());
    }
}
