//! Pre-defined accelerometer vibration patterns

use std::f32::consts::PI;
use serde::{Deserialize, Serialize};

/// Resonance excited by impacts, kept below Nyquist at 1600 Hz sampling
const SHOCK_RESONANCE_HZ: f32 = 600.0;

/// Relative vibration amplitude per axis (x, y, z)
const AXIS_GAIN: [f32; 3] = [1.0, 0.6, 0.3];

/// Predefined machine vibration patterns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VibrationPattern {
    /// Machine at rest: gravity only
    Still,
    /// Healthy rotation: fundamental plus a weak second harmonic
    Nominal { frequency: f32, amplitude: f32 },
    /// Rotor imbalance: a strong half-speed component appears
    Unbalanced {
        frequency: f32,
        amplitude: f32,
        severity: f32,
    },
    /// Bearing defect: periodic impacts ringing at a high resonance
    Shock {
        frequency: f32,
        amplitude: f32,
        impact_rate: f32,
    },
}

impl VibrationPattern {
    /// Acceleration in g on `axis` at `time` seconds, without noise
    pub fn acceleration_at(&self, axis: usize, time: f32) -> f32 {
        let gain = AXIS_GAIN.get(axis).copied().unwrap_or(0.3);
        let gravity = if axis == 2 { 1.0 } else { 0.0 };

        let vibration = match self {
            VibrationPattern::Still => 0.0,

            VibrationPattern::Nominal { frequency, amplitude } => {
                Self::rotation(*frequency, *amplitude, time)
            }

            VibrationPattern::Unbalanced { frequency, amplitude, severity } => {
                let sub = severity * amplitude * (PI * frequency * time).sin();
                Self::rotation(*frequency, *amplitude, time) + sub
            }

            VibrationPattern::Shock { frequency, amplitude, impact_rate } => {
                let phase = (time * impact_rate).fract();
                let ring = 3.0 * amplitude * (-phase * 40.0).exp()
                    * (2.0 * PI * SHOCK_RESONANCE_HZ * time).sin();
                Self::rotation(*frequency, *amplitude, time) + ring
            }
        };

        gravity + gain * vibration
    }

    fn rotation(frequency: f32, amplitude: f32, time: f32) -> f32 {
        amplitude * (2.0 * PI * frequency * time).sin()
            + 0.2 * amplitude * (4.0 * PI * frequency * time).sin()
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, VibrationPattern::Unbalanced { .. } | VibrationPattern::Shock { .. })
    }

    /// Get pattern description
    pub fn description(&self) -> &'static str {
        match self {
            VibrationPattern::Still => "Machine stopped",
            VibrationPattern::Nominal { .. } => "Nominal rotation",
            VibrationPattern::Unbalanced { .. } => "Rotor imbalance",
            VibrationPattern::Shock { .. } => "Bearing impacts",
        }
    }

    /// Create common preset patterns
    pub fn presets() -> Vec<(&'static str, VibrationPattern)> {
        vec![
            ("Stopped", VibrationPattern::Still),
            ("Fan 50 Hz", VibrationPattern::Nominal { frequency: 50.0, amplitude: 0.3 }),
            ("Fan 50 Hz unbalanced", VibrationPattern::Unbalanced {
                frequency: 50.0, amplitude: 0.3, severity: 1.0
            }),
            ("Fan 50 Hz bearing wear", VibrationPattern::Shock {
                frequency: 50.0, amplitude: 0.3, impact_rate: 12.5
            }),
        ]
    }
}

impl Default for VibrationPattern {
    fn default() -> Self {
        VibrationPattern::Nominal { frequency: 50.0, amplitude: 0.3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_on_z_axis() {
        let still = VibrationPattern::Still;
        assert_eq!(still.acceleration_at(0, 0.3), 0.0);
        assert_eq!(still.acceleration_at(2, 0.3), 1.0);
    }

    #[test]
    fn test_nominal_is_bounded() {
        let pattern = VibrationPattern::default();
        for i in 0..1600 {
            let t = i as f32 / 1600.0;
            assert!(pattern.acceleration_at(0, t).abs() <= 0.3 * 1.2 + 1e-4);
        }
    }

    #[test]
    fn test_presets_cover_anomalies() {
        let presets = VibrationPattern::presets();
        assert!(presets.iter().any(|(_, p)| p.is_anomalous()));
        assert!(presets.iter().any(|(_, p)| !p.is_anomalous()));
        assert_eq!(presets[1].1.description(), "Nominal rotation");
    }
}
