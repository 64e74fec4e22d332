//! Command line arguments

use std::path::PathBuf;
use clap::Parser;
use neai_monitor::{MonitorConfig, MonitorMode};

/// Port label used when the board is simulated
pub const SIMULATED_PORT: &str = "simulated";

#[derive(Parser, Debug)]
#[command(name = "neai-desktop", version, about = "NanoEdge AI anomaly detection display")]
pub struct Args {
    /// Serial device the board is attached to, e.g. /dev/ttyACM0 or COM3
    #[arg(long, required_unless_present = "simulate")]
    pub port: Option<String>,

    /// direct (library on board) or emulator (host runs the emulator)
    #[arg(long)]
    pub mode: Option<MonitorMode>,

    /// Path to the NanoEdge AI emulator binary
    #[arg(long)]
    pub emulator: Option<PathBuf>,

    /// Status value above which behaviour is usual
    #[arg(long)]
    pub threshold: Option<f32>,

    #[arg(long)]
    pub baud: Option<u32>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Drive the display from a simulated board instead of a serial port
    #[arg(long)]
    pub simulate: bool,
}

impl Args {
    /// Merge the configuration file (if any) with the flags and validate
    pub fn to_config(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => MonitorConfig::default(),
        };

        if let Some(port) = &self.port {
            config.link.port = port.clone();
        } else if self.simulate && config.link.port.is_empty() {
            config.link.port = SIMULATED_PORT.to_string();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(binary) = &self.emulator {
            config.emulator.binary = binary.clone();
        }
        if let Some(threshold) = self.threshold {
            config.alarm_threshold = threshold;
        }
        if let Some(baud) = self.baud {
            config.link.baud_rate = baud;
        }

        config.validate()?;
        Ok(config)
    }
}
