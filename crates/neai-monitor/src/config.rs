//! Configuration management for the monitor

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use neai_core::{config_error, NeaiError, NeaiResult, StatusClassifier, ALARM_THRESHOLD};

/// Default emulator binary, relative to the working directory
pub const DEFAULT_EMULATOR_BINARY: &str = "./NanoEdgeAI_Emulator";

/// Who runs NanoEdge AI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// The firmware runs the library and prints status values
    Direct,
    /// The firmware prints raw buffers and the host runs the emulator
    Emulator,
}

impl MonitorMode {
    /// Hint shown on the ready screen
    pub fn start_hint(&self) -> &'static [&'static str] {
        match self {
            MonitorMode::Direct => &["Press User button to start."],
            MonitorMode::Emulator => &[
                "Press Reset button (black) then",
                "User button (blue) to start.",
            ],
        }
    }
}

impl fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorMode::Direct => write!(f, "direct"),
            MonitorMode::Emulator => write!(f, "emulator"),
        }
    }
}

impl FromStr for MonitorMode {
    type Err = NeaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "library" => Ok(MonitorMode::Direct),
            "emulator" => Ok(MonitorMode::Emulator),
            other => Err(config_error!("unknown mode '{}', expected direct or emulator", other)),
        }
    }
}

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device path, e.g. /dev/ttyACM0 or COM3
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115_200,
            read_timeout_ms: 1_000,
        }
    }
}

impl LinkConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// External emulator invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub binary: PathBuf,
    /// Directory to run the emulator in (defaults to the current one)
    pub working_dir: Option<PathBuf>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_EMULATOR_BINARY),
            working_dir: None,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub mode: MonitorMode,
    pub link: LinkConfig,
    pub emulator: EmulatorConfig,
    /// Status values in 100..=alarm_threshold are anomalies
    pub alarm_threshold: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Direct,
            link: LinkConfig::default(),
            emulator: EmulatorConfig::default(),
            alarm_threshold: ALARM_THRESHOLD,
        }
    }
}

impl MonitorConfig {
    /// Load a JSON configuration file; missing fields take their defaults.
    /// Not validated: command-line overrides usually follow.
    pub fn load(path: &Path) -> NeaiResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read {}: {}", path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| config_error!("cannot parse {}: {}", path.display(), e))
    }

    pub fn to_json(&self) -> NeaiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| config_error!("cannot serialize: {}", e))
    }

    pub fn validate(&self) -> NeaiResult<()> {
        if self.link.port.trim().is_empty() {
            return Err(config_error!("serial port is not set"));
        }
        if self.link.baud_rate == 0 {
            return Err(config_error!("baud rate must be positive"));
        }
        if self.link.read_timeout_ms == 0 {
            return Err(config_error!("read timeout must be positive"));
        }
        if !self.alarm_threshold.is_finite() || self.alarm_threshold <= 0.0 {
            return Err(config_error!("alarm threshold {} must be positive", self.alarm_threshold));
        }
        if self.mode == MonitorMode::Emulator && self.emulator.binary.as_os_str().is_empty() {
            return Err(config_error!("emulator binary is not set"));
        }
        Ok(())
    }

    pub fn classifier(&self) -> StatusClassifier {
        StatusClassifier::new(self.alarm_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> MonitorConfig {
        MonitorConfig {
            link: LinkConfig {
                port: "/dev/ttyACM0".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.link.baud_rate, 115_200);
        assert_eq!(config.link.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.alarm_threshold, 190.0);
        assert_eq!(config.emulator.binary, PathBuf::from("./NanoEdgeAI_Emulator"));
    }

    #[test]
    fn test_validation() {
        assert!(valid_config().validate().is_ok());
        assert!(MonitorConfig::default().validate().is_err());

        let mut config = valid_config();
        config.link.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.alarm_threshold = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"mode": "emulator", "link": {"port": "COM3"}}"#).unwrap();
        assert_eq!(config.mode, MonitorMode::Emulator);
        assert_eq!(config.link.port, "COM3");
        assert_eq!(config.link.baud_rate, 115_200);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("neai-monitor-config-{}.json", std::process::id()));
        let mut config = valid_config();
        config.alarm_threshold = 175.0;
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).unwrap();
        assert!(MonitorConfig::load(&path).is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Emulator".parse::<MonitorMode>().unwrap(), MonitorMode::Emulator);
        assert_eq!("direct".parse::<MonitorMode>().unwrap(), MonitorMode::Direct);
        assert!("pygame".parse::<MonitorMode>().is_err());
    }
}
