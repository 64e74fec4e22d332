//! Client for the NanoEdge AI emulator command-line binary
//!
//! Every call runs the binary once and waits for it. Learning and detection
//! answer with a small JSON document on stdout.

use std::process::Command;
use serde::Deserialize;
use tracing::{debug, info};
use neai_core::{AnomalyEngine, LearnStatus, NeaiError, NeaiResult, SampleBuffer};
use crate::config::EmulatorConfig;

pub const INITIALIZE: &str = "NanoEdgeAI_initialize";
pub const LEARN: &str = "NanoEdgeAI_learn";
pub const DETECT: &str = "NanoEdgeAI_detect";

#[derive(Debug, Deserialize)]
struct LearnResponse {
    status: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    results: Vec<DetectResult>,
}

#[derive(Debug, Deserialize)]
struct DetectResult {
    similarity: f32,
}

/// Parse the stdout of a learn call
pub fn parse_learn_response(stdout: &[u8]) -> NeaiResult<LearnStatus> {
    let response: LearnResponse = serde_json::from_slice(stdout).map_err(|e| {
        NeaiError::MalformedResponse {
            command: LEARN,
            reason: e.to_string(),
        }
    })?;

    let status = match response.status {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    Ok(LearnStatus::new(status))
}

/// Parse the stdout of a detect call into a 0-100 similarity
pub fn parse_detect_response(stdout: &[u8]) -> NeaiResult<f32> {
    let response: DetectResponse = serde_json::from_slice(stdout).map_err(|e| {
        NeaiError::MalformedResponse {
            command: DETECT,
            reason: e.to_string(),
        }
    })?;

    response
        .results
        .first()
        .map(|r| r.similarity)
        .ok_or_else(|| NeaiError::MalformedResponse {
            command: DETECT,
            reason: "empty results".to_string(),
        })
}

/// Runs the emulator binary as a child process per call
#[derive(Debug, Clone)]
pub struct EmulatorProcess {
    config: EmulatorConfig,
}

impl EmulatorProcess {
    pub fn new(config: EmulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    fn run(&self, command: &'static str, buffer: Option<&SampleBuffer>) -> NeaiResult<Vec<u8>> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(command);
        if let Some(buffer) = buffer {
            cmd.arg("--array").args(buffer.to_args());
        }
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| NeaiError::EngineFailure {
            command,
            reason: format!("cannot run {}: {}", self.config.binary.display(), e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NeaiError::EngineFailure {
                command,
                reason: format!("{} {}", output.status, stderr.trim()),
            });
        }

        Ok(output.stdout)
    }
}

impl AnomalyEngine for EmulatorProcess {
    fn initialize(&mut self) -> NeaiResult<()> {
        self.run(INITIALIZE, None)?;
        info!("Emulator {} initialized", self.config.binary.display());
        Ok(())
    }

    fn learn(&mut self, buffer: &SampleBuffer) -> NeaiResult<LearnStatus> {
        let stdout = self.run(LEARN, Some(buffer))?;
        let status = parse_learn_response(&stdout)?;
        debug!("Learn status: {}", status.status);
        Ok(status)
    }

    fn detect(&mut self, buffer: &SampleBuffer) -> NeaiResult<f32> {
        let stdout = self.run(DETECT, Some(buffer))?;
        parse_detect_response(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_learn_response() {
        let status = parse_learn_response(br#"{"input": [1.0], "status": "success"}"#).unwrap();
        assert_eq!(status.status, "success");

        let status = parse_learn_response(br#"{"status": 1}"#).unwrap();
        assert_eq!(status.status, "1");

        assert!(matches!(
            parse_learn_response(br#"{"result": "success"}"#),
            Err(NeaiError::MalformedResponse { command: LEARN, .. })
        ));
    }

    #[test]
    fn test_parse_detect_response() {
        let similarity = parse_detect_response(
            br#"{"results": [{"similarity": 87, "status": "success"}], "input": [0.1]}"#,
        )
        .unwrap();
        assert_eq!(similarity, 87.0);

        assert!(parse_detect_response(br#"{"results": []}"#).is_err());
        assert!(parse_detect_response(b"Segmentation fault").is_err());
    }

    #[test]
    fn test_missing_binary_is_engine_failure() {
        let mut engine = EmulatorProcess::new(EmulatorConfig {
            binary: PathBuf::from("./definitely-not-a-nanoedge-emulator"),
            working_dir: None,
        });
        let buffer = SampleBuffer::new(vec![0.1, 0.2, 0.3]).unwrap();

        let error = engine.detect(&buffer).unwrap_err();
        assert!(error.is_connection_failure());
        assert!(matches!(error, NeaiError::EngineFailure { command: DETECT, .. }));
        assert!(engine.initialize().is_err());
    }

    /// Emulator stand-in: `/bin/sh` runs a plain script named after each
    /// command from the working directory and records the arguments.
    #[cfg(unix)]
    fn scripted_emulator(name: &str, detect_exit: i32) -> (EmulatorProcess, PathBuf) {
        let dir = std::env::temp_dir().join(format!("neai-emulator-{}-{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(dir.join(INITIALIZE), "echo initialized > initialize_args.txt\n").unwrap();
        std::fs::write(
            dir.join(LEARN),
            "printf '%s\\n' \"$@\" > learn_args.txt\necho '{\"status\": \"success\"}'\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(DETECT),
            format!(
                "printf '%s\\n' \"$@\" > detect_args.txt\necho '{{\"results\": [{{\"similarity\": 87}}]}}'\nexit {}\n",
                detect_exit
            ),
        )
        .unwrap();

        let engine = EmulatorProcess::new(EmulatorConfig {
            binary: PathBuf::from("/bin/sh"),
            working_dir: Some(dir.clone()),
        });
        (engine, dir)
    }

    #[cfg(unix)]
    #[test]
    fn test_commands_and_arguments_reach_the_binary() {
        let (mut engine, dir) = scripted_emulator("args", 0);
        let buffer = SampleBuffer::new(vec![0.5, -1.25, 2.0]).unwrap();

        engine.initialize().unwrap();
        let status = engine.learn(&buffer).unwrap();
        let similarity = engine.detect(&buffer).unwrap();

        assert_eq!(status.status, "success");
        assert_eq!(similarity, 87.0);
        assert!(dir.join("initialize_args.txt").exists());

        let expected = "--array\n0.5\n-1.25\n2\n";
        assert_eq!(std::fs::read_to_string(dir.join("learn_args.txt")).unwrap(), expected);
        assert_eq!(std::fs::read_to_string(dir.join("detect_args.txt")).unwrap(), expected);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_engine_failure() {
        let (mut engine, dir) = scripted_emulator("exit", 3);
        let buffer = SampleBuffer::new(vec![0.1, 0.2]).unwrap();

        let error = engine.detect(&buffer).unwrap_err();
        assert!(matches!(error, NeaiError::EngineFailure { command: DETECT, .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
