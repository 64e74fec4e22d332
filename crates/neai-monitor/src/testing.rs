//! Scripted line source and engine for monitor tests

use std::collections::VecDeque;
use neai_core::{AnomalyEngine, LearnStatus, LineSource, NeaiError, NeaiResult, SampleBuffer};

/// What the scripted source returns on each read
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Line(String),
    Timeout,
    Unplugged,
}

pub fn line(text: &str) -> ScriptedRead {
    ScriptedRead::Line(text.to_string())
}

/// Plays back a fixed script, then times out forever
#[derive(Debug, Default)]
pub struct ScriptedSource {
    reads: VecDeque<ScriptedRead>,
}

impl ScriptedSource {
    pub fn new(reads: Vec<ScriptedRead>) -> Self {
        Self { reads: reads.into() }
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self) -> NeaiResult<Option<String>> {
        match self.reads.pop_front() {
            Some(ScriptedRead::Line(line)) => Ok(Some(line)),
            Some(ScriptedRead::Timeout) | None => Ok(None),
            Some(ScriptedRead::Unplugged) => Err(NeaiError::LinkError {
                port: "scripted".to_string(),
                reason: "device unplugged".to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Engine returning queued similarities; fails when the queue runs dry
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    pub similarities: VecDeque<f32>,
    pub fail_learning_after: Option<u32>,
    pub initialized: u32,
    pub learned: u32,
}

impl ScriptedEngine {
    pub fn with_similarities(similarities: Vec<f32>) -> Self {
        Self {
            similarities: similarities.into(),
            ..Default::default()
        }
    }
}

impl AnomalyEngine for ScriptedEngine {
    fn initialize(&mut self) -> NeaiResult<()> {
        self.initialized += 1;
        Ok(())
    }

    fn learn(&mut self, _buffer: &SampleBuffer) -> NeaiResult<LearnStatus> {
        if let Some(limit) = self.fail_learning_after {
            if self.learned >= limit {
                return Err(NeaiError::EngineFailure {
                    command: "NanoEdgeAI_learn",
                    reason: "exit status: 1".to_string(),
                });
            }
        }
        self.learned += 1;
        Ok(LearnStatus::new("success"))
    }

    fn detect(&mut self, _buffer: &SampleBuffer) -> NeaiResult<f32> {
        self.similarities
            .pop_front()
            .ok_or_else(|| NeaiError::EngineFailure {
                command: "NanoEdgeAI_detect",
                reason: "exit status: 1".to_string(),
            })
    }
}
