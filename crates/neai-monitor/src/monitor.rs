//! The monitor loop: one blocking read per step, one display state out

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use neai_core::{
    AnomalyEngine, DisplayState, LearningState, LineSource, NeaiError, NeaiResult, Reading,
    SampleBuffer, StatusClassifier, LEARNING_COMPLETE,
};
use crate::config::MonitorMode;

/// Where an emulator-mode session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorPhase {
    /// Waiting for the device to announce how many buffers to learn
    AwaitingTarget,
    Learning,
    Detecting,
}

/// Counters for the status panel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorStats {
    pub lines_read: u64,
    pub read_timeouts: u64,
    pub parse_failures: u64,
    pub engine_failures: u64,
    pub link_failures: u64,
    pub samples_learned: u64,
    pub detections: u64,
    pub anomalies: u64,
    pub last_similarity: Option<f32>,
    pub learning_progress: f32,
}

/// Drives one device session in either mode
pub struct Monitor<S, E> {
    source: S,
    engine: E,
    mode: MonitorMode,
    classifier: StatusClassifier,
    learning: LearningState,
    phase: MonitorPhase,
    /// Set once the device produced something meaningful
    seen_output: bool,
    stats: MonitorStats,
}

impl<S: LineSource, E: AnomalyEngine> Monitor<S, E> {
    pub fn new(source: S, engine: E, mode: MonitorMode, classifier: StatusClassifier) -> Self {
        Self {
            source,
            engine,
            mode,
            classifier,
            learning: LearningState::new(),
            phase: MonitorPhase::AwaitingTarget,
            seen_output: false,
            stats: MonitorStats::default(),
        }
    }

    /// Prepare the engine. Failure is logged; the loop still runs.
    pub fn start(&mut self) {
        info!("Monitoring {} in {} mode", self.source.describe(), self.mode);
        if self.mode == MonitorMode::Emulator {
            if let Err(e) = self.engine.initialize() {
                warn!("Engine initialization failed: {}", e);
            }
        }
    }

    /// Back to the ready screen with a fresh engine
    pub fn reset(&mut self) -> DisplayState {
        info!("Monitor reset");
        self.learning.reset();
        self.phase = MonitorPhase::AwaitingTarget;
        self.seen_output = false;
        self.stats.learning_progress = 0.0;
        self.start();
        DisplayState::READY
    }

    /// One blocking iteration. `None` keeps the current screen.
    pub fn step(&mut self) -> Option<DisplayState> {
        match self.mode {
            MonitorMode::Direct => Some(self.step_direct()),
            MonitorMode::Emulator => self.step_emulator(),
        }
    }

    fn next_line(&mut self) -> NeaiResult<String> {
        match self.source.read_line()? {
            Some(line) => {
                self.stats.lines_read += 1;
                Ok(line)
            }
            None => {
                self.stats.read_timeouts += 1;
                Err(NeaiError::value_parse("", "read timeout"))
            }
        }
    }

    fn step_direct(&mut self) -> DisplayState {
        match self.next_line().and_then(|line| Reading::parse(&line)) {
            Ok(reading) => {
                self.seen_output = true;
                let state = self.classifier.classify_status_value(reading.value);
                match state {
                    DisplayState::Learning { progress } => self.learning.observe(progress),
                    DisplayState::Normal { .. } | DisplayState::Anomaly { .. } => {
                        self.learning.observe(LEARNING_COMPLETE);
                        self.record_detection(&state, reading.value);
                    }
                    DisplayState::Idle(_) => {}
                }
                self.stats.learning_progress = self.learning.progress();
                state
            }
            Err(e) => self.fail(e),
        }
    }

    fn step_emulator(&mut self) -> Option<DisplayState> {
        if self.phase == MonitorPhase::AwaitingTarget {
            return self.await_target();
        }

        let line = match self.next_line() {
            Ok(line) => line,
            Err(e) => return Some(self.fail(e)),
        };

        let result = match self.phase {
            MonitorPhase::Learning => self.learn(&line),
            _ => self.detect(&line).map(Some),
        };

        result.unwrap_or_else(|e| Some(self.fail(e)))
    }

    fn await_target(&mut self) -> Option<DisplayState> {
        let line = match self.next_line() {
            Ok(line) => line,
            Err(NeaiError::LinkError { .. }) => {
                self.stats.link_failures += 1;
                return None;
            }
            Err(_) => return None,
        };

        let started = Reading::parse(&line).and_then(|reading| {
            self.learning.start(reading.value)?;
            Ok(reading.value)
        });

        match started {
            Ok(target) => {
                info!("Device announced {} learning signals", target);
                self.seen_output = true;
                self.phase = MonitorPhase::Learning;
            }
            Err(e) => debug!("Still waiting for learning target: {}", e),
        }
        None
    }

    /// Learn one buffer. Progress the classifier does not show as learning
    /// (the first and the completing sample) keeps the current screen.
    fn learn(&mut self, line: &str) -> NeaiResult<Option<DisplayState>> {
        let buffer = SampleBuffer::parse(line)?;
        self.engine.learn(&buffer)?;
        self.stats.samples_learned += 1;

        let progress = self.learning.record_sample();
        self.stats.learning_progress = progress;
        if self.learning.is_complete() {
            info!("Learning finished after {} signals", self.learning.counter());
            self.phase = MonitorPhase::Detecting;
        }

        // A raw buffer carries no status value
        let state = self.classifier.classify(0.0, progress);
        Ok((!state.is_idle()).then_some(state))
    }

    fn detect(&mut self, line: &str) -> NeaiResult<DisplayState> {
        let buffer = SampleBuffer::parse(line)?;
        let similarity = self.engine.detect(&buffer)?;
        let reading = Reading::from_similarity(similarity);
        let state = self.classifier.classify(reading.value, LEARNING_COMPLETE);
        self.record_detection(&state, reading.value);
        Ok(state)
    }

    fn record_detection(&mut self, state: &DisplayState, value: f32) {
        self.stats.detections += 1;
        self.stats.last_similarity = Some(value - neai_core::SIMILARITY_OFFSET);
        if matches!(state, DisplayState::Anomaly { .. }) {
            self.stats.anomalies += 1;
        }
    }

    /// Reset learning and pick the idle screen for a failed iteration
    fn fail(&mut self, error: NeaiError) -> DisplayState {
        match &error {
            NeaiError::ValueParse { .. } => self.stats.parse_failures += 1,
            NeaiError::LinkError { .. } => self.stats.link_failures += 1,
            _ => self.stats.engine_failures += 1,
        }

        self.learning.reset();
        self.stats.learning_progress = 0.0;
        self.phase = MonitorPhase::AwaitingTarget;

        if self.seen_output {
            warn!("Connection lost: {}", error);
            DisplayState::CONNECTION_LOST
        } else {
            debug!("No device output yet: {}", error);
            DisplayState::READY
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    pub fn learning(&self) -> &LearningState {
        &self.learning
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neai_core::IdleReason;
    use crate::testing::{line, ScriptedEngine, ScriptedRead, ScriptedSource};

    const BUFFER: &str = "0.0123 -0.9811 0.0345 0.0101 -0.9790 0.0301";

    fn direct(reads: Vec<ScriptedRead>) -> Monitor<ScriptedSource, ScriptedEngine> {
        let mut monitor = Monitor::new(
            ScriptedSource::new(reads),
            ScriptedEngine::default(),
            MonitorMode::Direct,
            StatusClassifier::default(),
        );
        monitor.start();
        monitor
    }

    fn emulator(reads: Vec<ScriptedRead>, engine: ScriptedEngine) -> Monitor<ScriptedSource, ScriptedEngine> {
        let mut monitor = Monitor::new(
            ScriptedSource::new(reads),
            engine,
            MonitorMode::Emulator,
            StatusClassifier::default(),
        );
        monitor.start();
        monitor
    }

    #[test]
    fn test_direct_mode_sequence() {
        let mut monitor = direct(vec![
            ScriptedRead::Timeout,
            line("12"),
            line("56"),
            line("195"),
            line("143"),
            ScriptedRead::Timeout,
        ]);

        assert_eq!(monitor.step(), Some(DisplayState::READY));
        assert_eq!(monitor.step(), Some(DisplayState::Learning { progress: 12.0 }));
        assert_eq!(monitor.step(), Some(DisplayState::Learning { progress: 56.0 }));
        assert_eq!(monitor.step(), Some(DisplayState::Normal { value: 195.0 }));
        assert_eq!(monitor.step(), Some(DisplayState::Anomaly { value: 143.0 }));
        assert_eq!(monitor.step(), Some(DisplayState::CONNECTION_LOST));

        let stats = monitor.stats();
        assert_eq!(stats.detections, 2);
        assert_eq!(stats.anomalies, 1);
        assert_eq!(stats.last_similarity, Some(43.0));
        assert_eq!(stats.read_timeouts, 2);
    }

    #[test]
    fn test_direct_parse_failure_resets_progress() {
        let mut monitor = direct(vec![line("40"), line("Learning... 42 %")]);

        monitor.step();
        assert_eq!(monitor.learning().progress(), 40.0);

        assert_eq!(monitor.step(), Some(DisplayState::Idle(IdleReason::ConnectionLost)));
        assert_eq!(monitor.learning().progress(), 0.0);
        assert_eq!(monitor.stats().parse_failures, 1);
    }

    #[test]
    fn test_direct_unplugged_device() {
        let mut monitor = direct(vec![line("150"), ScriptedRead::Unplugged]);
        monitor.step();
        assert_eq!(monitor.step(), Some(DisplayState::CONNECTION_LOST));
        assert_eq!(monitor.stats().link_failures, 1);
    }

    #[test]
    fn test_emulator_learning_then_detection() {
        let mut reads = vec![ScriptedRead::Timeout, line("not yet"), line("4")];
        reads.extend((0..7).map(|_| line(BUFFER)));
        let engine = ScriptedEngine::with_similarities(vec![95.0, 42.0]);
        let mut monitor = emulator(reads, engine);

        assert_eq!(monitor.engine.initialized, 1);

        // Timeouts and junk while waiting for the target change nothing
        assert_eq!(monitor.step(), None);
        assert_eq!(monitor.step(), None);
        assert_eq!(monitor.step(), None);
        assert_eq!(monitor.phase(), MonitorPhase::Learning);
        assert_eq!(monitor.learning().target(), 4.0);

        // The first sample (0%) and the completing one (100%) keep the screen
        let progress: Vec<_> = (0..5).map(|_| monitor.step()).collect();
        assert_eq!(
            progress,
            vec![
                None,
                Some(DisplayState::Learning { progress: 25.0 }),
                Some(DisplayState::Learning { progress: 50.0 }),
                Some(DisplayState::Learning { progress: 75.0 }),
                None,
            ]
        );
        assert_eq!(monitor.learning().progress(), 100.0);
        assert_eq!(monitor.phase(), MonitorPhase::Detecting);

        assert_eq!(monitor.step(), Some(DisplayState::Normal { value: 195.0 }));
        assert_eq!(monitor.step(), Some(DisplayState::Anomaly { value: 142.0 }));
        assert_eq!(monitor.engine.learned, 5);
    }

    #[test]
    fn test_emulator_learning_states_match_classifier() {
        let mut reads = vec![line("7")];
        reads.extend((0..8).map(|_| line(BUFFER)));
        let mut monitor = emulator(reads, ScriptedEngine::default());
        let classifier = StatusClassifier::default();

        monitor.step();
        for _ in 0..8 {
            let shown = monitor.step();
            let expected = classifier.classify(0.0, monitor.learning().progress());
            match shown {
                Some(state) => assert_eq!(state, expected),
                None => assert!(expected.is_idle()),
            }
        }
        assert_eq!(monitor.phase(), MonitorPhase::Detecting);
    }

    #[test]
    fn test_emulator_progress_reaches_twenty_percent() {
        let mut reads = vec![line("50")];
        reads.extend((0..11).map(|_| line(BUFFER)));
        let mut monitor = emulator(reads, ScriptedEngine::default());

        monitor.step();
        let mut last = None;
        for _ in 0..11 {
            last = monitor.step();
        }
        assert_eq!(last, Some(DisplayState::Learning { progress: 20.0 }));
    }

    #[test]
    fn test_emulator_failure_requires_new_target() {
        let engine = ScriptedEngine {
            fail_learning_after: Some(2),
            ..Default::default()
        };
        let reads = vec![
            line("10"),
            line(BUFFER),
            line(BUFFER),
            line(BUFFER),
            line(BUFFER),
            line("10"),
        ];
        let mut monitor = emulator(reads, engine);

        monitor.step();
        assert_eq!(monitor.step(), None);
        assert_eq!(monitor.step(), Some(DisplayState::Learning { progress: 10.0 }));
        assert_eq!(monitor.step(), Some(DisplayState::CONNECTION_LOST));
        assert_eq!(monitor.learning().progress(), 0.0);
        assert_eq!(monitor.phase(), MonitorPhase::AwaitingTarget);
        assert_eq!(monitor.stats().engine_failures, 1);

        // A buffer is not a target; the next numeric line is
        assert_eq!(monitor.step(), None);
        assert_eq!(monitor.phase(), MonitorPhase::AwaitingTarget);
        assert_eq!(monitor.step(), None);
        assert_eq!(monitor.phase(), MonitorPhase::Learning);
    }

    #[test]
    fn test_emulator_garbled_buffer_is_connection_lost() {
        let reads = vec![line("3"), line(BUFFER), line("0.1 0.2 #!?")];
        let mut monitor = emulator(reads, ScriptedEngine::default());

        monitor.step();
        monitor.step();
        assert_eq!(monitor.step(), Some(DisplayState::CONNECTION_LOST));
        assert_eq!(monitor.stats().parse_failures, 1);
    }

    #[test]
    fn test_reset_returns_to_ready() {
        let mut monitor = emulator(vec![line("3"), line(BUFFER)], ScriptedEngine::default());
        monitor.step();
        monitor.step();

        assert_eq!(monitor.reset(), DisplayState::READY);
        assert_eq!(monitor.phase(), MonitorPhase::AwaitingTarget);
        assert_eq!(monitor.learning().progress(), 0.0);
        assert_eq!(monitor.engine.initialized, 2);

        // Before any new output, a timeout is not a lost connection
        let mut monitor = direct(vec![line("150")]);
        monitor.step();
        monitor.reset();
        assert_eq!(monitor.step(), Some(DisplayState::READY));
    }
}
