//! Monitor service: runs the blocking loop off the UI thread

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::info;
use neai_core::{AnomalyEngine, DisplayState, LineSource, NeaiResult};
use crate::monitor::{Monitor, MonitorStats};

/// Commands for controlling the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCommand {
    /// Restart the session from the ready screen
    Reset,
    /// Leave the loop
    Shutdown,
}

/// A display change for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEvent {
    pub sequence: u64,
    pub state: DisplayState,
}

/// Owns a monitor and publishes its display changes
pub struct MonitorService<S, E> {
    monitor: Monitor<S, E>,

    // Communication channels
    event_sender: broadcast::Sender<MonitorEvent>,
    command_receiver: mpsc::Receiver<MonitorCommand>,
    command_sender: Option<mpsc::Sender<MonitorCommand>>,

    stats: Arc<Mutex<MonitorStats>>,
    sequence: u64,
    last_state: Option<DisplayState>,
}

impl<S: LineSource, E: AnomalyEngine> MonitorService<S, E> {
    pub fn new(monitor: Monitor<S, E>) -> Self {
        let (event_sender, _) = broadcast::channel(64);
        let (command_sender, command_receiver) = mpsc::channel(8);

        MonitorService {
            monitor,
            event_sender,
            command_receiver,
            command_sender: Some(command_sender),
            stats: Arc::new(Mutex::new(MonitorStats::default())),
            sequence: 0,
            last_state: None,
        }
    }

    /// Get a receiver for display changes
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_sender.subscribe()
    }

    /// Get command sender for controlling the monitor
    pub fn command_handle(&self) -> mpsc::Sender<MonitorCommand> {
        match &self.command_sender {
            Some(sender) => sender.clone(),
            // Already running: hand out a sender whose commands go nowhere
            None => mpsc::channel(1).0,
        }
    }

    pub fn stats_handle(&self) -> Arc<Mutex<MonitorStats>> {
        self.stats.clone()
    }

    /// Blocking loop; must run on a thread that may block
    pub fn run(mut self) {
        self.monitor.start();

        // Once running, only the handed-out senders keep the channel open
        self.command_sender = None;

        loop {
            match self.command_receiver.try_recv() {
                Ok(MonitorCommand::Reset) => {
                    let state = self.monitor.reset();
                    self.last_state = None;
                    self.publish(state);
                }
                Ok(MonitorCommand::Shutdown) => {
                    info!("Monitor shutting down");
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    info!("Monitor command channel closed");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            if let Some(state) = self.monitor.step() {
                self.publish(state);
            }

            *self.stats.blocking_lock() = self.monitor.stats().clone();
        }
    }

    fn publish(&mut self, state: DisplayState) {
        if self.last_state == Some(state) {
            return;
        }
        self.last_state = Some(state);
        self.sequence += 1;

        // Ignore if no receivers
        let _ = self.event_sender.send(MonitorEvent {
            sequence: self.sequence,
            state,
        });
    }
}

/// Helper function to start the monitor on a blocking thread
pub async fn start_monitor_service<S, E>(
    monitor: Monitor<S, E>,
) -> NeaiResult<(
    broadcast::Receiver<MonitorEvent>,
    mpsc::Sender<MonitorCommand>,
    Arc<Mutex<MonitorStats>>,
)>
where
    S: LineSource + 'static,
    E: AnomalyEngine + 'static,
{
    let service = MonitorService::new(monitor);

    let event_receiver = service.subscribe();
    let command_sender = service.command_handle();
    let stats_handle = service.stats_handle();

    tokio::task::spawn_blocking(move || {
        let source = service.monitor.describe_source();
        service.run();
        info!("Monitor for {} stopped", source);
    });

    Ok((event_receiver, command_sender, stats_handle))
}
