//! Main application state and logic

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};
use neai_core::DisplayState;
use neai_monitor::{MonitorCommand, MonitorConfig, MonitorEvent, MonitorMode, MonitorStats};

use crate::session::{start_session, Session};
use crate::ui::{Screen, ScreenView, SimilarityHistory, StatusPanel, UIState};

/// Main application state
pub struct NeaiApp {
    // Kept in an Option so Drop can shut it down with a timeout
    runtime: Option<tokio::runtime::Runtime>,

    event_receiver: broadcast::Receiver<MonitorEvent>,
    command_sender: mpsc::Sender<MonitorCommand>,
    stats: Arc<Mutex<MonitorStats>>,

    pub ui_state: UIState,
    pub history: SimilarityHistory,

    state: DisplayState,
    monitor_stopped: bool,
    mode: MonitorMode,
    source: String,
    alarm_threshold: f32,
}

impl NeaiApp {
    /// Create the application and start monitoring
    pub fn new(config: MonitorConfig, simulate: bool) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;

        let Session { events, commands, stats } = runtime.block_on(start_session(&config, simulate))?;

        let source = if simulate {
            "simulated board".to_string()
        } else {
            config.link.port.clone()
        };

        Ok(NeaiApp {
            runtime: Some(runtime),
            event_receiver: events,
            command_sender: commands,
            stats,
            ui_state: UIState::new(),
            history: SimilarityHistory::new(),
            state: DisplayState::READY,
            monitor_stopped: false,
            mode: config.mode,
            source,
            alarm_threshold: config.alarm_threshold,
        })
    }

    /// Drain pending display changes (called every frame)
    fn update_data(&mut self) {
        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => self.apply_state(event.state),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("UI skipped {} display changes", skipped);
                }
                Err(TryRecvError::Closed) => {
                    if !self.monitor_stopped {
                        warn!("Monitor stopped publishing");
                        self.monitor_stopped = true;
                    }
                    break;
                }
            }
        }
    }

    pub fn apply_state(&mut self, state: DisplayState) {
        match state.detection_value() {
            Some(value) => self.history.push(value),
            None => self.history.clear(),
        }
        self.state = state;
    }

    fn send_command(&self, command: MonitorCommand) {
        if let Err(e) = self.command_sender.try_send(command) {
            warn!("Failed to send monitor command: {}", e);
        }
    }

    /// Restart from the ready screen
    pub fn reset(&mut self) {
        info!("Reset requested");
        self.history.clear();
        self.send_command(MonitorCommand::Reset);
    }

    pub fn get_stats(&self) -> Option<MonitorStats> {
        self.stats.try_lock().ok().map(|stats| stats.clone())
    }
}

impl eframe::App for NeaiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_data();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.send_command(MonitorCommand::Shutdown);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // Poll for display changes even without input
        ctx.request_repaint_after(Duration::from_millis(50));

        let screen = Screen::from_state(self.state);
        let blink_on = ctx.input(|i| i.time).fract() < 0.5;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.ui_state.show_status, "Show Status");
                    ui.checkbox(&mut self.ui_state.show_history, "Show History");
                });

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                ui.separator();

                let status_color = if self.monitor_stopped {
                    egui::Color32::RED
                } else {
                    egui::Color32::GREEN
                };
                ui.colored_label(status_color, format!("● {}", self.source));

                ui.separator();
                ui.label(format!("Mode: {}", self.mode));
                ui.separator();
                ui.label(self.state.label());
            });
        });

        if self.ui_state.show_status {
            egui::SidePanel::right("status_panel")
                .resizable(true)
                .default_width(260.0)
                .show(ctx, |ui| {
                    let stats = self.get_stats();
                    StatusPanel::show(ui, stats.as_ref(), &self.source, self.mode);
                });
        }

        if self.ui_state.show_history && screen.is_detection() && !self.history.is_empty() {
            egui::TopBottomPanel::bottom("history_panel").show(ctx, |ui| {
                self.history.show_plot(ui, self.alarm_threshold);
            });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(screen.background()))
            .show(ctx, |ui| {
                ScreenView::show(ui, screen, self.mode, self.alarm_threshold, blink_on);
            });
    }
}

impl Drop for NeaiApp {
    fn drop(&mut self) {
        let _ = self.command_sender.try_send(MonitorCommand::Shutdown);
        if let Some(runtime) = self.runtime.take() {
            // The monitor thread may be inside a serial read or emulator call
            runtime.shutdown_timeout(Duration::from_secs(2));
        }
    }
}
