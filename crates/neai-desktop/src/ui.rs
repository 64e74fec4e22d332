//! Screens, bar geometry and UI state

use std::collections::VecDeque;
use egui::{Color32, Pos2, Rect, RichText, Sense, Vec2};
use egui_plot::{HLine, Line, Plot, PlotPoints};
use neai_core::{DisplayState, IdleReason, LEARNING_COMPLETE, SIMILARITY_OFFSET};
use neai_monitor::{MonitorMode, MonitorStats};

pub const BAR_WIDTH: f32 = 440.0;
pub const BAR_HEIGHT: f32 = 65.0;
const TEXT_SIZE: f32 = 36.0;

const BACKGROUND_OFF: Color32 = Color32::from_rgb(225, 225, 225);
const BACKGROUND_ON: Color32 = Color32::WHITE;
const BACKGROUND_POSTIT: Color32 = Color32::from_rgb(255, 236, 140);
const LEARNING_TRACK: Color32 = Color32::from_rgb(162, 208, 218);
const LEARNING_FILL: Color32 = Color32::from_rgb(0, 148, 197);
const DETECT_TRACK_NORMAL: Color32 = Color32::from_rgb(200, 230, 200);
const DETECT_TRACK_ALARM: Color32 = Color32::from_rgb(230, 200, 200);
const DETECT_FILL_NORMAL: Color32 = Color32::from_rgb(0, 220, 0);
const DETECT_FILL_ALARM: Color32 = Color32::from_rgb(220, 0, 0);

/// UI state management
#[derive(Debug)]
pub struct UIState {
    pub show_status: bool,
    pub show_history: bool,
}

impl UIState {
    pub fn new() -> Self {
        Self {
            show_status: false,
            show_history: true,
        }
    }
}

/// The five fixed screens
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Ready,
    ConnectionLost,
    Learning(f32),
    Normal(f32),
    Anomaly(f32),
}

impl Screen {
    pub fn from_state(state: DisplayState) -> Self {
        match state {
            DisplayState::Idle(IdleReason::Ready) => Screen::Ready,
            DisplayState::Idle(IdleReason::ConnectionLost) => Screen::ConnectionLost,
            DisplayState::Learning { progress } => Screen::Learning(progress),
            DisplayState::Normal { value } => Screen::Normal(value),
            DisplayState::Anomaly { value } => Screen::Anomaly(value),
        }
    }

    pub fn lines(&self, mode: MonitorMode) -> Vec<&'static str> {
        match self {
            Screen::Ready => {
                let mut lines = vec!["Your smart device is ready !"];
                lines.extend_from_slice(mode.start_hint());
                lines
            }
            Screen::ConnectionLost => vec![
                "Connection with Serial lost !",
                "Press User button to restart.",
            ],
            Screen::Learning(_) => vec!["Embedded learning", "in progress..."],
            Screen::Normal(_) => vec!["Usual behaviour"],
            Screen::Anomaly(_) => vec!["Anomaly detected !"],
        }
    }

    pub fn background(&self) -> Color32 {
        match self {
            Screen::Ready | Screen::ConnectionLost => BACKGROUND_OFF,
            Screen::Learning(_) | Screen::Normal(_) => BACKGROUND_ON,
            Screen::Anomaly(_) => BACKGROUND_POSTIT,
        }
    }

    pub fn is_detection(&self) -> bool {
        matches!(self, Screen::Normal(_) | Screen::Anomaly(_))
    }
}

/// Filled share of the learning bar; one percent ahead of the progress
pub fn learning_bar_fraction(progress: f32) -> f32 {
    if progress <= 0.0 {
        return 0.0;
    }
    ((progress + 1.0) / LEARNING_COMPLETE).clamp(0.0, 1.0)
}

/// Filled share of the detection bar for a status value
pub fn detect_bar_fraction(value: f32) -> f32 {
    ((value - SIMILARITY_OFFSET) / 100.0).clamp(0.0, 1.0)
}

/// Share of the detection bar drawn as the alarm zone
pub fn alarm_zone_fraction(alarm_threshold: f32) -> f32 {
    detect_bar_fraction(alarm_threshold)
}

/// Recent detection values for the history plot
pub struct SimilarityHistory {
    points: VecDeque<[f64; 2]>,
    max_points: usize,
    next_index: u64,
}

impl SimilarityHistory {
    pub fn new() -> Self {
        Self {
            points: VecDeque::new(),
            max_points: 300,
            next_index: 0,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.points.push_back([self.next_index as f64, value as f64]);
        self.next_index += 1;

        // Keep buffer size manageable
        if self.points.len() > self.max_points {
            self.points.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.next_index = 0;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn show_plot(&self, ui: &mut egui::Ui, alarm_threshold: f32) {
        let points: PlotPoints = self.points.iter().copied().collect::<Vec<_>>().into();

        ui.label(format!("Last {} status values", self.len()));

        Plot::new("similarity_history")
            .height(160.0)
            .include_y(SIMILARITY_OFFSET as f64)
            .include_y(200.0)
            .allow_zoom(false)
            .allow_drag(false)
            .show(ui, |plot_ui| {
                plot_ui.hline(
                    HLine::new(alarm_threshold as f64)
                        .color(DETECT_FILL_ALARM)
                        .name("Alarm threshold"),
                );
                plot_ui.line(Line::new(points).color(LEARNING_FILL).name("Status value"));
            });
    }
}

/// Draws one screen
pub struct ScreenView;

impl ScreenView {
    pub fn show(
        ui: &mut egui::Ui,
        screen: Screen,
        mode: MonitorMode,
        alarm_threshold: f32,
        blink_on: bool,
    ) {
        ui.add_space(60.0);
        ui.vertical_centered(|ui| {
            for line in screen.lines(mode) {
                ui.label(RichText::new(line).size(TEXT_SIZE).color(Color32::BLACK));
            }

            ui.add_space(30.0);

            match screen {
                Screen::Learning(progress) => Self::learning_bar(ui, progress),
                Screen::Normal(value) | Screen::Anomaly(value) => {
                    Self::detect_bar(ui, value, alarm_threshold);
                    ui.label(
                        RichText::new(format!("Similarity {:.0}%", value - SIMILARITY_OFFSET))
                            .size(20.0)
                            .color(Color32::DARK_GRAY),
                    );
                }
                Screen::Ready | Screen::ConnectionLost => {}
            }

            ui.add_space(20.0);

            let indicator = match screen {
                Screen::Anomaly(_) => Some(Color32::GREEN),
                Screen::Ready | Screen::ConnectionLost => Some(Color32::from_rgb(0, 0, 128)),
                _ => None,
            };
            if let (Some(color), true) = (indicator, blink_on) {
                let (rect, _) = ui.allocate_exact_size(Vec2::splat(16.0), Sense::hover());
                ui.painter().circle_filled(rect.center(), 8.0, color);
            }
        });
    }

    fn learning_bar(ui: &mut egui::Ui, progress: f32) {
        let (rect, _) = ui.allocate_exact_size(Vec2::new(BAR_WIDTH, BAR_HEIGHT), Sense::hover());
        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, LEARNING_TRACK);
        painter.rect_filled(left_share(rect, learning_bar_fraction(progress)), 0.0, LEARNING_FILL);

        // Tick marks at one and two thirds
        for third in [1.0 / 3.0, 2.0 / 3.0] {
            let x = rect.left() + rect.width() * third;
            painter.circle_filled(Pos2::new(x, rect.top()), 3.0, LEARNING_TRACK);
            painter.circle_filled(Pos2::new(x, rect.bottom()), 3.0, LEARNING_TRACK);
        }

        ui.label(RichText::new(format!("{:.0}%", progress)).size(20.0).color(Color32::DARK_GRAY));
    }

    fn detect_bar(ui: &mut egui::Ui, value: f32, alarm_threshold: f32) {
        let (rect, _) = ui.allocate_exact_size(Vec2::new(BAR_WIDTH, BAR_HEIGHT), Sense::hover());
        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, DETECT_TRACK_NORMAL);
        painter.rect_filled(left_share(rect, alarm_zone_fraction(alarm_threshold)), 0.0, DETECT_TRACK_ALARM);

        let fill = if value > alarm_threshold {
            DETECT_FILL_NORMAL
        } else {
            DETECT_FILL_ALARM
        };
        painter.rect_filled(left_share(rect, detect_bar_fraction(value)), 0.0, fill);
    }
}

fn left_share(rect: Rect, fraction: f32) -> Rect {
    Rect::from_min_size(rect.min, Vec2::new(rect.width() * fraction, rect.height()))
}

/// Side panel with monitor counters
pub struct StatusPanel;

impl StatusPanel {
    pub fn show(ui: &mut egui::Ui, stats: Option<&MonitorStats>, source: &str, mode: MonitorMode) {
        ui.heading("Monitor");
        ui.separator();
        ui.label(format!("Source: {}", source));
        ui.label(format!("Mode: {}", mode));

        let Some(stats) = stats else {
            ui.label("Statistics unavailable");
            return;
        };

        ui.separator();
        ui.label(format!("Lines read: {}", stats.lines_read));
        ui.label(format!("Read timeouts: {}", stats.read_timeouts));
        ui.label(format!("Parse failures: {}", stats.parse_failures));
        ui.label(format!("Engine failures: {}", stats.engine_failures));
        ui.label(format!("Link failures: {}", stats.link_failures));
        ui.separator();
        ui.label(format!("Learning progress: {:.0}%", stats.learning_progress));
        ui.label(format!("Samples learned: {}", stats.samples_learned));
        ui.label(format!("Detections: {}", stats.detections));
        ui.label(format!("Anomalies: {}", stats.anomalies));
        match stats.last_similarity {
            Some(similarity) => ui.label(format!("Last similarity: {:.0}%", similarity)),
            None => ui.label("Last similarity: -"),
        };
    }
}
