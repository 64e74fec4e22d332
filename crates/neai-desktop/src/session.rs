//! Wires a line source and an engine into a running monitor service

use std::sync::Arc;
use anyhow::Context;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::info;
use neai_monitor::{
    start_monitor_service, EmulatorProcess, Monitor, MonitorCommand, MonitorConfig, MonitorEvent,
    MonitorMode, MonitorStats, SerialLink,
};
use neai_simulation::{DeviceConfig, DeviceProtocol, DeviceSimulator, SimulatedEngine};

/// Channels connecting the UI to a running monitor
pub struct Session {
    pub events: broadcast::Receiver<MonitorEvent>,
    pub commands: mpsc::Sender<MonitorCommand>,
    pub stats: Arc<Mutex<MonitorStats>>,
}

/// Start monitoring either the configured serial port or a simulated board
pub async fn start_session(config: &MonitorConfig, simulate: bool) -> anyhow::Result<Session> {
    let classifier = config.classifier();

    let (events, commands, stats) = if simulate {
        let device = DeviceSimulator::new(simulated_device(config.mode));
        let engine = SimulatedEngine::new(device.config().axis_count);
        info!("Monitoring a simulated board in {} mode", config.mode);
        start_monitor_service(Monitor::new(device, engine, config.mode, classifier)).await?
    } else {
        let link = SerialLink::open(config.link.clone())
            .with_context(|| format!("cannot open serial port {}", config.link.port))?;
        let engine = EmulatorProcess::new(config.emulator.clone());
        info!("Monitoring {} in {} mode", config.link.port, config.mode);
        start_monitor_service(Monitor::new(link, engine, config.mode, classifier)).await?
    };

    Ok(Session { events, commands, stats })
}

/// Board firmware matching the monitor mode
pub fn simulated_device(mode: MonitorMode) -> DeviceConfig {
    let protocol = match mode {
        MonitorMode::Direct => DeviceProtocol::Library,
        MonitorMode::Emulator => DeviceProtocol::Emulator,
    };
    DeviceConfig {
        protocol,
        ..Default::default()
    }
}
