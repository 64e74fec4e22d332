//! NEAI-Monitor: serial link, emulator client and the monitor loop
//!
//! Reads lines from the device, hands them to the anomaly engine when the
//! host runs it, and turns the results into display states.

pub mod config;
pub mod serial_link;
pub mod emulator;
pub mod monitor;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{MonitorConfig, MonitorMode, LinkConfig, EmulatorConfig};
pub use serial_link::{SerialLink, LineAssembler};
pub use emulator::EmulatorProcess;
pub use monitor::{Monitor, MonitorPhase, MonitorStats};
pub use service::{MonitorService, MonitorCommand, MonitorEvent, start_monitor_service};
