//! NEAI-Simulation: vibration device and engine simulation
//!
//! Lets the monitor run without a board on the serial port or the
//! emulator binary on disk.

pub mod vibration_patterns;
pub mod spectral_engine;
pub mod device_simulator;

pub use vibration_patterns::*;
pub use spectral_engine::*;
pub use device_simulator::*;
