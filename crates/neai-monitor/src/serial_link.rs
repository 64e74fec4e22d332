//! Serial link to the device

use std::io::{self, Read};
use std::time::{Duration, Instant};
use serialport::SerialPort;
use tracing::{debug, info, warn};
use neai_core::{LineSource, NeaiError, NeaiResult};
use crate::config::LinkConfig;

/// Lines longer than this without a newline are dropped as garbage
const MAX_LINE_BYTES: usize = 256 * 1024;

/// Splits a byte stream into newline-terminated lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_LINE_BYTES && !self.pending.contains(&b'\n') {
            warn!("Dropping {} bytes without line terminator", self.pending.len());
            self.pending.clear();
        }
    }

    /// Next complete line, decoded lossily with trailing whitespace removed
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end().to_string())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Read until a complete line arrives or the read times out. A partial
/// line is discarded on timeout so it cannot prefix the next one.
fn read_line_until<R: Read + ?Sized>(
    reader: &mut R,
    assembler: &mut LineAssembler,
    deadline: Instant,
) -> io::Result<Option<String>> {
    let mut chunk = [0u8; 1024];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => std::thread::sleep(Duration::from_millis(1)),
            Ok(n) => {
                assembler.push(&chunk[..n]);
                if let Some(line) = assembler.next_line() {
                    return Ok(Some(line));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                drop_partial_line(assembler);
                return Ok(None);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }

        if Instant::now() >= deadline {
            drop_partial_line(assembler);
            return Ok(None);
        }
    }
}

fn drop_partial_line(assembler: &mut LineAssembler) {
    if assembler.pending_len() > 0 {
        debug!("Serial read timed out, dropping {} partial bytes", assembler.pending_len());
        assembler.clear();
    }
}

/// Serial port line source with a fixed read timeout
pub struct SerialLink {
    config: LinkConfig,
    port: Option<Box<dyn SerialPort>>,
    assembler: LineAssembler,
}

impl SerialLink {
    /// Open the configured port
    pub fn open(config: LinkConfig) -> NeaiResult<Self> {
        let port = Self::open_port(&config)?;
        info!(
            "Serial link open on {} @{} baud, timeout {}ms",
            config.port, config.baud_rate, config.read_timeout_ms
        );
        Ok(SerialLink {
            config,
            port: Some(port),
            assembler: LineAssembler::new(),
        })
    }

    fn open_port(config: &LinkConfig) -> NeaiResult<Box<dyn SerialPort>> {
        if config.port.trim().is_empty() {
            return Err(NeaiError::LinkError {
                port: config.port.clone(),
                reason: "no port given".to_string(),
            });
        }

        serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| NeaiError::LinkError {
                port: config.port.clone(),
                reason: e.to_string(),
            })
    }

    /// Re-open a port dropped after an I/O error
    fn reconnect(&mut self) -> NeaiResult<()> {
        match Self::open_port(&self.config) {
            Ok(port) => {
                info!("Serial link re-opened on {}", self.config.port);
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                // Keep the loop from spinning while the device is unplugged
                std::thread::sleep(self.config.read_timeout());
                Err(e)
            }
        }
    }

    fn link_error(&mut self, error: io::Error) -> NeaiError {
        warn!("Serial read failed on {}: {}", self.config.port, error);
        self.port = None;
        self.assembler.clear();
        NeaiError::LinkError {
            port: self.config.port.clone(),
            reason: error.to_string(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl LineSource for SerialLink {
    fn read_line(&mut self) -> NeaiResult<Option<String>> {
        if let Some(line) = self.assembler.next_line() {
            return Ok(Some(line));
        }

        if self.port.is_none() {
            self.reconnect()?;
        }

        let deadline = Instant::now() + self.config.read_timeout();
        let result = match self.port.as_mut() {
            Some(port) => read_line_until(port, &mut self.assembler, deadline),
            None => return Ok(None),
        };
        result.map_err(|e| self.link_error(e))
    }

    fn describe(&self) -> String {
        format!("{} @{}", self.config.port, self.config.baud_rate)
    }
}
