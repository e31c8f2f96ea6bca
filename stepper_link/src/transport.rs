/*!
Byte transport to the stepper controller.

The dispatch loop only ever talks to [`Transport`], so the serial port can be
swapped for the in-process channel transport in [`crate::sim`] or a test fake.
*/

use crate::error::{Result, SenderError};
use crate::protocol::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Byte-oriented channel to the controller
pub trait Transport {
    /// Write all bytes to the controller
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Block for at most `timeout` waiting for one byte.
    /// `Ok(None)` means nothing arrived in time.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Release the underlying resource. Later calls are no-ops.
    fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,

    /// Baud rate, must be positive
    pub baud_rate: u32,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }

    /// Check that the port is named and the baud rate is usable
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(SenderError::config("serial port name is required"));
        }
        if self.baud_rate == 0 {
            return Err(SenderError::config("baud rate must be a positive integer"));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// [`Transport`] over a real serial port
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    read_timeout: Duration,
}

impl SerialTransport {
    /// Open the port described by `config`
    pub fn open(config: &SerialConfig) -> Result<Self> {
        config.validate()?;

        let read_timeout = Duration::from_secs(1);
        info!("🔌 Opening serial port {} at {} baud", config.port, config.baud_rate);

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| SenderError::connection(format!("cannot open {}: {}", config.port, e)))?;

        info!("✅ Serial port {} open", config.port);
        Ok(Self {
            name: config.port.clone(),
            port: Some(port),
            read_timeout,
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        let name = &self.name;
        self.port
            .as_mut()
            .ok_or_else(|| SenderError::connection(format!("{} is closed", name)))
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port()?;
        let written = port.write_all(bytes).and_then(|()| port.flush());
        written.map_err(|e| SenderError::connection(format!("write to {} failed: {}", self.name, e)))
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if timeout != self.read_timeout {
            self.port()?.set_timeout(timeout)?;
            self.read_timeout = timeout;
        }

        let mut buf = [0u8; 1];
        match self.port()?.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Serial port {} closed", self.name);
        }
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert!(config.port.is_empty());
    }

    #[test]
    fn test_serial_config_validation() {
        assert!(SerialConfig::new("/dev/ttyUSB0", 115_200).validate().is_ok());
        assert!(matches!(
            SerialConfig::new("", 9600).validate(),
            Err(SenderError::Config(_))
        ));
        assert!(matches!(
            SerialConfig::new("COM3", 0).validate(),
            Err(SenderError::Config(_))
        ));
    }

    #[test]
    fn test_open_missing_port_is_connection_error() {
        let config = SerialConfig::new("/dev/stepper-link-does-not-exist", 9600);
        assert!(matches!(
            SerialTransport::open(&config),
            Err(SenderError::Connection(_))
        ));
    }
}
