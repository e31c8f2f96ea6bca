/*!
Error types for the stepper link.

Operator-initiated stops are not errors; they are reported through
[`crate::report::RunOutcome::Stopped`] and [`crate::ack::AckOutcome::Cancelled`].
*/

use std::time::Duration;
use thiserror::Error;

/// Common result type used throughout the stepper link library
pub type Result<T> = std::result::Result<T, SenderError>;

/// Every failure that can end a run or prevent one from starting
#[derive(Error, Debug)]
pub enum SenderError {
    /// Malformed coordinate text inside a G0/G1 motion line
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The transport could not be opened or has gone away
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors reported by the serial port driver
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O errors (reading the GCode file, writing to the port)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The controller did not acknowledge a frame in time
    #[error("No ACK for line {line} after {attempts} attempt(s) ({waited:?} on the last one)")]
    AckTimeout {
        line: usize,
        attempts: u32,
        waited: Duration,
    },

    /// A wire frame that does not follow the `S:N,S:N,S:N\n` format
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SenderError {
    /// Create a new parse error for a 1-based line number
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a new connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a new invalid frame error
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-friendly name of the failure cause, e.g. `ack_timeout`
    pub fn category(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "malformed_input",
            Self::AckTimeout { .. } => "ack_timeout",
            Self::Connection(_) | Self::Serial(_) | Self::Io(_) => "transport_error",
            Self::InvalidFrame(_) => "invalid_frame",
            Self::Config(_) => "config",
        }
    }

    /// Line number the failure is attached to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } | Self::AckTimeout { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(SenderError::parse(3, "bad").category(), "malformed_input");
        assert_eq!(SenderError::connection("gone").category(), "transport_error");
        let timeout = SenderError::AckTimeout {
            line: 7,
            attempts: 1,
            waited: Duration::from_secs(5),
        };
        assert_eq!(timeout.category(), "ack_timeout");
        assert_eq!(timeout.line(), Some(7));
        assert_eq!(SenderError::config("x").line(), None);
    }

    #[test]
    fn test_parse_error_display() {
        let err = SenderError::parse(12, "invalid X value 'abc'");
        assert_eq!(err.to_string(), "Parse error on line 12: invalid X value 'abc'");
    }
}
