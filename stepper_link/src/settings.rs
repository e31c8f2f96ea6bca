/*!
Timing and retry settings for a run.
*/

use crate::error::{Result, SenderError};
use crate::protocol;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing of the command/acknowledgment exchange.
///
/// The defaults reproduce the reference controller behavior: 5 s to
/// acknowledge, 100 ms poll slices, 500 ms between commands, no retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// How long the controller has to acknowledge a frame
    pub ack_timeout_ms: u64,

    /// Longest single blocking read while waiting for an ACK
    pub poll_interval_ms: u64,

    /// Delay after an acknowledged frame before the next line
    pub pacing_ms: u64,

    /// How many times a frame is re-sent after an ACK timeout
    pub ack_retries: u32,
}

impl TimingSettings {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Reject settings the waiter cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.ack_timeout_ms == 0 {
            return Err(SenderError::config("ack_timeout_ms must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(SenderError::config("poll_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            ack_timeout_ms: protocol::ACK_TIMEOUT.as_millis() as u64,
            poll_interval_ms: protocol::POLL_INTERVAL.as_millis() as u64,
            pacing_ms: protocol::PACING_DELAY.as_millis() as u64,
            ack_retries: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = TimingSettings::default();
        assert_eq!(settings.ack_timeout(), Duration::from_secs(5));
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
        assert_eq!(settings.pacing(), Duration::from_millis(500));
        assert_eq!(settings.ack_retries, 0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let settings = TimingSettings {
            poll_interval_ms: 0,
            ..TimingSettings::default()
        };
        assert!(matches!(settings.validate(), Err(SenderError::Config(_))));

        let settings = TimingSettings {
            ack_timeout_ms: 0,
            ..TimingSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
