/*!
Acknowledgment waiting.

After a frame is written the controller has a fixed window to answer with
[`ACK_BYTE`]. The waiter reads in bounded slices so that an operator stop is
noticed within one poll interval, without a separate sleep between reads.
*/

use crate::abort::AbortFlag;
use crate::error::Result;
use crate::protocol::ACK_BYTE;
use crate::settings::TimingSettings;
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::debug;

/// How a wait for an acknowledgment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The controller accepted the frame
    Acknowledged { after: Duration },
    /// The deadline passed without an ACK byte
    TimedOut { waited: Duration },
    /// The abort flag was set while waiting
    Cancelled,
}

/// Bounded, cancellable wait for a single ACK byte
#[derive(Debug, Clone, Copy)]
pub struct AckWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl AckWaiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_settings(settings: &TimingSettings) -> Self {
        Self::new(settings.ack_timeout(), settings.poll_interval())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the ACK of a frame written at `sent_at`.
    ///
    /// Bytes other than [`ACK_BYTE`] are dropped and do not extend the
    /// deadline. Transport failures are returned as errors.
    pub fn wait<T>(&self, transport: &mut T, abort: &AbortFlag, sent_at: Instant) -> Result<AckOutcome>
    where
        T: Transport + ?Sized,
    {
        let deadline = sent_at + self.timeout;
        loop {
            if abort.is_set() {
                return Ok(AckOutcome::Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(AckOutcome::TimedOut {
                    waited: now.duration_since(sent_at),
                });
            }

            match transport.read_byte(self.poll_interval.min(deadline - now))? {
                Some(ACK_BYTE) => {
                    return Ok(AckOutcome::Acknowledged {
                        after: sent_at.elapsed(),
                    })
                }
                Some(other) => debug!("Discarding non-ACK byte 0x{:02X}", other),
                None => {}
            }
        }
    }
}

impl Default for AckWaiter {
    fn default() -> Self {
        Self::from_settings(&TimingSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SenderError;
    use std::collections::VecDeque;

    /// Replays a fixed byte script, then behaves like a silent line
    struct ScriptedLine {
        bytes: VecDeque<u8>,
        reads: usize,
        abort_after_reads: Option<(usize, AbortFlag)>,
        fail: bool,
    }

    impl ScriptedLine {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.iter().copied().collect(),
                reads: 0,
                abort_after_reads: None,
                fail: false,
            }
        }
    }

    impl Transport for ScriptedLine {
        fn write(&mut self, _bytes: &[u8]) -> Result<()> {
            Ok(())
        }

        fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
            self.reads += 1;
            if self.fail {
                return Err(SenderError::connection("line dropped"));
            }
            if let Some((after, flag)) = &self.abort_after_reads {
                if self.reads >= *after {
                    flag.trigger();
                }
            }
            match self.bytes.pop_front() {
                Some(byte) => Ok(Some(byte)),
                None => {
                    std::thread::sleep(timeout);
                    Ok(None)
                }
            }
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn short_waiter() -> AckWaiter {
        AckWaiter::new(Duration::from_millis(300), Duration::from_millis(20))
    }

    #[test]
    fn test_immediate_ack() {
        let mut line = ScriptedLine::new(&[ACK_BYTE]);
        let start = Instant::now();
        let outcome = AckWaiter::default()
            .wait(&mut line, &AbortFlag::new(), start)
            .unwrap();
        assert!(matches!(outcome, AckOutcome::Acknowledged { .. }));
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(line.reads, 1);
    }

    #[test]
    fn test_noise_before_ack_is_discarded() {
        let mut line = ScriptedLine::new(&[0x00, b'?', 0xAB, ACK_BYTE]);
        let outcome = short_waiter()
            .wait(&mut line, &AbortFlag::new(), Instant::now())
            .unwrap();
        assert!(matches!(outcome, AckOutcome::Acknowledged { .. }));
        assert_eq!(line.reads, 4);
    }

    #[test]
    fn test_timeout_not_before_deadline() {
        let mut line = ScriptedLine::new(&[0x55, 0x55]);
        let waiter = short_waiter();
        let start = Instant::now();
        let outcome = waiter.wait(&mut line, &AbortFlag::new(), start).unwrap();
        let elapsed = start.elapsed();
        match outcome {
            AckOutcome::TimedOut { waited } => assert!(waited >= waiter.timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(300 + 100));
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        let mut line = ScriptedLine::new(&[]);
        let start = Instant::now();
        let outcome = AckWaiter::default()
            .wait(&mut line, &AbortFlag::new(), start)
            .unwrap();
        assert!(matches!(outcome, AckOutcome::TimedOut { .. }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_millis(5_000 + 200));
    }

    #[test]
    fn test_deadline_counts_from_send_time() {
        let mut line = ScriptedLine::new(&[]);
        let sent_at = Instant::now() - Duration::from_millis(400);
        let outcome = short_waiter()
            .wait(&mut line, &AbortFlag::new(), sent_at)
            .unwrap();
        assert!(matches!(outcome, AckOutcome::TimedOut { .. }));
        assert_eq!(line.reads, 0);
    }

    #[test]
    fn test_abort_cancels_wait() {
        let flag = AbortFlag::new();
        let mut line = ScriptedLine::new(&[]);
        line.abort_after_reads = Some((3, flag.clone()));
        let waiter = AckWaiter::new(Duration::from_secs(5), Duration::from_millis(20));
        let start = Instant::now();
        let outcome = waiter.wait(&mut line, &flag, start).unwrap();
        assert_eq!(outcome, AckOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_already_aborted_never_reads() {
        let flag = AbortFlag::new();
        flag.trigger();
        let mut line = ScriptedLine::new(&[ACK_BYTE]);
        let outcome = short_waiter().wait(&mut line, &flag, Instant::now()).unwrap();
        assert_eq!(outcome, AckOutcome::Cancelled);
        assert_eq!(line.reads, 0);
    }

    #[test]
    fn test_transport_failure_is_error() {
        let mut line = ScriptedLine::new(&[]);
        line.fail = true;
        let result = short_waiter().wait(&mut line, &AbortFlag::new(), Instant::now());
        assert!(matches!(result, Err(SenderError::Connection(_))));
    }
}
