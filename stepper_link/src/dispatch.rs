/*!
Dispatch loop.

Reads GCode lines in order, sends every motion line as a frame and waits for
its acknowledgment before moving on. At most one frame is ever waiting for
an ACK.

```text
Idle -> Running -> Completed   (input exhausted)
                -> Stopped     (abort flag seen between or during commands)
                -> Failed      (parse error, ACK timeout, transport error)
```

The transport is closed exactly once when the run reaches a terminal state,
whichever state that is.
*/

use crate::abort::AbortFlag;
use crate::ack::{AckOutcome, AckWaiter};
use crate::error::{Result, SenderError};
use crate::frame::Frame;
use crate::gcode::parse_line;
use crate::position::Position;
use crate::report::{RunOutcome, RunReport};
use crate::settings::TimingSettings;
use crate::transport::Transport;
use chrono::Local;
use std::io;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of delivering one frame
enum Delivery {
    Acknowledged,
    Cancelled,
}

/// Drives one run over a transport it owns
pub struct Dispatcher<T: Transport> {
    transport: T,
    waiter: AckWaiter,
    settings: TimingSettings,
    abort: AbortFlag,
    lines_read: usize,
    frames_sent: usize,
    frames_acknowledged: usize,
}

impl<T: Transport> Dispatcher<T> {
    /// Create an idle dispatcher; nothing is sent until [`Dispatcher::run`]
    pub fn new(transport: T, settings: TimingSettings, abort: AbortFlag) -> Self {
        Self {
            transport,
            waiter: AckWaiter::from_settings(&settings),
            settings,
            abort,
            lines_read: 0,
            frames_sent: 0,
            frames_acknowledged: 0,
        }
    }

    /// Process `lines` until they run out, the operator stops, or a fatal
    /// error occurs. Consumes the dispatcher and closes the transport.
    pub fn run<I>(mut self, lines: I) -> RunReport
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let started_at = Local::now();
        let start = Instant::now();

        info!("▶️ Dispatch started (ack timeout {:?}, pacing {:?}, retries {})",
              self.settings.ack_timeout(), self.settings.pacing(), self.settings.ack_retries);

        let outcome = self.drive(lines);

        if let Err(e) = self.transport.close() {
            warn!("Failed to close transport: {}", e);
        }

        match &outcome {
            RunOutcome::Completed => info!("✅ Completed: {} frames acknowledged", self.frames_acknowledged),
            RunOutcome::Stopped { line } => warn!("🛑 Operation stopped before line {} ({} frames acknowledged)",
                                                 line, self.frames_acknowledged),
            RunOutcome::Failed { error, .. } => error!("❌ Run failed: {}", error),
        }

        RunReport {
            outcome,
            lines_read: self.lines_read,
            frames_sent: self.frames_sent,
            frames_acknowledged: self.frames_acknowledged,
            started_at,
            elapsed: start.elapsed(),
        }
    }

    fn drive<I>(&mut self, lines: I) -> RunOutcome
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        for (index, line) in lines.into_iter().enumerate() {
            let line_number = index + 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return RunOutcome::Failed {
                        line: Some(line_number),
                        error: e.into(),
                    }
                }
            };
            self.lines_read += 1;

            if self.abort.is_set() {
                return RunOutcome::Stopped { line: line_number };
            }

            let position = match parse_line(&line, line_number) {
                Ok(Some(position)) => position,
                Ok(None) => {
                    debug!("Line {}: no motion, skipped", line_number);
                    continue;
                }
                Err(error) => {
                    return RunOutcome::Failed {
                        line: Some(line_number),
                        error,
                    }
                }
            };

            match self.deliver(line_number, &position) {
                Ok(Delivery::Acknowledged) => {}
                Ok(Delivery::Cancelled) => return RunOutcome::Stopped { line: line_number },
                Err(error) => {
                    return RunOutcome::Failed {
                        line: Some(line_number),
                        error,
                    }
                }
            }

            // Cut short by an abort; the next iteration reports the stop
            self.abort.sleep(self.settings.pacing(), self.settings.poll_interval());
        }

        RunOutcome::Completed
    }

    /// Write one frame and wait for its ACK, re-sending on timeout while
    /// retries remain
    fn deliver(&mut self, line_number: usize, position: &Position) -> Result<Delivery> {
        let frame = Frame::encode(position);
        let attempts = self.settings.ack_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            self.transport.write(frame.as_bytes())?;
            let sent_at = Instant::now();
            if attempt == 1 {
                self.frames_sent += 1;
                info!("Sent position: {} (line {})", position, line_number);
            }
            debug!("Frame {} written (attempt {}/{})", frame, attempt, attempts);

            match self.waiter.wait(&mut self.transport, &self.abort, sent_at)? {
                AckOutcome::Acknowledged { after } => {
                    debug!("ACK for line {} after {:?}", line_number, after);
                    self.frames_acknowledged += 1;
                    return Ok(Delivery::Acknowledged);
                }
                AckOutcome::Cancelled => return Ok(Delivery::Cancelled),
                AckOutcome::TimedOut { waited } if attempt < attempts => {
                    warn!("⚠️ No ACK for line {} after {:?}, re-sending (attempt {}/{})",
                          line_number, waited, attempt + 1, attempts);
                    attempt += 1;
                }
                AckOutcome::TimedOut { waited } => {
                    error!("ACK (0xAA) not received for line {}. Check the connection or adjust the timeout.",
                           line_number);
                    return Err(SenderError::AckTimeout {
                        line: line_number,
                        attempts,
                        waited,
                    });
                }
            }
        }
    }
}
