/*!
Run outcome reporting.
*/

use crate::error::SenderError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Idle,
    Running,
    Stopped,
    Completed,
    Failed,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Every line of the input was processed
    Completed,
    /// The operator asked to stop; `line` was not sent (or not acknowledged)
    Stopped { line: usize },
    /// A fatal error ended the run
    Failed { line: Option<usize>, error: SenderError },
}

impl RunOutcome {
    /// Terminal dispatch state for this outcome
    pub fn state(&self) -> DispatchState {
        match self {
            Self::Completed => DispatchState::Completed,
            Self::Stopped { .. } => DispatchState::Stopped,
            Self::Failed { .. } => DispatchState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Stopped { line } => write!(f, "stopped by operator at line {}", line),
            Self::Failed { line: Some(line), error } => write!(f, "failed at line {}: {}", line, error),
            Self::Failed { line: None, error } => write!(f, "failed: {}", error),
        }
    }
}

/// Summary of one run
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Lines read from the input, including non-motion lines
    pub lines_read: usize,
    /// Distinct frames written (retries not counted)
    pub frames_sent: usize,
    /// Frames the controller acknowledged
    pub frames_acknowledged: usize,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn state(&self) -> DispatchState {
        self.outcome.state()
    }

    /// Machine-readable summary
    pub fn to_json(&self) -> serde_json::Value {
        let (line, cause, message) = match &self.outcome {
            RunOutcome::Completed => (None, None, None),
            RunOutcome::Stopped { line } => (Some(*line), None, None),
            RunOutcome::Failed { line, error } => (*line, Some(error.category()), Some(error.to_string())),
        };

        serde_json::json!({
            "state": self.state(),
            "line": line,
            "cause": cause,
            "message": message,
            "lines_read": self.lines_read,
            "frames_sent": self.frames_sent,
            "frames_acknowledged": self.frames_acknowledged,
            "started_at": self.started_at.to_rfc3339(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
        })
    }
}
