/*!
Wire frames.

A frame carries one position as ASCII text:

```text
P:1500,N:2000,P:0\n
```

Each axis is a sign marker (`P` or `N`), a colon and the magnitude of the
scaled value. Axes appear in X, Y, Z order and the frame ends with a single
newline. There is no other whitespace.
*/

use crate::error::{Result, SenderError};
use crate::position::{Axis, Position, Sign};
use std::fmt;

/// One encoded motion command, ready to be written to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    text: String,
}

impl Frame {
    /// Encode a position. Total: every position has a frame.
    pub fn encode(position: &Position) -> Self {
        let fields: Vec<String> = Axis::ALL
            .iter()
            .map(|axis| {
                let value = position.get(*axis);
                format!("{}:{}", Sign::of(value).marker(), value.unsigned_abs())
            })
            .collect();

        Self {
            text: format!("{}\n", fields.join(",")),
        }
    }

    /// Decode a frame received from the wire
    pub fn decode(raw: &[u8]) -> Result<Position> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| SenderError::invalid_frame("frame is not ASCII text"))?;
        let body = text
            .strip_suffix('\n')
            .ok_or_else(|| SenderError::invalid_frame("missing trailing newline"))?;

        let fields: Vec<&str> = body.split(',').collect();
        if fields.len() != Axis::ALL.len() {
            return Err(SenderError::invalid_frame(format!(
                "expected 3 fields, got {}",
                fields.len()
            )));
        }

        let mut position = Position::default();
        for (axis, field) in Axis::ALL.into_iter().zip(fields) {
            position.set(axis, decode_field(axis, field)?);
        }
        Ok(position)
    }

    /// Frame text including the trailing newline
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim_end())
    }
}

/// Decode one `S:N` field
fn decode_field(axis: Axis, field: &str) -> Result<i64> {
    let (marker, magnitude) = field
        .split_once(':')
        .ok_or_else(|| SenderError::invalid_frame(format!("{} field '{}' has no ':'", axis.letter(), field)))?;

    let mut chars = marker.chars();
    let sign = match (chars.next().and_then(Sign::from_marker), chars.next()) {
        (Some(sign), None) => sign,
        _ => {
            return Err(SenderError::invalid_frame(format!(
                "{} field has invalid sign '{}'",
                axis.letter(),
                marker
            )))
        }
    };

    if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SenderError::invalid_frame(format!(
            "{} field has invalid magnitude '{}'",
            axis.letter(),
            magnitude
        )));
    }
    let magnitude: i64 = magnitude
        .parse()
        .map_err(|_| SenderError::invalid_frame(format!("{} magnitude out of range", axis.letter())))?;

    Ok(match sign {
        Sign::Positive => magnitude,
        Sign::Negative => -magnitude,
    })
}
