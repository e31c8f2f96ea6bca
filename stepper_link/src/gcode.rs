/*!
Motion line recognition.

A motion line is the literal word `G0` or `G1`, followed by exactly the
words `X<num>`, `Y<num>` and `Z<num>` in that order, separated by
whitespace. Words after `Z` and anything after a `;` are ignored.

Anything that does not have that shape is "no position", including a bare
`G0`/`G1` with no coordinate words. A line that does have the shape but
carries malformed number text (`X1.2.3`, `Yabc`, `Z`) is a parse error.
*/

use crate::error::{Result, SenderError};
use crate::position::{scale_encode, Axis, Position};
use regex::Regex;
use std::sync::LazyLock;

/// Accepted number literals: optional sign, then either digits with a
/// mandatory fractional part (`.5`, `1.25`) or plain digits (`7`)
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(\d*\.\d+|\d+)$").expect("number pattern is valid")
});

/// Command words that carry a position
const MOTION_WORDS: [&str; 2] = ["G0", "G1"];

/// Parse one line of GCode.
///
/// `line_number` is 1-based and only used for error reporting.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<Position>> {
    let code = line.split(';').next().unwrap_or_default();
    let mut words = code.split_whitespace();

    match words.next() {
        Some(word) if MOTION_WORDS.contains(&word) => {}
        _ => return Ok(None),
    }

    let mut position = Position::default();
    for axis in Axis::ALL {
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let Some(value) = word.strip_prefix(axis.letter()) else {
            return Ok(None);
        };
        position.set(axis, parse_coordinate(axis, value, line_number)?);
    }

    Ok(Some(position))
}

/// Validate and scale one coordinate value
fn parse_coordinate(axis: Axis, text: &str, line_number: usize) -> Result<i64> {
    if !NUMBER.is_match(text) {
        return Err(SenderError::parse(
            line_number,
            format!("invalid {} value '{}'", axis.letter(), text),
        ));
    }

    let value: f64 = text.parse().map_err(|e| {
        SenderError::parse(
            line_number,
            format!("invalid {} value '{}': {}", axis.letter(), text, e),
        )
    })?;

    scale_encode(value).ok_or_else(|| {
        SenderError::parse(
            line_number,
            format!("{} value '{}' is out of range", axis.letter(), text),
        )
    })
}
