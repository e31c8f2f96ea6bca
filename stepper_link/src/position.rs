/*!
Fixed-point positions.

Coordinates travel as integers scaled by [`SCALE_FACTOR`] so that no
floating-point text ever crosses the serial link.
*/

use crate::protocol::SCALE_FACTOR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Motion axes, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in the order they appear on a motion line and in a frame
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Parse an axis letter (case-insensitive)
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    /// Upper-case axis letter
    pub fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }
}

/// Direction marker used on the wire. Zero is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    /// Sign of a scaled value
    pub fn of(value: i64) -> Self {
        if value >= 0 {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// Parse the wire marker (`P` or `N`)
    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            'P' => Some(Self::Positive),
            'N' => Some(Self::Negative),
            _ => None,
        }
    }

    /// Wire marker for this sign
    pub fn marker(self) -> char {
        match self {
            Self::Positive => 'P',
            Self::Negative => 'N',
        }
    }
}

/// Convert a real-valued coordinate to its scaled integer form.
///
/// Returns `None` for non-finite input or when the scaled value does not fit
/// in an `i64`.
pub fn scale_encode(value: f64) -> Option<i64> {
    let scaled = (value * SCALE_FACTOR as f64).round();
    // i64::MAX as f64 rounds up to 2^63, which itself is out of range
    if !scaled.is_finite() || scaled >= i64::MAX as f64 || scaled < i64::MIN as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Convert a scaled integer back to a real-valued coordinate
pub fn scale_decode(value: i64) -> f64 {
    value as f64 / SCALE_FACTOR as f64
}

/// Target position of one motion command, in scaled units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Position {
    /// Create a position from already-scaled components
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Create a position from real-valued coordinates
    pub fn from_real(x: f64, y: f64, z: f64) -> Option<Self> {
        Some(Self {
            x: scale_encode(x)?,
            y: scale_encode(y)?,
            z: scale_encode(z)?,
        })
    }

    /// Scaled component for an axis
    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Set the scaled component for an axis
    pub fn set(&mut self, axis: Axis, value: i64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Real-valued component for an axis
    pub fn real(&self, axis: Axis) -> f64 {
        scale_decode(self.get(axis))
    }
}

/// Human-readable form, e.g. `PX=1.5, NY=2, PZ=0`
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let value = self.get(axis);
            write!(
                f,
                "{}{}={}",
                Sign::of(value).marker(),
                axis.letter(),
                scale_decode(value.abs())
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_roundtrip_within_one_unit() {
        let samples = [
            0.0, 0.001, -0.001, 1.5, -2.0, 0.25, 4.35, 123.456, -999_999.999, 999_999.999, 0.1 + 0.2,
        ];
        for f in samples {
            let encoded = scale_encode(f).unwrap();
            assert!((scale_decode(encoded) - f).abs() <= 0.001, "{f} -> {encoded}");
        }
    }

    #[test]
    fn test_scale_rounds_instead_of_truncating() {
        // 4.35 * 1000 is 4349.999... in binary floating point
        assert_eq!(scale_encode(4.35), Some(4350));
        assert_eq!(scale_encode(-4.35), Some(-4350));
    }

    #[test]
    fn test_scale_rejects_out_of_range() {
        assert_eq!(scale_encode(f64::NAN), None);
        assert_eq!(scale_encode(f64::INFINITY), None);
        assert_eq!(scale_encode(1e300), None);
    }

    #[test]
    fn test_sign_of_zero_is_positive() {
        assert_eq!(Sign::of(0), Sign::Positive);
        assert_eq!(Sign::of(-1), Sign::Negative);
        assert_eq!(Sign::from_marker('N'), Some(Sign::Negative));
        assert_eq!(Sign::from_marker('x'), None);
    }

    #[test]
    fn test_position_display() {
        let position = Position::new(1500, -2000, 0);
        assert_eq!(position.to_string(), "PX=1.5, NY=2, PZ=0");
    }

    #[test]
    fn test_axis_accessors() {
        let mut position = Position::default();
        position.set(Axis::Y, -250);
        assert_eq!(position.get(Axis::Y), -250);
        assert_eq!(position.real(Axis::Y), -0.25);
        assert_eq!(Axis::from_letter('z'), Some(Axis::Z));
    }

    #[test]
    fn test_from_real() {
        assert_eq!(Position::from_real(1.5, -2.0, 0.25), Some(Position::new(1500, -2000, 250)));
        assert_eq!(Position::from_real(f64::NAN, 0.0, 0.0), None);
    }
}
