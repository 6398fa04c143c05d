//! Decoders from raw controller responses to typed values.
//!
//! Numeric decoders are strict: malformed text is a [`DecodeError`]. The
//! boolean, bit-array and axis decoders are permissive and map anything they
//! do not recognise to `false` or to an untouched zero field. The controller
//! emits the latter kinds of response in bulk and a partially garbled line
//! must not discard the rest.

use std::fmt;

use serde::Serialize;

use crate::error::DecodeError;

/// Types that can be decoded from a single controller response.
pub trait FromResponse: Sized {
    /// Decodes `text`, the raw response to one query.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the text does not describe a value of this
    /// type. Permissive decoders never fail.
    fn from_response(text: &str) -> Result<Self, DecodeError>;
}

/// `"1"` is true; any other text is false.
#[must_use]
pub fn boolean(text: &str) -> bool {
    text == "1"
}

/// Parses a signed integer, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`DecodeError::Integer`] when the text is not an integer.
pub fn integer(text: &str) -> Result<i64, DecodeError> {
    text.trim()
        .parse()
        .map_err(|source| DecodeError::Integer {
            input: text.to_owned(),
            source,
        })
}

/// Parses a floating-point number with `.` as the decimal separator.
///
/// # Errors
///
/// Returns [`DecodeError::Float`] when the text is not a number.
pub fn float(text: &str) -> Result<f64, DecodeError> {
    text.trim().parse().map_err(|source| DecodeError::Float {
        input: text.to_owned(),
        source,
    })
}

/// Decodes one boolean per character of `text`.
#[must_use]
pub fn bits(text: &str) -> BitArray {
    BitArray(text.chars().map(|state| state == '1').collect())
}

/// Decodes a `NAME:VALUE` block into an [`AxisValues`] record.
#[must_use]
pub fn axes(text: &str) -> AxisValues {
    let mut values = AxisValues::default();
    for line in text.split('\n') {
        let mut tokens = line.split(':');
        let (Some(name), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            continue;
        };
        let (Some(axis), Ok(value)) = (Axis::from_name(name.trim()), value.trim().parse()) else {
            continue;
        };
        values.set(axis, value);
    }
    values
}

impl FromResponse for bool {
    fn from_response(text: &str) -> Result<Self, DecodeError> {
        Ok(boolean(text))
    }
}

impl FromResponse for i64 {
    fn from_response(text: &str) -> Result<Self, DecodeError> {
        integer(text)
    }
}

impl FromResponse for f64 {
    fn from_response(text: &str) -> Result<Self, DecodeError> {
        float(text)
    }
}

impl FromResponse for String {
    fn from_response(text: &str) -> Result<Self, DecodeError> {
        Ok(text.to_owned())
    }
}

impl FromResponse for BitArray {
    fn from_response(text: &str) -> Result<Self, DecodeError> {
        Ok(bits(text))
    }
}

impl FromResponse for AxisValues {
    fn from_response(text: &str) -> Result<Self, DecodeError> {
        Ok(axes(text))
    }
}

/// Machine axes in the order the controller reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Linear X.
    X,
    /// Linear Y.
    Y,
    /// Linear Z.
    Z,
    /// Rotary about X.
    A,
    /// Rotary about Y.
    B,
    /// Rotary about Z.
    C,
    /// Secondary linear parallel to X.
    U,
    /// Secondary linear parallel to Y.
    V,
    /// Secondary linear parallel to Z.
    W,
}

impl Axis {
    /// All axes in report order.
    pub const ALL: [Self; 9] = [
        Self::X,
        Self::Y,
        Self::Z,
        Self::A,
        Self::B,
        Self::C,
        Self::U,
        Self::V,
        Self::W,
    ];

    /// Looks up an axis by its single-letter name (case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.name() == name)
    }

    /// Single-letter name used on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::U => "U",
            Self::V => "V",
            Self::W => "W",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Coordinates for all nine axes; axes missing from a response stay `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct AxisValues {
    x: f64,
    y: f64,
    z: f64,
    a: f64,
    b: f64,
    c: f64,
    u: f64,
    v: f64,
    w: f64,
}

impl AxisValues {
    /// Value for `axis`.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::A => self.a,
            Axis::B => self.b,
            Axis::C => self.c,
            Axis::U => self.u,
            Axis::V => self.v,
            Axis::W => self.w,
        }
    }

    /// Returns a copy with `axis` set to `value`.
    #[must_use]
    pub const fn with(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    const fn set(&mut self, axis: Axis, value: f64) {
        let slot = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::A => &mut self.a,
            Axis::B => &mut self.b,
            Axis::C => &mut self.c,
            Axis::U => &mut self.u,
            Axis::V => &mut self.v,
            Axis::W => &mut self.w,
        };
        *slot = value;
    }

    /// Iterates over `(axis, value)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL.into_iter().map(|axis| (axis, self.get(axis)))
    }
}

impl fmt::Display for AxisValues {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (axis, value)) in self.iter().enumerate() {
            if index > 0 {
                formatter.write_str(" ")?;
            }
            write!(formatter, "{axis}:{value}")?;
        }
        Ok(())
    }
}

/// Fixed-width sequence of boolean states, one per response character.
///
/// The protocol carries no count, so the width is whatever the controller
/// sent; callers know the expected width from the query they issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BitArray(Vec<bool>);

impl BitArray {
    /// Number of states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the response was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// State at a zero-based position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    /// State of a one-based channel, matching the controller's `input1`,
    /// `output1`, ... numbering.
    #[must_use]
    pub fn channel(&self, number: usize) -> Option<bool> {
        number.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Iterates over the states in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Borrows the states as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl From<BitArray> for Vec<bool> {
    fn from(bits: BitArray) -> Self {
        bits.0
    }
}

impl fmt::Display for BitArray {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in self.iter() {
            formatter.write_str(if state { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1", true)]
    #[case("0", false)]
    #[case("x", false)]
    #[case("", false)]
    fn boolean_is_permissive(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(boolean(input), expected);
    }

    #[rstest]
    #[case("42", 42)]
    #[case("-3", -3)]
    #[case(" 7\n", 7)]
    fn integer_parses(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(integer(input).expect("integer"), expected);
    }

    #[rstest]
    fn integer_rejects_text() {
        let error = integer("abc").expect_err("abc is not an integer");
        assert!(matches!(error, DecodeError::Integer { ref input, .. } if input == "abc"));
    }

    #[rstest]
    fn float_uses_dot_separator() {
        assert!((float("3.5").expect("float") - 3.5).abs() < f64::EPSILON);
        assert!(float("3,5").is_err());
    }

    #[rstest]
    fn axes_fill_named_fields_only() {
        let values = axes("X:1.5\nY:2.5\nZ:0\n");
        assert_eq!(
            values,
            AxisValues::default()
                .with(Axis::X, 1.5)
                .with(Axis::Y, 2.5)
                .with(Axis::Z, 0.0)
        );
        assert!(values.get(Axis::W).abs() < f64::EPSILON);
    }

    #[rstest]
    fn axes_skip_malformed_and_unknown_tokens() {
        let values = axes("X:1\nQ:9\nY:oops\nZ:1:2\ngarbage\nA: 4.25 \r\n");
        assert_eq!(
            values,
            AxisValues::default().with(Axis::X, 1.0).with(Axis::A, 4.25)
        );
    }

    #[rstest]
    fn axes_render_all_fields() {
        let values = AxisValues::default().with(Axis::X, 1.5).with(Axis::W, -2.0);
        assert_eq!(values.to_string(), "X:1.5 Y:0 Z:0 A:0 B:0 C:0 U:0 V:0 W:-2");
    }

    #[rstest]
    fn bits_decode_per_character() {
        let decoded = bits("10110001");
        assert_eq!(
            decoded.as_slice(),
            &[true, false, true, true, false, false, false, true]
        );
        assert_eq!(decoded.channel(1), Some(true));
        assert_eq!(decoded.channel(2), Some(false));
        assert_eq!(decoded.channel(0), None);
        assert_eq!(decoded.to_string(), "10110001");
    }

    #[rstest]
    fn bits_width_follows_response() {
        assert_eq!(bits("1x").len(), 2);
        assert!(bits("").is_empty());
    }
}
