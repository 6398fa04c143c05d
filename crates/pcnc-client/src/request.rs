//! Formatting of request lines.
//!
//! A request is `<command>[ <arg>][=<value>]`; the line terminator is added
//! when the request is queued.

use std::fmt;

/// Builder for one request line.
///
/// ```
/// use pcnc_client::RequestLine;
///
/// let set = RequestLine::new("param").arg("feedOverride").value(1.25);
/// assert_eq!(set.as_str(), "param feedOverride=1.25");
///
/// let mdi = RequestLine::new("mdi").quoted("G0 X10");
/// assert_eq!(mdi.as_str(), r#"mdi "G0 X10""#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    text: String,
}

impl RequestLine {
    /// Starts a request for `command`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            text: command.to_owned(),
        }
    }

    /// Appends a space-separated bare argument.
    #[must_use]
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.text.push(' ');
        self.text.push_str(&arg.to_string());
        self
    }

    /// Appends a space-separated argument wrapped in double quotes.
    #[must_use]
    pub fn quoted(mut self, arg: &str) -> Self {
        self.text.push_str(&format!(" \"{arg}\""));
        self
    }

    /// Appends `=value`.
    #[must_use]
    pub fn value(mut self, value: impl WireValue) -> Self {
        self.text.push('=');
        value.write_wire(&mut self.text);
        self
    }

    /// The formatted request without its line terminator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for RequestLine {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.text)
    }
}

impl From<RequestLine> for String {
    fn from(line: RequestLine) -> Self {
        line.text
    }
}

/// Values that can follow `=` in a request.
///
/// Numbers use Rust's locale-independent formatting; booleans are `1`/`0`.
pub trait WireValue {
    /// Appends the wire form of the value to `out`.
    fn write_wire(&self, out: &mut String);
}

impl WireValue for bool {
    fn write_wire(&self, out: &mut String) {
        out.push(if *self { '1' } else { '0' });
    }
}

impl WireValue for &str {
    fn write_wire(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl WireValue for String {
    fn write_wire(&self, out: &mut String) {
        out.push_str(self);
    }
}

macro_rules! display_wire_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireValue for $ty {
                fn write_wire(&self, out: &mut String) {
                    out.push_str(&self.to_string());
                }
            }
        )*
    };
}

display_wire_value!(i32, i64, u32, u64, f32, f64);

/// Appends the line terminator, rejecting text that would split into several
/// requests on the wire.
pub(crate) fn terminate_line(request: &str) -> Result<Vec<u8>, &'static str> {
    let body = request.strip_suffix('\n').unwrap_or(request);
    if body.contains(['\n', '\r']) {
        return Err("request contains a line break");
    }
    if body.is_empty() {
        return Err("request is empty");
    }
    let mut line = Vec::with_capacity(body.len() + 1);
    line.extend_from_slice(body.as_bytes());
    line.push(b'\n');
    Ok(line)
}
