//! Rendering of decoded query values.

use std::fmt;
use std::io::Write;

use clap::ValueEnum;
use pcnc_client::{AxisValues, BitArray, Client, CommandError};
use serde::Serialize;

use crate::cli::ResponseKind;
use crate::errors::AppError;

/// Output format for query results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text as the controller would present it.
    #[default]
    Human,
    /// One JSON value per line.
    Json,
}

/// A decoded query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum QueryValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Axes(AxisValues),
    Bits(BitArray),
}

impl QueryValue {
    /// Issues `request` on `client` and decodes the answer as `kind`.
    pub(crate) fn fetch(
        client: &Client,
        kind: ResponseKind,
        request: &str,
    ) -> Result<Self, CommandError> {
        match kind {
            ResponseKind::Text => client.query_as::<String>(request).wait().map(Self::Text),
            ResponseKind::Bool => client.query_as::<bool>(request).wait().map(Self::Bool),
            ResponseKind::Int => client.query_as::<i64>(request).wait().map(Self::Int),
            ResponseKind::Float => client.query_as::<f64>(request).wait().map(Self::Float),
            ResponseKind::Axes => client
                .query_as::<AxisValues>(request)
                .wait()
                .map(Self::Axes),
            ResponseKind::Bits => client.query_as::<BitArray>(request).wait().map(Self::Bits),
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => formatter.write_str(text.trim_end()),
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Int(number) => write!(formatter, "{number}"),
            Self::Float(number) => write!(formatter, "{number}"),
            Self::Axes(axes) => write!(formatter, "{axes}"),
            Self::Bits(bits) => write!(formatter, "{bits}"),
        }
    }
}

/// Writes `value` to `stdout` in `format`, followed by a newline.
pub(crate) fn render<W: Write>(
    value: &QueryValue,
    format: OutputFormat,
    stdout: &mut W,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Human => writeln!(stdout, "{value}").map_err(AppError::WriteOutput)?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *stdout, value).map_err(AppError::SerialiseValue)?;
            stdout.write_all(b"\n").map_err(AppError::WriteOutput)?;
        }
    }
    stdout.flush().map_err(AppError::WriteOutput)
}
