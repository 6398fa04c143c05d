use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How `pcnc` renders log events on stderr.
///
/// Spelled `compact` or `json` in flags, `PCNC_LOG_FORMAT` and configuration
/// files.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One terse line per event.
    #[default]
    Compact,
    /// One JSON object per event with fields flattened to the top level.
    Json,
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
