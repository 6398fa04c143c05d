//! Command-line argument definitions for `pcnc`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::output::OutputFormat;

/// Command-line interface for the PlanetCNC command tool.
///
/// Configuration flags are handled before clap sees the arguments; see
/// `CONFIG_CLI_FLAGS`.
#[derive(Parser, Debug)]
#[command(name = "pcnc", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Writes a command to the controller without waiting for an answer.
    Send {
        /// Request words, joined with single spaces (for example `start`).
        #[arg(
            value_name = "WORD",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        words: Vec<String>,
    },
    /// Sends a query and prints the decoded answer.
    Query {
        /// How to decode the controller's response.
        #[arg(long = "as", value_enum, default_value_t = ResponseKind::Text)]
        kind: ResponseKind,
        /// How to print the decoded value.
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        output: OutputFormat,
        /// Request words, joined with single spaces (for example `pos`).
        #[arg(
            value_name = "WORD",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        words: Vec<String>,
    },
}

/// Decoder applied to a query response.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum ResponseKind {
    /// Raw response text.
    #[default]
    Text,
    /// `1` is true, anything else false.
    Bool,
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// Axis position list (`X:..` through `W:..`).
    Axes,
    /// String of `0`/`1` channel states.
    Bits,
}

/// Joins request words into one request line.
pub(crate) fn request_text(words: &[String]) -> String {
    words.join(" ")
}
