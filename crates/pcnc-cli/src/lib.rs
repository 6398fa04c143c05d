//! Runtime for the `pcnc` command tool.
//!
//! `pcnc` opens one client connection to the controller, issues a single
//! request and prints the outcome. Configuration flags precede the
//! subcommand:
//!
//! ```text
//! pcnc --endpoint tcp://127.0.0.1:5000 send start
//! pcnc query --as axes --output json pos
//! ```
//!
//! The runtime takes its IO streams and configuration loader as parameters so
//! tests can drive it without a terminal.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use pcnc_client::Client;
use pcnc_config::Config;
use tracing::debug;

mod cli;
mod config;
mod errors;
mod output;
mod telemetry;

use cli::{Cli, CliCommand, request_text};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
pub(crate) use errors::AppError;
use output::{QueryValue, render};

const CLI_TARGET: &str = "pcnc_cli";

/// Runs the CLI with the process configuration loader.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let result = Cli::try_parse_from(command_arguments(&args, &split))
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            let config = loader.load(&split.config_arguments)?;
            telemetry::initialise(&config)?;
            execute(cli.command, &config, stdout)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // `--help` and `--version` arrive as clap errors meant for stdout.
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

/// Connects, performs `command`, and always terminates the client.
fn execute<W: Write>(command: CliCommand, config: &Config, stdout: &mut W) -> Result<(), AppError> {
    let client = Client::connect(config)?;
    let outcome = perform(&client, command, stdout);
    let shutdown = client.terminate().map_err(AppError::from);
    outcome.and(shutdown)
}

fn perform<W: Write>(client: &Client, command: CliCommand, stdout: &mut W) -> Result<(), AppError> {
    match command {
        CliCommand::Send { words } => {
            let request = request_text(&words);
            client.send(&request).wait()?;
            debug!(target: CLI_TARGET, request = request.as_str(), "command sent");
            Ok(())
        }
        CliCommand::Query {
            kind,
            output,
            words,
        } => {
            let request = request_text(&words);
            let value = QueryValue::fetch(client, kind, &request)?;
            debug!(target: CLI_TARGET, request = request.as_str(), ?kind, "query answered");
            render(&value, output, stdout)
        }
    }
}
