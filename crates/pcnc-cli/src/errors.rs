//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use pcnc_client::{CommandError, ConnectError, ShutdownError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("request failed: {0}")]
    Command(#[from] CommandError),
    #[error("failed to shut the client down: {0}")]
    Shutdown(#[from] ShutdownError),
    #[error("failed to serialise query result: {0}")]
    SerialiseValue(serde_json::Error),
    #[error("failed to write query result: {0}")]
    WriteOutput(io::Error),
}
