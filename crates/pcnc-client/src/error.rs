//! Error types for connecting to the controller and for individual requests.

use std::io;
use std::num::{ParseFloatError, ParseIntError};
use std::time::Duration;

use thiserror::Error;

/// Errors raised while constructing a [`crate::Client`].
///
/// These are fatal: the client never retries a failed connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The TCP endpoint did not resolve to a usable address.
    #[error("failed to resolve controller address {endpoint}: {source}")]
    Resolve {
        /// Display form of the endpoint.
        endpoint: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The channel could not be opened within the connection timeout.
    #[error("failed to connect to controller at {endpoint}: {source}")]
    Connect {
        /// Display form of the endpoint.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The endpoint's transport is not available on this platform.
    #[error("platform does not support the transport for {endpoint}")]
    UnsupportedTransport {
        /// Display form of the endpoint.
        endpoint: String,
    },
    /// The dispatcher thread could not be started.
    #[error("failed to start dispatcher thread: {0}")]
    SpawnWorker(#[source] io::Error),
}

/// Failure of a single request.
///
/// A `CommandError` only ever settles the request that produced it; later
/// requests are still dispatched.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The request text cannot be sent on a line-oriented channel.
    #[error("invalid request {request:?}: {reason}")]
    InvalidRequest {
        /// Offending request text.
        request: String,
        /// Why the request was rejected.
        reason: &'static str,
    },
    /// Writing the request failed.
    #[error("failed to send request to controller: {0}")]
    Write(#[source] io::Error),
    /// Reading the response failed.
    #[error("failed to read response from controller: {0}")]
    Read(#[source] io::Error),
    /// The response could not be decoded into the requested type.
    #[error("failed to decode controller response: {0}")]
    Decode(#[from] DecodeError),
    /// The client terminated before the request was dispatched.
    #[error("request was cancelled because the client terminated")]
    Cancelled,
    /// The caller stopped waiting; the request itself may still run.
    #[error("no reply within {0:?}")]
    TimedOut(Duration),
}

/// Errors produced by response decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response was not an integer.
    #[error("expected an integer, got {input:?}")]
    Integer {
        /// Raw response text.
        input: String,
        /// Parser error.
        #[source]
        source: ParseIntError,
    },
    /// The response was not a floating-point number.
    #[error("expected a number, got {input:?}")]
    Float {
        /// Raw response text.
        input: String,
        /// Parser error.
        #[source]
        source: ParseFloatError,
    },
    /// A caller-supplied decoder panicked.
    #[error("decoder panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

/// Errors raised while terminating a [`crate::Client`].
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The dispatcher thread panicked before it could close the connection.
    #[error("dispatcher thread panicked")]
    WorkerPanicked,
}
