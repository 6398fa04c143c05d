//! Serialised command client for PlanetCNC motion controllers.
//!
//! The controller's command interface is a single byte channel (a Windows
//! named pipe, or a local or TCP socket on other hosts). It has no framing or
//! request ids, so a response can only be matched to the request that was
//! written immediately before it. This crate keeps that channel honest when
//! many threads issue commands at once.
//!
//! # Architecture
//!
//! A [`Client`] owns one connection and one dispatcher thread. Every request
//! becomes an envelope on a FIFO queue; the dispatcher performs at most one
//! round-trip at a time and settles the caller's [`Reply`]:
//!
//! - [`Client::send`] writes a fire-and-forget command and never reads.
//! - [`Client::query`] writes a request, reads one response and converts it
//!   with a caller-supplied decoder. [`Client::query_as`] picks the decoder
//!   from the [`FromResponse`] implementation of the target type.
//!
//! A failed write, read or decode settles only the request concerned; the
//! dispatcher moves on to the next one. [`Client::terminate`] lets the
//! in-flight request finish, cancels everything still queued and closes the
//! connection.
//!
//! # Example
//!
//! ```rust,no_run
//! use pcnc_client::{Client, RequestLine, decode};
//! use pcnc_config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(&Config::default())?;
//! let feed = client.send(RequestLine::new("param").arg("feedOverride").value(0.8));
//! let estop = client.query("isestop", |text| Ok(decode::boolean(text)));
//! let line = client.query_as::<i64>("line");
//! feed.wait()?;
//! println!("estop={} line={}", estop.wait()?, line.wait()?);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod decode;
mod dispatcher;
mod envelope;
mod error;
mod queue;
mod request;
mod transport;

#[cfg(test)]
mod tests;

pub use self::client::Client;
pub use self::decode::{Axis, AxisValues, BitArray, FromResponse};
pub use self::envelope::{Decoder, Reply};
pub use self::error::{CommandError, ConnectError, DecodeError, ShutdownError};
pub use self::request::{RequestLine, WireValue};
pub use self::transport::{
    ByteChannel, Connection, RESPONSE_BUFFER_LEN, StreamTransport, Transport, connect,
};
