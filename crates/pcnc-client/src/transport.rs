//! Byte-stream transport to the controller.
//!
//! The controller protocol has no framing: every request is one line, and a
//! query's response is whatever the next single read returns. The
//! [`Transport`] trait captures exactly those two primitives so the dispatcher
//! can run over any stream, while [`connect`] opens the real channel described
//! by a [`ControllerEndpoint`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use pcnc_config::ControllerEndpoint;
use tracing::{debug, info};

#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

#[cfg(windows)]
use std::fs::File;

use crate::error::ConnectError;

pub(crate) const TRANSPORT_TARGET: &str = "pcnc_client::transport";

/// Size of the buffer a single response read fills.
pub const RESPONSE_BUFFER_LEN: usize = 1024;

/// Blocking request/response primitives used by the dispatcher.
///
/// Implementations are driven from a single thread; no two calls ever overlap.
pub trait Transport: Send {
    /// Writes a complete request and flushes it before returning.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the write or flush fails.
    fn write_request(&mut self, request: &[u8]) -> io::Result<()>;

    /// Performs one blocking read and returns whatever it produced.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, or [`io::ErrorKind::UnexpectedEof`]
    /// when the controller closed the channel.
    fn read_response(&mut self) -> io::Result<Vec<u8>>;

    /// Releases the channel. Called once, by the dispatcher, at shutdown.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the channel cannot be shut down
    /// cleanly.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A blocking duplex byte stream that can be shut down.
pub trait ByteChannel: Read + Write + Send {
    /// Shuts the channel down. The default only flushes pending output.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn shutdown(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// [`Transport`] over any [`ByteChannel`].
pub struct StreamTransport<S> {
    stream: S,
    buffer: Box<[u8]>,
}

impl<S> StreamTransport<S>
where
    S: ByteChannel,
{
    /// Wraps a connected stream.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: vec![0u8; RESPONSE_BUFFER_LEN].into_boxed_slice(),
        }
    }

    /// Consumes the transport and returns the stream.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: ByteChannel,
{
    fn write_request(&mut self, request: &[u8]) -> io::Result<()> {
        self.stream.write_all(request)?;
        self.stream.flush()
    }

    fn read_response(&mut self) -> io::Result<Vec<u8>> {
        read_once(&mut self.stream, &mut self.buffer)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown()
    }
}

/// An open channel to the controller.
#[derive(Debug)]
pub enum Connection {
    /// TCP stream.
    Tcp(TcpStream),
    /// Unix domain socket stream.
    #[cfg(unix)]
    Unix(UnixStream),
    /// Windows named pipe opened as a file.
    #[cfg(windows)]
    Pipe(File),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
            #[cfg(windows)]
            Self::Pipe(pipe) => pipe.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
            #[cfg(windows)]
            Self::Pipe(pipe) => pipe.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
            #[cfg(windows)]
            Self::Pipe(pipe) => pipe.flush(),
        }
    }
}

impl ByteChannel for Connection {
    fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => shutdown_quietly(stream.shutdown(Shutdown::Both)),
            #[cfg(unix)]
            Self::Unix(stream) => shutdown_quietly(stream.shutdown(Shutdown::Both)),
            #[cfg(windows)]
            Self::Pipe(pipe) => pipe.flush(),
        }
    }
}

fn read_once<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<Vec<u8>> {
    let read = reader.read(buffer)?;
    if read == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "controller closed the channel",
        ));
    }
    Ok(buffer.get(..read).map(<[u8]>::to_vec).unwrap_or_default())
}

// A peer that already hung up reports `NotConnected`; the channel is closed
// either way.
fn shutdown_quietly(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

/// Opens the channel described by `endpoint`, waiting at most `timeout`.
///
/// # Errors
///
/// Returns [`ConnectError`] when the address cannot be resolved, the
/// controller does not accept the connection in time, or the platform lacks
/// the endpoint's transport.
pub fn connect(
    endpoint: &ControllerEndpoint,
    timeout: Duration,
) -> Result<Connection, ConnectError> {
    debug!(
        target: TRANSPORT_TARGET,
        endpoint = %endpoint,
        timeout = ?timeout,
        "connecting to controller"
    );
    let connection = match endpoint {
        ControllerEndpoint::Tcp { host, port } => {
            let endpoint_display = endpoint.to_string();
            let address =
                resolve_tcp_address(host, *port).map_err(|error| ConnectError::Resolve {
                    endpoint: endpoint_display.clone(),
                    source: error,
                })?;

            TcpStream::connect_timeout(&address, timeout)
                .map(Connection::Tcp)
                .map_err(|source| ConnectError::Connect {
                    endpoint: endpoint_display,
                    source,
                })?
        }
        ControllerEndpoint::Unix { path } => {
            connect_unix_endpoint(endpoint, path.as_str(), timeout)?
        }
        ControllerEndpoint::Pipe { .. } => connect_pipe_endpoint(endpoint, timeout)?,
    };
    info!(
        target: TRANSPORT_TARGET,
        endpoint = %endpoint,
        "connected to controller"
    );
    Ok(connection)
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix_endpoint(
    endpoint: &ControllerEndpoint,
    path: &str,
    timeout: Duration,
) -> Result<Connection, ConnectError> {
    connect_unix(path, timeout).map_err(|source| ConnectError::Connect {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[cfg(not(unix))]
fn connect_unix_endpoint(
    endpoint: &ControllerEndpoint,
    _path: &str,
    _timeout: Duration,
) -> Result<Connection, ConnectError> {
    Err(ConnectError::UnsupportedTransport {
        endpoint: endpoint.to_string(),
    })
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    let stream = UnixStream::from(OwnedFd::from(socket));
    Ok(Connection::Unix(stream))
}

#[cfg(windows)]
fn connect_pipe_endpoint(
    endpoint: &ControllerEndpoint,
    timeout: Duration,
) -> Result<Connection, ConnectError> {
    let Some(path) = endpoint.pipe_path() else {
        return Err(ConnectError::UnsupportedTransport {
            endpoint: endpoint.to_string(),
        });
    };
    pipe::connect(&path, timeout)
        .map(Connection::Pipe)
        .map_err(|source| ConnectError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })
}

#[cfg(not(windows))]
fn connect_pipe_endpoint(
    endpoint: &ControllerEndpoint,
    _timeout: Duration,
) -> Result<Connection, ConnectError> {
    Err(ConnectError::UnsupportedTransport {
        endpoint: endpoint.to_string(),
    })
}

#[cfg(windows)]
mod pipe {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::thread;
    use std::time::{Duration, Instant};

    /// `ERROR_PIPE_BUSY`: every server instance is serving another client.
    const ERROR_PIPE_BUSY: i32 = 231;
    const POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Opens a named pipe client, polling while the pipe is absent or busy.
    pub(super) fn connect(path: &str, timeout: Duration) -> io::Result<File> {
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().read(true).write(true).open(path) {
                Ok(file) => return Ok(file),
                Err(error) if is_transient(&error) => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("pipe {path} unavailable after {timeout:?}: {error}"),
                        ));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn is_transient(error: &io::Error) -> bool {
        error.kind() == io::ErrorKind::NotFound || error.raw_os_error() == Some(ERROR_PIPE_BUSY)
    }
}
