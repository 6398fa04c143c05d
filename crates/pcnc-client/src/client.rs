//! The caller-facing client.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use pcnc_config::{Config, ControllerEndpoint};
use tracing::{info, warn};

use crate::decode::FromResponse;
use crate::dispatcher::{self, DISPATCH_TARGET};
use crate::envelope::{Command, Envelope, Query, Reply};
use crate::error::{CommandError, ConnectError, DecodeError, ShutdownError};
use crate::queue::CommandQueue;
use crate::request::terminate_line;
use crate::transport::{StreamTransport, Transport, connect};

/// Command client for one controller connection.
///
/// All methods take `&self`, so a client can be shared between threads (for
/// example behind an [`Arc`]). Requests from every thread are written to the
/// controller one at a time, in the order they were submitted.
///
/// Dropping the client terminates it.
pub struct Client {
    queue: Arc<CommandQueue>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Connects to the endpoint named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the controller cannot be reached within
    /// the configured timeout.
    pub fn connect(config: &Config) -> Result<Self, ConnectError> {
        Self::connect_to(config.endpoint(), config.connect_timeout())
    }

    /// Connects to `endpoint`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the controller cannot be reached in time.
    pub fn connect_to(
        endpoint: &ControllerEndpoint,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let connection = connect(endpoint, timeout)?;
        Self::with_transport(StreamTransport::new(connection))
    }

    /// Starts a client over an already-open transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::SpawnWorker`] if the dispatcher thread cannot
    /// be started.
    pub fn with_transport<T>(transport: T) -> Result<Self, ConnectError>
    where
        T: Transport + 'static,
    {
        let queue = Arc::new(CommandQueue::new());
        let worker = dispatcher::spawn(Arc::clone(&queue), Box::new(transport))
            .map_err(ConnectError::SpawnWorker)?;
        Ok(Self {
            queue,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queues a fire-and-forget command.
    ///
    /// The reply settles as soon as the request has been written; no response
    /// is read.
    pub fn send(&self, request: impl AsRef<str>) -> Reply<()> {
        let request = request.as_ref();
        match terminate_line(request) {
            Ok(line) => {
                let (command, reply) = Command::new(line);
                self.submit(Box::new(command));
                reply
            }
            Err(reason) => Reply::settled(Err(invalid(request, reason))),
        }
    }

    /// Queues a query whose response is converted by `decoder`.
    pub fn query<T, F>(&self, request: impl AsRef<str>, decoder: F) -> Reply<T>
    where
        T: Send + 'static,
        F: FnOnce(&str) -> Result<T, DecodeError> + Send + 'static,
    {
        let request = request.as_ref();
        match terminate_line(request) {
            Ok(line) => {
                let (query, reply) = Query::new(line, Box::new(decoder));
                self.submit(Box::new(query));
                reply
            }
            Err(reason) => Reply::settled(Err(invalid(request, reason))),
        }
    }

    /// Queues a query decoded with `T`'s [`FromResponse`] implementation.
    ///
    /// ```no_run
    /// use pcnc_client::{AxisValues, Client};
    /// use pcnc_config::Config;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = Client::connect(&Config::default())?;
    /// let position = client.query_as::<AxisValues>("pos");
    /// let feed = client.query_as::<f64>("speed");
    /// println!("{} at {}", position.wait()?, feed.wait()?);
    /// client.terminate()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn query_as<T>(&self, request: impl AsRef<str>) -> Reply<T>
    where
        T: FromResponse + Send + 'static,
    {
        self.query(request, T::from_response)
    }

    /// True once [`Client::terminate`] has begun.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.queue.is_closed()
    }

    /// Stops the dispatcher and closes the connection.
    ///
    /// A request already being written or read is allowed to finish. Requests
    /// still queued, and any submitted from now on, settle with
    /// [`CommandError::Cancelled`]. Returns once the dispatcher thread has
    /// exited and the connection is closed. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::WorkerPanicked`] if the dispatcher thread
    /// panicked.
    pub fn terminate(&self) -> Result<(), ShutdownError> {
        let backlog = self.queue.close();
        if !backlog.is_empty() {
            info!(
                target: DISPATCH_TARGET,
                cancelled = backlog.len(),
                "cancelling requests queued at termination"
            );
        }
        for envelope in backlog {
            envelope.cancel();
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match worker {
            Some(handle) => handle.join().map_err(|_| ShutdownError::WorkerPanicked),
            None => Ok(()),
        }
    }

    fn submit(&self, envelope: Box<dyn Envelope>) {
        if let Err(envelope) = self.queue.enqueue(envelope) {
            envelope.cancel();
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(error) = self.terminate() {
            warn!(target: DISPATCH_TARGET, error = %error, "client terminated uncleanly");
        }
    }
}

fn invalid(request: &str, reason: &'static str) -> CommandError {
    CommandError::InvalidRequest {
        request: request.to_owned(),
        reason,
    }
}
