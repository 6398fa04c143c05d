//! Queued units of work and the handles callers wait on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::dispatcher::DISPATCH_TARGET;
use crate::error::{CommandError, DecodeError};
use crate::transport::Transport;

/// Caller-supplied conversion from response text to a typed value.
pub type Decoder<T> = Box<dyn FnOnce(&str) -> Result<T, DecodeError> + Send>;

/// Completion handle for one request.
///
/// The handle settles exactly once, with the decoded value or a
/// [`CommandError`]. Requests that were still queued when the client
/// terminated settle with [`CommandError::Cancelled`].
#[derive(Debug)]
#[must_use = "a reply carries the only report of the request's outcome"]
pub struct Reply<T> {
    receiver: Receiver<Result<T, CommandError>>,
}

impl<T> Reply<T> {
    /// Returns a handle that is already settled with `result`.
    pub(crate) fn settled(result: Result<T, CommandError>) -> Self {
        let (settle, reply) = channel();
        settle.settle(result);
        reply
    }

    /// Blocks until the request settles.
    ///
    /// # Errors
    ///
    /// Returns the request's [`CommandError`].
    pub fn wait(self) -> Result<T, CommandError> {
        self.receiver.recv().unwrap_or(Err(CommandError::Cancelled))
    }

    /// Blocks until the request settles or `timeout` elapses.
    ///
    /// Giving up does not withdraw the request; it is still dispatched in
    /// order and its outcome is discarded.
    ///
    /// # Errors
    ///
    /// Returns the request's [`CommandError`], or [`CommandError::TimedOut`].
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, CommandError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CommandError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(CommandError::Cancelled),
        }
    }

    /// Returns the outcome if the request has settled, or the handle back if
    /// it is still pending.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` while the request is pending.
    pub fn try_wait(self) -> Result<Result<T, CommandError>, Self> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(result),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(CommandError::Cancelled)),
        }
    }
}

/// Producer half of a [`Reply`]. Consumed by the single settlement.
pub(crate) struct Settle<T> {
    sender: Sender<Result<T, CommandError>>,
}

impl<T> Settle<T> {
    pub(crate) fn settle(self, result: Result<T, CommandError>) {
        if self.sender.send(result).is_err() {
            debug!(target: DISPATCH_TARGET, "caller dropped reply before it settled");
        }
    }
}

pub(crate) fn channel<T>() -> (Settle<T>, Reply<T>) {
    let (sender, receiver) = mpsc::channel();
    (Settle { sender }, Reply { receiver })
}

/// Type-erased queued request.
pub(crate) trait Envelope: Send {
    /// Request text, including the trailing line terminator.
    fn request(&self) -> &[u8];

    /// Performs the round-trip on `transport` and settles the reply.
    fn dispatch(self: Box<Self>, transport: &mut dyn Transport);

    /// Settles the reply with [`CommandError::Cancelled`] without any I/O.
    fn cancel(self: Box<Self>);
}

/// Fire-and-forget request: written, never answered.
pub(crate) struct Command {
    request: Vec<u8>,
    settle: Settle<()>,
}

impl Command {
    pub(crate) fn new(request: Vec<u8>) -> (Self, Reply<()>) {
        let (settle, reply) = channel();
        (Self { request, settle }, reply)
    }
}

impl Envelope for Command {
    fn request(&self) -> &[u8] {
        &self.request
    }

    fn dispatch(self: Box<Self>, transport: &mut dyn Transport) {
        let outcome = transport
            .write_request(&self.request)
            .map_err(CommandError::Write);
        log_outcome(&self.request, &outcome);
        self.settle.settle(outcome);
    }

    fn cancel(self: Box<Self>) {
        self.settle.settle(Err(CommandError::Cancelled));
    }
}

/// Query: written, then answered by exactly one read.
pub(crate) struct Query<T> {
    request: Vec<u8>,
    decoder: Decoder<T>,
    settle: Settle<T>,
}

impl<T> Query<T> {
    pub(crate) fn new(request: Vec<u8>, decoder: Decoder<T>) -> (Self, Reply<T>) {
        let (settle, reply) = channel();
        (
            Self {
                request,
                decoder,
                settle,
            },
            reply,
        )
    }
}

impl<T: Send> Envelope for Query<T> {
    fn request(&self) -> &[u8] {
        &self.request
    }

    fn dispatch(self: Box<Self>, transport: &mut dyn Transport) {
        let Self {
            request,
            decoder,
            settle,
        } = *self;
        let outcome = transport
            .write_request(&request)
            .map_err(CommandError::Write)
            .and_then(|()| transport.read_response().map_err(CommandError::Read))
            .and_then(|raw| {
                let text = String::from_utf8_lossy(&raw);
                debug!(
                    target: DISPATCH_TARGET,
                    response_len = raw.len(),
                    "received response"
                );
                decode_guarded(decoder, &text).map_err(CommandError::from)
            });
        log_outcome(&request, &outcome);
        settle.settle(outcome);
    }

    fn cancel(self: Box<Self>) {
        self.settle.settle(Err(CommandError::Cancelled));
    }
}

fn decode_guarded<T>(decoder: Decoder<T>, text: &str) -> Result<T, DecodeError> {
    panic::catch_unwind(AssertUnwindSafe(|| decoder(text))).unwrap_or_else(|payload| {
        Err(DecodeError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

fn log_outcome<T>(request: &[u8], outcome: &Result<T, CommandError>) {
    let request = String::from_utf8_lossy(request);
    let request = request.trim_end();
    match outcome {
        Ok(_) => debug!(target: DISPATCH_TARGET, request, "round-trip complete"),
        Err(error) => warn!(
            target: DISPATCH_TARGET,
            request,
            error = %error,
            "round-trip failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use rstest::rstest;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        reads: usize,
        response: Option<Vec<u8>>,
    }

    impl Transport for Recorder {
        fn write_request(&mut self, request: &[u8]) -> io::Result<()> {
            self.writes.push(request.to_vec());
            Ok(())
        }

        fn read_response(&mut self) -> io::Result<Vec<u8>> {
            self.reads += 1;
            self.response
                .take()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no response"))
        }
    }

    #[rstest]
    fn command_never_reads() {
        let mut transport = Recorder::default();
        let (command, reply) = Command::new(b"start\n".to_vec());
        Box::new(command).dispatch(&mut transport);

        reply.wait().expect("command should succeed");
        assert_eq!(transport.writes, vec![b"start\n".to_vec()]);
        assert_eq!(transport.reads, 0);
    }

    #[rstest]
    fn query_reads_once_and_decodes() {
        let mut transport = Recorder {
            response: Some(b"42".to_vec()),
            ..Recorder::default()
        };
        let (query, reply) = Query::new(b"line\n".to_vec(), Box::new(crate::decode::integer));
        Box::new(query).dispatch(&mut transport);

        assert_eq!(reply.wait().expect("query should succeed"), 42);
        assert_eq!(transport.reads, 1);
    }

    #[rstest]
    fn panicking_decoder_settles_with_decode_error() {
        let mut transport = Recorder {
            response: Some(b"1".to_vec()),
            ..Recorder::default()
        };
        let decoder: Decoder<bool> = Box::new(|_| panic!("bad decoder"));
        let (query, reply) = Query::new(b"isestop\n".to_vec(), decoder);
        Box::new(query).dispatch(&mut transport);

        let error = reply.wait().expect_err("panic should surface");
        assert!(matches!(
            error,
            CommandError::Decode(DecodeError::Panicked { ref message }) if message == "bad decoder"
        ));
    }

    #[rstest]
    fn cancelled_envelope_reports_cancellation() {
        let (query, reply) = Query::new(b"posx\n".to_vec(), Box::new(crate::decode::float));
        Box::new(query).cancel();
        assert!(matches!(reply.wait(), Err(CommandError::Cancelled)));
    }

    #[rstest]
    fn pending_reply_is_returned_by_try_wait() {
        let (settle, reply) = channel::<i64>();
        let reply = reply.try_wait().expect_err("nothing settled yet");
        settle.settle(Ok(7));
        let outcome = reply.try_wait().expect("settled");
        assert_eq!(outcome.expect("value"), 7);
    }

    #[rstest]
    fn wait_timeout_reports_timeout_while_pending() {
        let (_settle, reply) = channel::<i64>();
        let error = reply
            .wait_timeout(Duration::from_millis(10))
            .expect_err("nothing will settle");
        assert!(matches!(error, CommandError::TimedOut(_)));
    }
}
