//! The worker thread that owns the transport.
//!
//! The dispatcher is the only reader and writer of the channel. It sleeps on
//! the queue until work arrives, then drains envelopes one round-trip at a
//! time in submission order. A failed round-trip settles only its own
//! envelope. When the queue closes the dispatcher finishes the envelope in
//! hand, closes the transport and exits. If the transport panics the queue
//! is closed on the way out and everything still waiting settles as
//! cancelled.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace, warn};

use crate::envelope::Envelope;
use crate::queue::CommandQueue;
use crate::transport::Transport;

pub(crate) const DISPATCH_TARGET: &str = "pcnc_client::dispatcher";

const THREAD_NAME: &str = "pcnc-dispatcher";

/// Starts the dispatcher thread.
pub(crate) fn spawn(
    queue: Arc<CommandQueue>,
    transport: Box<dyn Transport>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(THREAD_NAME.to_owned())
        .spawn(move || run(&queue, transport))
}

fn run(queue: &CommandQueue, mut transport: Box<dyn Transport>) {
    let _shutdown = ShutdownGuard { queue };
    debug!(target: DISPATCH_TARGET, "dispatcher idle");
    let mut dispatched: u64 = 0;
    while let Some(first) = queue.wait_next() {
        let mut next = Some(first);
        while let Some(envelope) = next {
            dispatch(envelope, transport.as_mut());
            dispatched += 1;
            next = queue.drain_next();
        }
        trace!(target: DISPATCH_TARGET, dispatched, "queue drained");
    }

    if let Err(error) = transport.close() {
        warn!(
            target: DISPATCH_TARGET,
            error = %error,
            "failed to close controller channel cleanly"
        );
    }
    drop(transport);
    info!(
        target: DISPATCH_TARGET,
        dispatched,
        "dispatcher stopped and connection closed"
    );
}

/// Closes the queue when the dispatcher exits, however it exits.
struct ShutdownGuard<'a> {
    queue: &'a CommandQueue,
}

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        let backlog = self.queue.close();
        if thread::panicking() {
            error!(
                target: DISPATCH_TARGET,
                cancelled = backlog.len(),
                "dispatcher panicked; cancelling queued requests"
            );
        }
        for envelope in backlog {
            envelope.cancel();
        }
    }
}

fn dispatch(envelope: Box<dyn Envelope>, transport: &mut dyn Transport) {
    {
        let request = String::from_utf8_lossy(envelope.request());
        trace!(
            target: DISPATCH_TARGET,
            request = request.trim_end(),
            "dispatching"
        );
    }
    envelope.dispatch(transport);
}
