//! FIFO of pending envelopes shared between callers and the dispatcher.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::envelope::Envelope;

type Boxed = Box<dyn Envelope>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Boxed>,
    closed: bool,
}

/// Unbounded FIFO guarded by one mutex, with a condition variable that wakes
/// the dispatcher when work arrives or the queue closes.
#[derive(Default)]
pub(crate) struct CommandQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends `envelope` and wakes the dispatcher.
    ///
    /// Once the queue is closed the envelope is handed back so the caller can
    /// cancel it.
    pub(crate) fn enqueue(&self, envelope: Boxed) -> Result<(), Boxed> {
        let mut state = self.lock();
        if state.closed {
            return Err(envelope);
        }
        state.pending.push_back(envelope);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Pops the head without blocking.
    pub(crate) fn drain_next(&self) -> Option<Boxed> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.pending.pop_front()
    }

    /// Blocks until an envelope is available and pops it, or returns `None`
    /// once the queue has been closed.
    pub(crate) fn wait_next(&self) -> Option<Boxed> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(envelope) = state.pending.pop_front() {
                return Some(envelope);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Closes the queue and returns everything still pending, in order.
    ///
    /// Further enqueues are refused and the dispatcher stops dequeuing.
    /// Closing twice returns an empty backlog the second time.
    pub(crate) fn close(&self) -> Vec<Boxed> {
        let mut state = self.lock();
        state.closed = true;
        let backlog = state.pending.drain(..).collect();
        drop(state);
        self.available.notify_all();
        backlog
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().pending.len()
    }

    // Nothing panics while the lock is held, so a poisoned guard still
    // protects a consistent queue.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
