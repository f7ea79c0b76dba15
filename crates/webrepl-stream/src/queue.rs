//! Inbound queue — FIFO of received chunks plus the monitor readers block on.
//!
//! One lock guards the chunks and the connection state together, so a
//! reader's check-then-wait can never miss a push or a state change.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex, MutexGuard};

use webrepl_core::ConnectionState;

#[derive(Debug)]
struct QueueState {
    chunks: VecDeque<Bytes>,
    queued_bytes: usize,
    connection: ConnectionState,
    fault: Option<String>,
}

/// Shared between the transport worker (appends, state changes) and the
/// reading thread (removes).
#[derive(Debug)]
pub struct InboundQueue {
    state: Mutex<QueueState>,
    has_data: Condvar,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                chunks: VecDeque::new(),
                queued_bytes: 0,
                connection: ConnectionState::Connecting,
                fault: None,
            }),
            has_data: Condvar::new(),
        }
    }

    /// Append a chunk and wake every waiter. Empty chunks are dropped.
    pub fn push(&self, chunk: Bytes) {
        let mut state = self.state.lock();
        if !chunk.is_empty() {
            state.queued_bytes += chunk.len();
            state.chunks.push_back(chunk);
        }
        self.has_data.notify_all();
    }

    /// Move the connection to `next` (if legal) and wake every waiter.
    ///
    /// Returns the state actually in effect afterwards.
    pub fn transition(&self, next: ConnectionState) -> ConnectionState {
        let mut state = self.state.lock();
        state.connection = state.connection.advance(next);
        let now = state.connection;
        self.has_data.notify_all();
        now
    }

    /// Record a transport fault and move to Errored.
    pub fn fail(&self, reason: String) {
        let mut state = self.state.lock();
        state.connection = state.connection.advance(ConnectionState::Errored);
        if state.fault.is_none() {
            state.fault = Some(reason);
        }
        self.has_data.notify_all();
    }

    /// Wake every waiter without changing anything.
    pub fn wake_all(&self) {
        let _state = self.state.lock();
        self.has_data.notify_all();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    /// First fault reported by the transport, if any.
    pub fn fault(&self) -> Option<String> {
        self.state.lock().fault.clone()
    }

    /// Bytes currently buffered.
    pub fn queued_bytes(&self) -> usize {
        self.state.lock().queued_bytes
    }

    /// Chunks currently buffered.
    pub fn chunk_count(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// Take the lock for a sequence of queue operations.
    pub fn lock(&self) -> QueueGuard<'_> {
        QueueGuard {
            state: self.state.lock(),
            has_data: &self.has_data,
        }
    }
}

/// Exclusive access to the queue. Dropping it releases the lock.
pub struct QueueGuard<'a> {
    state: MutexGuard<'a, QueueState>,
    has_data: &'a Condvar,
}

impl QueueGuard<'_> {
    pub fn pop_front(&mut self) -> Option<Bytes> {
        let chunk = self.state.chunks.pop_front()?;
        self.state.queued_bytes -= chunk.len();
        Some(chunk)
    }

    /// Return an unconsumed remainder to the head of the queue.
    pub fn push_front(&mut self, remainder: Bytes) {
        if remainder.is_empty() {
            return;
        }
        self.state.queued_bytes += remainder.len();
        self.state.chunks.push_front(remainder);
    }

    pub fn is_empty(&self) -> bool {
        self.state.chunks.is_empty()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection
    }

    pub fn fault(&self) -> Option<&str> {
        self.state.fault.as_deref()
    }

    /// Block until woken or `remaining` elapses. The lock is released
    /// while waiting. Returns true if the wait timed out.
    pub fn wait(&mut self, remaining: Duration) -> bool {
        self.has_data.wait_for(&mut self.state, remaining).timed_out()
    }
}
