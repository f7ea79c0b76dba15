//! Deadline-bounded reads over the inbound queue.
//!
//! Both primitives loop on "remaining = timeout − elapsed since the call
//! started", recomputed every iteration because a wakeup (error, close,
//! unrelated push) does not mean the wait is over.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use webrepl_core::StreamError;

use crate::queue::{InboundQueue, QueueGuard};

pub struct DeadlineReader {
    queue: Arc<InboundQueue>,
    /// The single active timeout. Each call snapshots it on entry.
    timeout: Mutex<Duration>,
}

impl DeadlineReader {
    pub fn new(queue: Arc<InboundQueue>, timeout: Duration) -> Self {
        Self {
            queue,
            timeout: Mutex::new(timeout),
        }
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.lock()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.lock() = timeout;
    }

    pub fn queue(&self) -> &Arc<InboundQueue> {
        &self.queue
    }

    /// Read up to `size` bytes, waiting at most the active timeout.
    ///
    /// Never fails: on deadline, or once the connection is closed and the
    /// queue drained, returns whatever arrived (possibly nothing). A chunk
    /// that overshoots `size` is split and its tail stays queued.
    pub fn read(&self, size: usize) -> Bytes {
        // Grows with what arrives; `size` is only an upper bound.
        let mut out = BytesMut::new();
        if size == 0 {
            return out.freeze();
        }

        let deadline = Deadline::start(self.timeout());
        let mut guard = self.queue.lock();

        while out.len() < size {
            let Some(remaining) = deadline.remaining() else {
                break;
            };
            if let Some(mut chunk) = guard.pop_front() {
                let want = size - out.len();
                if chunk.len() > want {
                    guard.push_front(chunk.split_off(want));
                }
                out.extend_from_slice(&chunk);
                continue;
            }
            if guard.connection_state().is_terminal() {
                break;
            }
            guard.wait(remaining);
        }

        out.freeze()
    }

    /// Block until `marker` appears in the inbound data.
    ///
    /// Returns the bytes that preceded the marker; the bytes after it go
    /// back to the head of the queue for the next read.
    ///
    /// Everything up to the marker is buffered with no upper bound, so
    /// only use this for short, known markers that are expected soon.
    pub fn wait_for_marker(&self, marker: &str) -> Result<Bytes, StreamError> {
        self.wait_for_any(&[marker]).map(|(_, before)| before)
    }

    /// Like [`wait_for_marker`](Self::wait_for_marker) for several markers.
    /// Returns the index of the marker that matched first (earliest in the
    /// data; ties go to the lower index) and the bytes before it.
    ///
    /// # Errors
    ///
    /// - `NoMarkers` if `markers` is empty
    /// - `Timeout` naming the awaited marker(s) once the deadline passes
    /// - `Connection` / `Closed` if the connection ends first
    pub fn wait_for_any(&self, markers: &[&str]) -> Result<(usize, Bytes), StreamError> {
        if markers.is_empty() {
            return Err(StreamError::NoMarkers);
        }
        if let Some(i) = markers.iter().position(|m| m.is_empty()) {
            return Ok((i, Bytes::new()));
        }
        let longest = markers.iter().map(|m| m.len()).max().unwrap_or(0);

        let deadline = Deadline::start(self.timeout());
        let mut seen = BytesMut::new();
        let mut guard = self.queue.lock();

        loop {
            let Some(remaining) = deadline.remaining() else {
                // Anything consumed so far is lost along with the wait.
                tracing::debug!(?markers, buffered = seen.len(), "marker wait timed out");
                return Err(StreamError::Timeout {
                    marker: markers.join("|"),
                });
            };

            if let Some(chunk) = guard.pop_front() {
                // Only the new bytes plus a marker-length overlap can hold
                // a match that was not there before.
                let from = seen.len().saturating_sub(longest.saturating_sub(1));
                seen.extend_from_slice(&chunk);
                if let Some((index, at, len)) = find_first(&seen[from..], markers) {
                    let at = from + at;
                    let after = seen.split_off(at + len);
                    seen.truncate(at);
                    guard.push_front(after.freeze());
                    return Ok((index, seen.freeze()));
                }
                continue;
            }

            if let Some(err) = terminal_error(&guard) {
                return Err(err);
            }
            guard.wait(remaining);
        }
    }
}

struct Deadline {
    start: Instant,
    timeout: Duration,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    /// `None` once the timeout has been exceeded.
    fn remaining(&self) -> Option<Duration> {
        self.timeout.checked_sub(self.start.elapsed())
    }
}

fn terminal_error(guard: &QueueGuard<'_>) -> Option<StreamError> {
    if !guard.connection_state().is_terminal() {
        return None;
    }
    Some(match guard.fault() {
        Some(fault) => StreamError::Connection(fault.to_owned()),
        None => StreamError::Closed,
    })
}

/// Earliest occurrence of any marker: (marker index, offset, marker length).
fn find_first(haystack: &[u8], markers: &[&str]) -> Option<(usize, usize, usize)> {
    markers
        .iter()
        .enumerate()
        .filter_map(|(i, m)| find(haystack, m.as_bytes()).map(|at| (i, at, m.len())))
        .min_by_key(|&(i, at, _)| (at, i))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
