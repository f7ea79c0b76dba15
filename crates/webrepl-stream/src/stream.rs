//! The public byte-stream facade.
//!
//! Behaves like a local serial port: `read` blocks up to the active
//! timeout and may come back short, `write` sends verbatim, and
//! `bytes_waiting` reports what is buffered. A stream only exists after
//! the login exchange succeeded.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use webrepl_core::protocol::{ws_url, DEFAULT_PORT};
use webrepl_core::{ConnectionState, StreamError, WebReplConfig};

use crate::handshake::{self, Timeouts};
use crate::queue::InboundQueue;
use crate::reader::DeadlineReader;
use crate::transport::{EventSink, Frame, Transport};
use crate::ws::WsTransport;

pub struct WebReplStream {
    url: String,
    reader: DeadlineReader,
    transport: Box<dyn Transport>,
    closed: AtomicBool,
}

impl WebReplStream {
    /// Connect to `ws://<host>:8266` and log in with the default timeouts.
    pub fn open(host: &str, credential: &str) -> Result<Self, StreamError> {
        Self::open_url(&ws_url(host, DEFAULT_PORT), credential, Timeouts::default())
    }

    /// Connect using a loaded configuration.
    pub fn from_config(config: &WebReplConfig) -> Result<Self, StreamError> {
        let timeouts = Timeouts::try_from(&config.timeouts)?;
        Self::open_url(&config.url(), &config.connection.password, timeouts)
    }

    /// Spawn the WebSocket worker for `url`, then run the login exchange
    /// on this thread. Blocks until the stream is ready or has failed.
    pub fn open_url(url: &str, credential: &str, timeouts: Timeouts) -> Result<Self, StreamError> {
        tracing::debug!(%url, "opening webrepl stream");
        let queue = Arc::new(InboundQueue::new());
        let transport = WsTransport::spawn(url, EventSink::new(queue.clone()))
            .map_err(|e| StreamError::handshake(url, e))?;
        Self::establish(url, queue, Box::new(transport), credential, timeouts)
    }

    /// Log in over an already-spawned transport that feeds `queue`.
    ///
    /// # Errors
    ///
    /// `StreamError::Handshake` wrapping the step that failed. The
    /// transport is closed before returning.
    pub fn establish(
        url: impl Into<String>,
        queue: Arc<InboundQueue>,
        transport: Box<dyn Transport>,
        credential: &str,
        timeouts: Timeouts,
    ) -> Result<Self, StreamError> {
        let stream = Self {
            url: url.into(),
            reader: DeadlineReader::new(queue, timeouts.handshake),
            transport,
            closed: AtomicBool::new(false),
        };

        if let Err(e) = handshake::authenticate(&stream.reader, stream.transport.as_ref(), credential, timeouts) {
            tracing::warn!(url = %stream.url, error = %e, "handshake failed");
            stream.close();
            return Err(StreamError::handshake(stream.url.clone(), e));
        }

        tracing::info!(url = %stream.url, "websocket connected");
        Ok(stream)
    }

    /// Read up to `size` bytes. Short (possibly empty) on timeout or once
    /// the connection is gone; never an error.
    ///
    /// A multi-byte UTF-8 character may be split across two reads.
    pub fn read(&self, size: usize) -> Bytes {
        self.reader.read(size)
    }

    /// Read until `marker` appears; returns the bytes before it.
    ///
    /// Buffers without bound until the marker shows up, so only use it
    /// for short markers such as a prompt.
    pub fn read_until(&self, marker: &str) -> Result<Bytes, StreamError> {
        self.reader.wait_for_marker(marker)
    }

    /// Send `data` as one frame. Returns `data.len()`.
    ///
    /// # Errors
    ///
    /// `StreamError::Closed` after `close()` or once the connection died.
    pub fn write(&self, data: &[u8]) -> Result<usize, StreamError> {
        if self.closed.load(Ordering::Acquire) || self.state().is_terminal() {
            return Err(StreamError::Closed);
        }
        self.transport.send(Frame::from_bytes(data))?;
        Ok(data.len())
    }

    /// Buffered bytes not yet read.
    pub fn bytes_waiting(&self) -> usize {
        self.reader.queue().queued_bytes()
    }

    /// Buffered chunks not yet read (one per inbound frame, plus any
    /// pushed-back remainder).
    pub fn chunks_waiting(&self) -> usize {
        self.reader.queue().chunk_count()
    }

    /// Shut the connection down and wake any blocked reader. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let queue = self.reader.queue();
        queue.transition(ConnectionState::Closing);
        self.transport.close();
        queue.transition(ConnectionState::Closed);
        tracing::debug!(url = %self.url, "stream closed");
    }

    /// A device reset always drops the connection.
    pub fn survives_reset(&self) -> bool {
        false
    }

    pub fn state(&self) -> ConnectionState {
        self.reader.queue().connection_state()
    }

    /// First transport error seen, if the connection failed.
    pub fn fault(&self) -> Option<String> {
        self.reader.queue().fault()
    }

    pub fn timeout(&self) -> Duration {
        self.reader.timeout()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.reader.set_timeout(timeout);
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for WebReplStream {
    fn drop(&mut self) {
        self.close();
    }
}

// ── std::io ───────────────────────────────────────────────────────────────────

impl io::Read for &WebReplStream {
    /// `Ok(0)` only once the connection is gone; an empty read on a live
    /// connection is `TimedOut`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let data = WebReplStream::read(*self, buf.len());
        if data.is_empty() {
            if self.state().is_terminal() {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::TimedOut, "webrepl read timed out"));
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Write for &WebReplStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        WebReplStream::write(*self, buf).map_err(into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for WebReplStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

impl io::Write for WebReplStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn into_io(e: StreamError) -> io::Error {
    let kind = match e {
        StreamError::Closed => io::ErrorKind::NotConnected,
        StreamError::Timeout { .. } => io::ErrorKind::TimedOut,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, e)
}
