//! Transport binding — the seam between the stream and whatever carries
//! its frames.
//!
//! A transport owns the connection and its event loop. It reports the
//! four connection events through an [`EventSink`] and accepts outbound
//! frames through [`Transport::send`]. It does NOT buffer inbound data,
//! reconnect, or interpret the login exchange.

use std::sync::Arc;

use bytes::Bytes;

use webrepl_core::{ConnectionState, StreamError};

use crate::queue::InboundQueue;

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    /// Text if `data` is valid UTF-8, binary otherwise.
    pub fn from_bytes(data: &[u8]) -> Self {
        match std::str::from_utf8(data) {
            Ok(text) => Frame::Text(text.to_owned()),
            Err(_) => Frame::Binary(Bytes::copy_from_slice(data)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Frame::Text(t) => t.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outbound half of a connection.
pub trait Transport: Send + Sync {
    /// Queue a frame for sending.
    ///
    /// # Errors
    ///
    /// `StreamError::Closed` once the connection has shut down.
    fn send(&self, frame: Frame) -> Result<(), StreamError>;

    /// Begin shutting the connection down and wait for the event loop to
    /// finish. Must be idempotent.
    fn close(&self);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, frame: Frame) -> Result<(), StreamError> {
        (**self).send(frame)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Inbound half: routes transport events into the queue.
///
/// Every event wakes blocked readers so none can wait past connection
/// termination.
#[derive(Debug, Clone)]
pub struct EventSink {
    queue: Arc<InboundQueue>,
}

impl EventSink {
    pub fn new(queue: Arc<InboundQueue>) -> Self {
        Self { queue }
    }

    pub fn on_open(&self) {
        tracing::debug!("transport open");
        self.queue.transition(ConnectionState::Open);
    }

    pub fn on_message(&self, chunk: Bytes) {
        tracing::trace!(len = chunk.len(), "chunk received");
        self.queue.push(chunk);
    }

    pub fn on_error(&self, error: &dyn std::fmt::Display) {
        tracing::error!(error = %error, "transport error");
        self.queue.fail(error.to_string());
    }

    pub fn on_close(&self) {
        tracing::info!("transport closed");
        self.queue.transition(ConnectionState::Closed);
    }
}
