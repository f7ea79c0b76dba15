//! webrepl-stream — a serial-port-like byte stream over a WebREPL
//! WebSocket connection.
//!
//! Data flow:
//!   transport worker → [`InboundQueue`] → [`DeadlineReader`] →
//!   handshake (at connect) / [`WebReplStream`] (afterwards)
//!
//! Writes go straight from the stream to the transport.

pub mod handshake;
pub mod queue;
pub mod reader;
pub mod stream;
pub mod transport;
pub mod ws;

pub use queue::InboundQueue;
pub use reader::DeadlineReader;
pub use stream::WebReplStream;
pub use transport::{EventSink, Frame, Transport};
pub use ws::WsTransport;

pub use webrepl_core::{ConnectionState, StreamError};
