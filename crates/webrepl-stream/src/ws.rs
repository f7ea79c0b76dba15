//! WebSocket transport — one dedicated worker thread per connection.
//!
//! The worker owns a current-thread tokio runtime that drives the
//! socket: it connects, forwards inbound frames to the [`EventSink`] and
//! drains the outbound command channel. The owning thread never touches
//! the runtime; it only pushes commands.

use std::thread::JoinHandle;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use webrepl_core::StreamError;

use crate::transport::{EventSink, Frame, Transport};

enum Command {
    Send(Frame),
    Close,
}

pub struct WsTransport {
    url: String,
    commands: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WsTransport {
    /// Start connecting to `url` in the background. Returns immediately;
    /// the open (or error) event arrives through `sink`.
    pub fn spawn(url: impl Into<String>, sink: EventSink) -> Result<Self, StreamError> {
        let url = url.into();
        let (commands, rx) = mpsc::unbounded_channel();
        let worker_url = url.clone();
        let worker = std::thread::Builder::new()
            .name("webrepl-ws".into())
            .spawn(move || run_worker(&worker_url, &sink, rx))
            .map_err(|e| StreamError::Connection(format!("failed to spawn transport worker: {e}")))?;

        Ok(Self {
            url,
            commands,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WsTransport {
    fn send(&self, frame: Frame) -> Result<(), StreamError> {
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| StreamError::Closed)
    }

    fn close(&self) {
        // Fails only if the worker already exited.
        let _ = self.commands.send(Command::Close);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!(url = %self.url, "transport worker panicked");
            }
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(url: &str, sink: &EventSink, commands: mpsc::UnboundedReceiver<Command>) {
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(event_loop(url, sink, commands)),
        Err(e) => sink.on_error(&e),
    }
    sink.on_close();
}

async fn event_loop(url: &str, sink: &EventSink, mut commands: mpsc::UnboundedReceiver<Command>) {
    tracing::debug!(%url, "connecting");

    // Frames queued before the socket is up are flushed right after open.
    let mut pending = Vec::new();
    let connect = tokio_tungstenite::connect_async(url);
    tokio::pin!(connect);

    let ws = loop {
        tokio::select! {
            res = &mut connect => match res {
                Ok((ws, _response)) => break ws,
                Err(e) => {
                    sink.on_error(&e);
                    return;
                }
            },
            cmd = commands.recv() => match cmd {
                Some(Command::Send(frame)) => pending.push(frame),
                Some(Command::Close) | None => {
                    tracing::debug!(%url, "closed before connect completed");
                    return;
                }
            },
        }
    };

    sink.on_open();
    let (mut write, mut read) = ws.split();

    for frame in pending {
        if let Err(e) = write.send(into_message(frame)).await {
            sink.on_error(&e);
            return;
        }
    }

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Send(frame)) => {
                    tracing::trace!(len = frame.len(), "sending frame");
                    if let Err(e) = write.send(into_message(frame)).await {
                        sink.on_error(&e);
                        return;
                    }
                }
                Some(Command::Close) | None => {
                    if let Err(e) = write.close().await {
                        tracing::debug!(error = %e, "websocket close handshake failed");
                    }
                    return;
                }
            },

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => sink.on_message(Bytes::from(text)),
                Some(Ok(Message::Binary(data))) => sink.on_message(Bytes::from(data)),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "server sent close");
                    return;
                }
                // Ping/pong are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    sink.on_error(&e);
                    return;
                }
                None => return,
            },
        }
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data.to_vec()),
    }
}
