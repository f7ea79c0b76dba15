//! Errors surfaced by the stream adaptor.

use crate::config::ConfigError;

/// Every failure a caller of the stream can observe.
///
/// Short reads are not errors: `read` degrades to fewer bytes when the
/// deadline passes. Only marker waits, the handshake and writes fail.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Transport-level failure: connect refused, socket error, worker died.
    #[error("connection error: {0}")]
    Connection(String),

    /// Deadline elapsed before `marker` showed up in the inbound data.
    #[error("timed out waiting for {marker:?}")]
    Timeout { marker: String },

    /// The server rejected the credential.
    #[error("access denied by remote")]
    AccessDenied,

    /// Login exchange failed; the stream was never handed out.
    #[error("handshake with {url} failed: {source}")]
    Handshake {
        url: String,
        #[source]
        source: Box<StreamError>,
    },

    /// Operation on a stream whose connection is closed or errored.
    #[error("connection is closed")]
    Closed,

    /// A marker wait was asked to wait for nothing.
    #[error("no markers to wait for")]
    NoMarkers,

    /// The configuration could not be turned into connection settings.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl StreamError {
    /// Wrap a failure that happened during the login exchange.
    pub fn handshake(url: impl Into<String>, source: StreamError) -> Self {
        Self::Handshake {
            url: url.into(),
            source: Box::new(source),
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Handshake { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
