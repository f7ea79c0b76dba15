//! WebREPL login exchange.
//!
//!   wait "Password: " → send "<credential>\r" → wait "WebREPL connected"
//!
//! Runs on the caller's thread right after the transport is spawned.
//! Each step gets the (wide) handshake timeout; the steady timeout is
//! installed only once the banner arrives.

use std::time::Duration;

use webrepl_core::protocol::{ACCESS_DENIED, CONNECTED_BANNER, CREDENTIAL_TERMINATOR, PASSWORD_PROMPT};
use webrepl_core::config::{ConfigError, TimeoutConfig};
use webrepl_core::{ConnectionState, StreamError};

use crate::reader::DeadlineReader;
use crate::transport::{Frame, Transport};

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub handshake: Duration,
    pub steady: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(5),
            steady: Duration::from_secs(1),
        }
    }
}

impl TryFrom<&TimeoutConfig> for Timeouts {
    type Error = ConfigError;

    fn try_from(config: &TimeoutConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            handshake: config.handshake()?,
            steady: config.steady()?,
        })
    }
}

/// Drive the login exchange to completion.
///
/// On success the connection is Ready and the reader uses the steady
/// timeout. On failure the reader is left on the handshake timeout and
/// the caller must tear the connection down.
pub fn authenticate(
    reader: &DeadlineReader,
    transport: &dyn Transport,
    credential: &str,
    timeouts: Timeouts,
) -> Result<(), StreamError> {
    reader.set_timeout(timeouts.handshake);
    reader.queue().transition(ConnectionState::Authenticating);

    reader.wait_for_marker(PASSWORD_PROMPT)?;
    tracing::trace!("password prompt received");

    transport.send(Frame::Text(format!("{credential}{CREDENTIAL_TERMINATOR}")))?;

    let (matched, _) = reader.wait_for_any(&[CONNECTED_BANNER, ACCESS_DENIED])?;
    if matched != 0 {
        tracing::warn!("credential rejected");
        return Err(StreamError::AccessDenied);
    }

    reader.queue().transition(ConnectionState::Ready);
    reader.set_timeout(timeouts.steady);
    Ok(())
}
