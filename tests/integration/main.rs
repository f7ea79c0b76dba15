//! WebREPL stream integration tests.
//!
//! Every test starts its own in-process WebREPL server on 127.0.0.1
//! with an OS-assigned port, so tests can run in parallel:
//!
//!   cargo test --test integration
//!
//! The server speaks the real login exchange over real WebSocket
//! frames and then behaves like a line-echoing REPL.

mod handshake;
mod infra;
mod io;

use std::time::Duration;

use webrepl_stream::handshake::Timeouts;

/// Short timeouts so failing tests fail fast.
pub fn test_timeouts() -> Timeouts {
    Timeouts {
        handshake: Duration::from_secs(2),
        steady: Duration::from_millis(300),
    }
}

pub const PASSWORD: &str = "secret";
