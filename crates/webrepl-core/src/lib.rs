//! webrepl-core — shared types for the WebREPL stream adaptor.
//! Connection state, errors, configuration and protocol constants.
//! No I/O lives here.

pub mod config;
pub mod error;
pub mod protocol;
pub mod state;

pub use config::WebReplConfig;
pub use error::StreamError;
pub use state::ConnectionState;
