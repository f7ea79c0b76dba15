//! WebREPL wire constants.
//!
//! The login exchange is fixed and case-sensitive:
//!   1. server sends text containing `Password: `
//!   2. client sends `<credential>\r`
//!   3. server sends text containing `WebREPL connected`
//!      (or `Access denied` if the credential was wrong)

/// TCP port the WebREPL server listens on.
pub const DEFAULT_PORT: u16 = 8266;

/// Prompt the server sends before the credential.
pub const PASSWORD_PROMPT: &str = "Password: ";

/// Banner the server sends once the credential is accepted.
pub const CONNECTED_BANNER: &str = "WebREPL connected";

/// Reply the server sends when the credential is rejected.
pub const ACCESS_DENIED: &str = "Access denied";

/// Terminator appended to the credential.
pub const CREDENTIAL_TERMINATOR: &str = "\r";

/// Build the WebSocket URL for a host and port. IPv6 literals are
/// bracketed.
pub fn ws_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("ws://[{host}]:{port}")
    } else {
        format!("ws://{host}:{port}")
    }
}
