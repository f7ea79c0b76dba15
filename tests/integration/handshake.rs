//! Login exchange against a live WebSocket server.

use std::time::{Duration, Instant};

use webrepl_core::{ConnectionState, StreamError};
use webrepl_stream::handshake::Timeouts;
use webrepl_stream::WebReplStream;

use crate::infra::{Behaviour, FakeWebRepl};
use crate::{test_timeouts, PASSWORD};

#[test]
fn login_succeeds_and_narrows_timeout() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Repl).expect("server should start");

    let stream = WebReplStream::open_url(&server.url(), PASSWORD, test_timeouts()).expect("login should succeed");

    assert_eq!(stream.state(), ConnectionState::Ready);
    assert_eq!(stream.timeout(), Duration::from_millis(300));
    assert_eq!(stream.url(), server.url());
    assert_eq!(stream.read_until(">>> ").unwrap(), "\r\n");
    stream.close();
}

#[test]
fn wrong_password_fails_construction() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Repl).expect("server should start");

    let start = Instant::now();
    let err = WebReplStream::open_url(&server.url(), "letmein", test_timeouts())
        .err()
        .expect("wrong password must not produce a stream");

    match err {
        StreamError::Handshake { source, .. } => assert!(matches!(*source, StreamError::AccessDenied)),
        other => panic!("unexpected error: {other}"),
    }
    // Denial is recognised without waiting out the handshake timeout.
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn mute_server_times_out() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Mute).expect("server should start");
    let timeouts = Timeouts {
        handshake: Duration::from_millis(300),
        steady: Duration::from_millis(300),
    };

    let start = Instant::now();
    let err = WebReplStream::open_url(&server.url(), PASSWORD, timeouts)
        .err()
        .expect("no prompt must not produce a stream");

    assert!(err.is_timeout(), "expected timeout, got {err}");
    assert!(err.to_string().contains(&server.url()));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(290));
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
}

#[test]
fn refused_connection_fails_fast() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let timeouts = Timeouts {
        handshake: Duration::from_secs(5),
        steady: Duration::from_secs(1),
    };

    let start = Instant::now();
    let err = WebReplStream::open_url(&format!("ws://127.0.0.1:{port}"), PASSWORD, timeouts)
        .err()
        .expect("nothing listening must not produce a stream");

    match err {
        StreamError::Handshake { source, .. } => assert!(
            matches!(*source, StreamError::Connection(_) | StreamError::Closed),
            "unexpected cause: {source}"
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert!(start.elapsed() < Duration::from_secs(3));
}
