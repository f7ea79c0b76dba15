//! Reads and writes over an authenticated stream.

use std::io::{BufRead, BufReader, Write};
use std::thread::sleep;
use std::time::Duration;

use webrepl_stream::WebReplStream;

use crate::infra::{Behaviour, FakeWebRepl};
use crate::{test_timeouts, PASSWORD};

fn logged_in(server: &FakeWebRepl) -> WebReplStream {
    let stream = WebReplStream::open_url(&server.url(), PASSWORD, test_timeouts()).expect("login should succeed");
    stream.read_until(">>> ").expect("initial prompt");
    stream
}

#[test]
fn line_round_trip() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Repl).expect("server should start");
    let stream = logged_in(&server);

    assert_eq!(stream.write(b"1+1\r").unwrap(), 4);
    assert_eq!(stream.read_until(">>> ").unwrap(), "1+1\r\n");

    assert_eq!(stream.write(b"x = 'caf\xc3\xa9'\r").unwrap(), 12);
    assert_eq!(stream.read_until(">>> ").unwrap(), "x = 'café'\r\n");
}

#[test]
fn sized_reads_span_frames() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Repl).expect("server should start");
    let stream = logged_in(&server);

    stream.write(b"abc\r").unwrap();
    stream.write(b"def\r").unwrap();
    sleep(Duration::from_millis(200));

    // "abc\r\n>>> " + "def\r\n>>> "
    assert_eq!(stream.bytes_waiting(), 18);
    assert_eq!(stream.chunks_waiting(), 2);
    assert_eq!(stream.read(12), "abc\r\n>>> def");
    assert_eq!(stream.bytes_waiting(), 6);
    assert_eq!(stream.read(100), "\r\n>>> ");
}

#[test]
fn binary_frames_pass_through() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Repl).expect("server should start");
    let stream = logged_in(&server);

    let payload = [0x57, 0x41, 0x00, 0xff, 0xfe];
    stream.write(&payload).unwrap();
    assert_eq!(stream.read(payload.len()), &payload[..]);
}

#[test]
fn std_io_adapters_work() {
    let server = FakeWebRepl::start(PASSWORD, Behaviour::Repl).expect("server should start");
    let stream = logged_in(&server);

    (&stream).write_all(b"print('hi')\r").unwrap();
    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line).unwrap();
    assert_eq!(line, "print('hi')\r\n");
}
