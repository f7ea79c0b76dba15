//! webrepl-term — attach the terminal to a device's WebREPL.
//!
//! Usage: webrepl-term [host]
//!
//! The host falls back to `[connection] host` in the config file; the
//! password always comes from config or WEBREPL_CONNECTION__PASSWORD.
//! Lines typed on stdin are sent with a trailing `\r`; everything the
//! device sends is copied to stdout. EOF on stdin closes the session.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use webrepl_core::WebReplConfig;
use webrepl_stream::WebReplStream;

const READ_SIZE: usize = 256;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = WebReplConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = WebReplConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        WebReplConfig::default()
    });

    if let Some(host) = std::env::args().nth(1) {
        config.connection.host = host;
    }
    if config.connection.host.is_empty() {
        bail!(
            "no host given: run `webrepl-term <host>` or set [connection] host in {}",
            WebReplConfig::file_path().display()
        );
    }

    let url = config.url();
    let stream = Arc::new(
        WebReplStream::from_config(&config).with_context(|| format!("failed to connect to {url}"))?,
    );
    tracing::info!(%url, "session started, EOF (Ctrl-D) to quit");

    // Not joined: it may be parked in a blocking stdin read at exit.
    let _input = {
        let stream = stream.clone();
        std::thread::Builder::new()
            .name("stdin".into())
            .spawn(move || forward_stdin(&stream))
            .context("failed to spawn stdin thread")?
    };

    pump_output(&stream)?;
    stream.close();

    if let Some(fault) = stream.fault() {
        bail!("connection to {url} failed: {fault}");
    }
    tracing::info!(%url, "session ended");
    Ok(())
}

fn forward_stdin(stream: &WebReplStream) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if let Err(e) = stream.write(format!("{line}\r").as_bytes()) {
            tracing::warn!(error = %e, "write failed");
            break;
        }
    }
    stream.close();
}

fn pump_output(stream: &WebReplStream) -> Result<()> {
    let mut stdout = io::stdout().lock();
    loop {
        let data = stream.read(READ_SIZE);
        if !data.is_empty() {
            stdout.write_all(&data).context("failed to write to stdout")?;
            stdout.flush().context("failed to flush stdout")?;
            continue;
        }
        if stream.state().is_terminal() {
            return Ok(());
        }
    }
}
