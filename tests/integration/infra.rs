//! Fake WebREPL server.

use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Prompt, check password, then echo every line back with a prompt.
    Repl,
    /// Accept the socket but never say anything.
    Mute,
    /// Log in normally, then hang up after the given delay.
    HangUpAfterLogin(Duration),
}

pub struct FakeWebRepl {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeWebRepl {
    pub fn start(password: &'static str, behaviour: Behaviour) -> Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").context("failed to bind listener")?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        let (shutdown, stop) = oneshot::channel();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build server runtime")?;
        let thread = std::thread::spawn(move || {
            runtime.block_on(async move {
                let listener = match TcpListener::from_std(listener) {
                    Ok(l) => l,
                    Err(e) => {
                        eprintln!("fake webrepl: {e}");
                        return;
                    }
                };
                tokio::select! {
                    _ = stop => {}
                    _ = serve(listener, password, behaviour) => {}
                }
            });
        });

        Ok(Self {
            port,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }
}

impl Drop for FakeWebRepl {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(listener: TcpListener, password: &'static str, behaviour: Behaviour) {
    while let Ok((tcp, _)) = listener.accept().await {
        tokio::spawn(async move {
            if let Err(e) = session(tcp, password, behaviour).await {
                eprintln!("fake webrepl session: {e:#}");
            }
        });
    }
}

async fn session(tcp: TcpStream, password: &'static str, behaviour: Behaviour) -> Result<()> {
    let mut ws = tokio_tungstenite::accept_async(tcp).await?;

    if let Behaviour::Mute = behaviour {
        while ws.next().await.is_some() {}
        return Ok(());
    }

    // Split across frames so the client has to join them.
    ws.send(Message::Text("Pass".into())).await?;
    ws.send(Message::Text("word: ".into())).await?;

    let Some(attempt) = ws.next().await else {
        return Ok(());
    };
    if attempt?.into_text()? != format!("{password}\r") {
        ws.send(Message::Text("\r\nAccess denied\r\n".into())).await?;
        ws.close(None).await?;
        return Ok(());
    }
    ws.send(Message::Text("\r\nWebREPL connected\r\n>>> ".into())).await?;

    if let Behaviour::HangUpAfterLogin(delay) = behaviour {
        tokio::time::sleep(delay).await;
        ws.close(None).await?;
        return Ok(());
    }

    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(line) => ws.send(Message::Text(format!("{line}\n>>> "))).await?,
            Message::Binary(data) => ws.send(Message::Binary(data)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
