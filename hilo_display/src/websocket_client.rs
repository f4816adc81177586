//! Persistent WebSocket connection to the host.
//!
//! A [`DisplayClient`] owns one background task that connects, sends HELLO,
//! and then keeps two things current: the latest round snapshot and a
//! connected flag. Both are exposed as `tokio::sync::watch` receivers.
//!
//! Commands are best effort. While disconnected they are dropped, and any
//! still queued when a connection ends are discarded before the next one
//! starts.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use hilo::{
    Command, Role, RoundState, WsMessage,
    net::utils::{decode, encode},
};
use tokio::{
    net::TcpStream,
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot, watch,
    },
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::config::{DisplayConfig, ReconnectPolicy};

/// Commands waiting to be written to the socket.
pub const OUTGOING_BUFFER: usize = 16;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Dropped,
    Shutdown,
}

/// Handle to a running display connection.
#[derive(Debug)]
pub struct DisplayClient {
    state: watch::Receiver<Option<RoundState>>,
    connected: watch::Receiver<bool>,
    outgoing: mpsc::Sender<Command>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl DisplayClient {
    /// Start the connection task. Returns immediately; the first connect
    /// happens in the background.
    pub fn start(config: &DisplayConfig) -> Self {
        let (state_tx, state) = watch::channel(None);
        let (connected_tx, connected) = watch::channel(false);
        let (outgoing, outgoing_rx) = mpsc::channel(OUTGOING_BUFFER);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            url: config.ws_url(),
            hello: WsMessage::hello(Role::Display, config.device_id.clone(), Some(config.table_id)),
            reconnect: config.reconnect,
            state_tx,
            connected_tx,
            outgoing_rx,
            shutdown_rx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            state,
            connected,
            outgoing,
            shutdown: Some(shutdown),
            task,
        }
    }

    /// Start and wait for the first successful connect.
    ///
    /// # Errors
    ///
    /// Fails when the connection task gives up before ever connecting, which
    /// only happens with [`ReconnectPolicy::Never`].
    pub async fn connect(config: &DisplayConfig) -> Result<Self> {
        let client = Self::start(config);
        let mut connected = client.connected();
        connected
            .wait_for(|up| *up)
            .await
            .with_context(|| format!("Failed to connect to {}", config.ws_url()))?;
        Ok(client)
    }

    /// Latest snapshot received, if any.
    pub fn state(&self) -> Option<RoundState> {
        self.state.borrow().clone()
    }

    /// Watch every snapshot as it arrives.
    pub fn subscribe(&self) -> watch::Receiver<Option<RoundState>> {
        self.state.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Watch the connected flag.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Queue `cmd` for the host. Returns `false` when the command was
    /// dropped because the client is disconnected or the queue is full.
    pub fn send(&self, cmd: Command) -> bool {
        if !self.is_connected() {
            log::warn!("Dropping {cmd}: not connected");
            return false;
        }
        match self.outgoing.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                log::warn!("Dropping {cmd}: outgoing queue full");
                false
            }
            Err(TrySendError::Closed(cmd)) => {
                log::warn!("Dropping {cmd}: connection task stopped");
                false
            }
        }
    }

    /// Close the connection and wait for the background task to end.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            log::error!("Display connection task failed: {e}");
        }
    }
}

struct Worker {
    url: String,
    hello: WsMessage,
    reconnect: ReconnectPolicy,
    state_tx: watch::Sender<Option<RoundState>>,
    connected_tx: watch::Sender<bool>,
    outgoing_rx: mpsc::Receiver<Command>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl Worker {
    async fn run(mut self) {
        let mut attempt = 0u32;
        loop {
            let connecting = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = &mut self.shutdown_rx => break,
            };

            match connecting {
                Ok((socket, _)) => {
                    log::info!("Connected to {}", self.url);
                    attempt = 0;
                    // Anything queued for the previous connection is stale.
                    while self.outgoing_rx.try_recv().is_ok() {}
                    let end = self.session(socket).await;
                    self.connected_tx.send_replace(false);
                    if end == SessionEnd::Shutdown {
                        break;
                    }
                    log::warn!("Disconnected from {}", self.url);
                }
                Err(e) => log::warn!("Failed to connect to {}: {e}", self.url),
            }

            let Some(delay) = self.reconnect.delay(attempt) else {
                log::info!("Not reconnecting to {}", self.url);
                break;
            };
            attempt = attempt.saturating_add(1);
            log::debug!("Reconnecting in {}ms", delay.as_millis());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut self.shutdown_rx => break,
            }
        }
        self.connected_tx.send_replace(false);
    }

    async fn session(&mut self, socket: Socket) -> SessionEnd {
        let (mut write, mut read) = socket.split();

        let hello = match encode(&self.hello) {
            Ok(hello) => hello,
            Err(e) => {
                log::error!("Failed to encode hello: {e}");
                return SessionEnd::Dropped;
            }
        };
        if let Err(e) = write.send(Message::Text(hello.into())).await {
            log::warn!("Failed to send hello: {e}");
            return SessionEnd::Dropped;
        }
        self.connected_tx.send_replace(true);

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
                Some(cmd) = self.outgoing_rx.recv() => {
                    let text = match encode(&WsMessage::command(cmd)) {
                        Ok(text) => text,
                        Err(e) => {
                            log::error!("Failed to encode command: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        log::warn!("Failed to send command: {e}");
                        return SessionEnd::Dropped;
                    }
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => handle_text(&self.state_tx, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("WebSocket error: {e}");
                        return SessionEnd::Dropped;
                    }
                },
            }
        }
    }
}

fn handle_text(state_tx: &watch::Sender<Option<RoundState>>, text: &str) {
    match decode(text) {
        Ok(WsMessage::State { state }) => {
            log::debug!("Round {} is {}", state.round_id, state.stage);
            state_tx.send_replace(Some(state));
        }
        Ok(other) => log::debug!("Ignoring {other}"),
        Err(e) => log::warn!("Dropping malformed frame: {e}"),
    }
}
