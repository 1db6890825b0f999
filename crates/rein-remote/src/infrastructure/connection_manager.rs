//! Connection driver: runs the [`ConnectionMachine`] against a real socket.
//!
//! One tokio task owns the machine, the WebSocket, the heartbeat interval
//! and the reconnect timer. It waits on whichever of those is live, turns
//! what happened into a [`ConnectionEvent`], and executes the returned
//! [`ConnectionAction`]s in order.
//!
//! Callers hold a cloneable [`ConnectionHandle`]:
//!
//! - `send` is fire-and-forget. It drops the message unless the session is
//!   connected, and stamps it with the current connection epoch so the
//!   driver can drop anything issued against a transport that has since
//!   been replaced.
//! - `status`, `latency` and `clipboard` are `watch` channels.
//! - `shutdown` disposes the machine, which detaches the socket handlers
//!   before closing it so the final close never schedules a reconnect.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use rein_core::{encode_frame, ClientMessage, ClipboardAction};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::MessageSink;
use crate::domain::{
    endpoint_url, ConnectionAction, ConnectionEvent, ConnectionMachine, ConnectionStatus, RemoteConfig,
};
use crate::infrastructure::token_store::{resolve_token, TokenStore};

/// Upper bound on the TCP connect plus WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a close handshake may take before the socket is just dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// How long one outbound frame may wait on a stalled socket before the
/// connection is treated as failed.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = Result<WsStream, WsError>> + Send>>;

/// Errors raised while starting the connection manager.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid host endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug)]
enum Command {
    Send { msg: ClientMessage, epoch: u64 },
    Shutdown,
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Cheap, cloneable front end to the connection driver.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    latency: watch::Receiver<Option<f64>>,
    clipboard: watch::Receiver<Option<String>>,
    epoch: Arc<AtomicU64>,
}

impl ConnectionHandle {
    /// Sends `msg` on the live transport. Silently dropped when not connected.
    pub fn send(&self, msg: ClientMessage) {
        if *self.status.borrow() != ConnectionStatus::Connected {
            debug!(kind = msg.type_name(), "not connected; dropping message");
            return;
        }
        let epoch = self.epoch.load(Ordering::Acquire);
        if self.commands.send(Command::Send { msg, epoch }).is_err() {
            debug!("connection driver has stopped; dropping message");
        }
    }

    pub fn send_combo<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(ClientMessage::Combo {
            keys: keys.into_iter().map(Into::into).collect(),
        });
    }

    pub fn send_clipboard(&self, action: ClipboardAction, text: Option<String>) {
        self.send(ClientMessage::Clipboard { action, text });
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Last accepted round-trip time in milliseconds.
    pub fn latency(&self) -> Option<f64> {
        *self.latency.borrow()
    }

    /// Last clipboard text the host sent back.
    pub fn clipboard(&self) -> Option<String> {
        self.clipboard.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub fn subscribe_latency(&self) -> watch::Receiver<Option<f64>> {
        self.latency.clone()
    }

    pub fn subscribe_clipboard(&self) -> watch::Receiver<Option<String>> {
        self.clipboard.clone()
    }

    /// Asks the driver to tear the session down. Does not wait.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl MessageSink for ConnectionHandle {
    fn send(&self, msg: ClientMessage) {
        ConnectionHandle::send(self, msg);
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// Owns the driver task for one logical session.
pub struct ConnectionManager {
    handle: ConnectionHandle,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Resolves the auth token, builds the endpoint and starts connecting.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidEndpoint`] if the host does not form
    /// a valid URL.
    pub fn start(config: RemoteConfig, store: &dyn TokenStore) -> Result<Self, ConnectionError> {
        let token = resolve_token(config.url_token.as_deref(), store);
        let url = endpoint_url(&config.host, config.secure, token.as_deref())?;
        if config.secure {
            install_tls_provider();
        }
        info!("connecting to {}{}", config.host, crate::domain::config::WS_PATH);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (latency_tx, latency_rx) = watch::channel(None);
        let (clipboard_tx, clipboard_rx) = watch::channel(None);
        let epoch = Arc::new(AtomicU64::new(0));

        let driver = Driver {
            machine: ConnectionMachine::new(config.timings),
            url,
            commands: commands_rx,
            status: status_tx,
            latency: latency_tx,
            clipboard: clipboard_tx,
            epoch: Arc::clone(&epoch),
            connecting: None,
            socket: None,
            heartbeat: None,
            reconnect: None,
            attached: true,
        };
        let task = tokio::spawn(driver.run());

        Ok(Self {
            handle: ConnectionHandle {
                commands: commands_tx,
                status: status_rx,
                latency: latency_rx,
                clipboard: clipboard_rx,
                epoch,
            },
            task,
        })
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Tears the session down and waits for the driver to finish.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        if let Err(e) = self.task.await {
            warn!("connection driver ended abnormally: {e}");
        }
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// What woke the driver.
enum Wake {
    Connected(Result<WsStream, WsError>),
    Inbound(Option<Result<WsMessage, WsError>>),
    Heartbeat,
    ReconnectDue,
    Command(Option<Command>),
}

struct Driver {
    machine: ConnectionMachine,
    url: Url,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    latency: watch::Sender<Option<f64>>,
    clipboard: watch::Sender<Option<String>>,
    epoch: Arc<AtomicU64>,
    connecting: Option<ConnectFuture>,
    socket: Option<WsStream>,
    heartbeat: Option<Interval>,
    reconnect: Option<Pin<Box<Sleep>>>,
    attached: bool,
}

impl Driver {
    async fn run(mut self) {
        self.feed(ConnectionEvent::Activate).await;

        while !self.machine.is_disposed() {
            let wake = tokio::select! {
                result = pending_connect(&mut self.connecting) => Wake::Connected(result),
                frame = next_frame(&mut self.socket) => Wake::Inbound(frame),
                () = heartbeat_tick(&mut self.heartbeat) => Wake::Heartbeat,
                () = reconnect_due(&mut self.reconnect) => Wake::ReconnectDue,
                command = self.commands.recv() => Wake::Command(command),
            };
            self.on_wake(wake).await;
        }
        debug!("connection driver stopped");
    }

    async fn on_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Connected(Ok(ws)) => {
                self.socket = Some(ws);
                self.feed(ConnectionEvent::Opened { now_ms: now_ms() }).await;
            }
            Wake::Connected(Err(e)) => {
                warn!("could not connect: {e}");
                self.feed(ConnectionEvent::Errored).await;
            }
            Wake::Inbound(Some(Ok(WsMessage::Text(text)))) => {
                self.feed(ConnectionEvent::Frame { text, now_ms: now_ms() }).await;
            }
            Wake::Inbound(Some(Ok(WsMessage::Close(frame)))) => {
                debug!(?frame, "host closed the connection");
            }
            Wake::Inbound(Some(Ok(_))) => {}
            Wake::Inbound(Some(Err(e))) => {
                debug!("socket error: {e}");
                self.feed(ConnectionEvent::Errored).await;
            }
            Wake::Inbound(None) => {
                self.socket = None;
                self.feed(ConnectionEvent::Closed).await;
            }
            Wake::Heartbeat => self.feed(ConnectionEvent::HeartbeatTick { now_ms: now_ms() }).await,
            Wake::ReconnectDue => self.feed(ConnectionEvent::ReconnectDue).await,
            Wake::Command(Some(Command::Send { msg, epoch })) => {
                if epoch != self.machine.epoch() || self.machine.status() != ConnectionStatus::Connected {
                    debug!(kind = msg.type_name(), "dropping message from a previous connection");
                    return;
                }
                if let Some(event) = self.write(&msg).await {
                    self.feed(event).await;
                }
            }
            Wake::Command(Some(Command::Shutdown)) | Wake::Command(None) => {
                self.feed(ConnectionEvent::Dispose).await;
            }
        }
    }

    /// Runs `event` through the machine, executing actions and any events
    /// they produce in turn.
    async fn feed(&mut self, event: ConnectionEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let actions = self.machine.handle(event);
            self.epoch.store(self.machine.epoch(), Ordering::Release);
            for action in actions {
                if let Some(follow_up) = self.execute(action).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, action: ConnectionAction) -> Option<ConnectionEvent> {
        match action {
            ConnectionAction::Open => {
                let url = self.url.to_string();
                self.connecting = Some(Box::pin(async move {
                    match timeout(CONNECT_TIMEOUT, connect_async(url)).await {
                        Ok(result) => result.map(|(ws, _response)| ws),
                        Err(_) => Err(WsError::Io(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "connect timed out",
                        ))),
                    }
                }));
                None
            }
            ConnectionAction::Close => {
                self.connecting = None;
                if let Some(mut ws) = self.socket.take() {
                    if let Err(_elapsed) = timeout(CLOSE_TIMEOUT, ws.close(None)).await {
                        debug!("close handshake timed out");
                    }
                }
                self.attached.then_some(ConnectionEvent::Closed)
            }
            ConnectionAction::Send(msg) => self.write(&msg).await,
            ConnectionAction::ArmHeartbeat(period) => {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.heartbeat = Some(interval);
                None
            }
            ConnectionAction::DisarmHeartbeat => {
                self.heartbeat = None;
                None
            }
            ConnectionAction::ScheduleReconnect(delay) => {
                info!("reconnecting in {} ms", delay.as_millis());
                self.reconnect = Some(Box::pin(sleep(delay)));
                None
            }
            ConnectionAction::CancelReconnect => {
                self.reconnect = None;
                None
            }
            ConnectionAction::DetachHandlers => {
                self.attached = false;
                None
            }
            ConnectionAction::PublishStatus(status) => {
                info!(?status, "connection status changed");
                self.status.send_replace(status);
                None
            }
            ConnectionAction::PublishLatency(latency) => {
                self.latency.send_replace(latency);
                None
            }
            ConnectionAction::PublishClipboard(text) => {
                debug!(len = text.len(), "clipboard text received from host");
                self.clipboard.send_replace(Some(text));
                None
            }
        }
    }

    /// Writes `msg` to the live socket. A write failure becomes an error
    /// event for the machine.
    async fn write(&mut self, msg: &ClientMessage) -> Option<ConnectionEvent> {
        let ws = self.socket.as_mut()?;
        let frame = match encode_frame(msg) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind = msg.type_name(), "could not encode message: {e}");
                return None;
            }
        };
        match timeout(WRITE_TIMEOUT, ws.send(WsMessage::Text(frame))).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                debug!("send failed: {e}");
                Some(ConnectionEvent::Errored)
            }
            Err(_) => {
                warn!("socket stalled for {WRITE_TIMEOUT:?}; dropping connection");
                Some(ConnectionEvent::Errored)
            }
        }
    }
}

/// Selects rustls' ring backend for `wss://`. A no-op once a provider is set.
fn install_tls_provider() {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("TLS crypto provider already installed");
    }
}

// Each of these pends forever when its resource is absent, so `select!`
// only ever wakes on live ones.

async fn pending_connect(slot: &mut Option<ConnectFuture>) -> Result<WsStream, WsError> {
    let Some(connect) = slot.as_mut() else {
        return std::future::pending().await;
    };
    let result = connect.await;
    *slot = None;
    result
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<WsMessage, WsError>> {
    match socket.as_mut() {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

async fn heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn reconnect_due(reconnect: &mut Option<Pin<Box<Sleep>>>) {
    let Some(delay) = reconnect.as_mut() else {
        return std::future::pending().await;
    };
    delay.as_mut().await;
    *reconnect = None;
}

/// Wall-clock milliseconds since the Unix epoch, the unit ping timestamps use.
fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
