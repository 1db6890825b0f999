//! WebSocket server: accept loop, handshake checks and per-session tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Vetting each upgrade request during the handshake:
//!    - the path must be `/ws` (404 otherwise),
//!    - the `token` query parameter must match when a token is configured
//!      (401 otherwise),
//!    - no other session may be active (409 otherwise).
//! 3. Running two tasks per session:
//!    - **Reader**: decodes text frames, answers `ping` immediately with
//!      `pong`, and queues every other message for the worker.
//!    - **Dispatch worker**: hands queued messages to the
//!      [`InputDispatcher`] one at a time on the blocking pool, awaiting each
//!      before starting the next, so chord press/release phases never
//!      interleave.
//! 4. Ending a session that has sent nothing for [`SESSION_IDLE_TIMEOUT`],
//!    so a remote that vanished without a close cannot hold the slot.
//! 5. Discarding input still queued when the session ends, then releasing
//!    any pointer button the remote left pressed.
//! 6. Stopping the accept loop when the `running` flag is cleared.

use std::collections::HashSet;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{Sink, SinkExt, StreamExt};
use rein_core::{decode_client_frame, encode_frame, ClientMessage, MouseButton, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::InputDispatcher;
use crate::domain::HostConfig;

/// The only path that accepts WebSocket upgrades.
pub const WS_PATH: &str = "/ws";

/// Queue depth between the reader and the dispatch worker.
const DISPATCH_QUEUE: usize = 256;

/// Silence after which a session is considered dead. The remote pings
/// every 3 s, so this spans about three missed heartbeats.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on writing one reply to a stalled socket.
const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

// ── Handshake checks ──────────────────────────────────────────────────────────

/// Why an upgrade request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    Unauthorized,
    Busy,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::NotFound => StatusCode::NOT_FOUND,
            Rejection::Unauthorized => StatusCode::UNAUTHORIZED,
            Rejection::Busy => StatusCode::CONFLICT,
        }
    }

    fn into_response(self) -> ErrorResponse {
        let status = self.status();
        let mut response =
            ErrorResponse::new(Some(status.canonical_reason().unwrap_or("rejected").to_string()));
        *response.status_mut() = status;
        response
    }
}

/// Checks the path and token of an upgrade request.
///
/// The single-session check is separate because it has a side effect.
pub fn check_request(request: &Request, config: &HostConfig) -> Result<(), Rejection> {
    if request.uri().path() != WS_PATH {
        return Err(Rejection::NotFound);
    }

    let token = request.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
    });

    if config.token_matches(token.as_deref()) {
        Ok(())
    } else {
        Err(Rejection::Unauthorized)
    }
}

/// Holds the host's single session slot until dropped.
#[derive(Debug)]
struct SessionSlot {
    active: Arc<AtomicBool>,
}

impl SessionSlot {
    fn acquire(active: &Arc<AtomicBool>) -> Option<Self> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { active: Arc::clone(active) })
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// A bound host server, ready to [`run`](HostServer::run).
pub struct HostServer {
    listener: TcpListener,
    config: Arc<HostConfig>,
    dispatcher: Arc<InputDispatcher>,
    session_active: Arc<AtomicBool>,
    idle_timeout: Duration,
}

impl HostServer {
    /// Binds the listener on `config.bind_addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is in use or cannot be bound.
    pub async fn bind(config: HostConfig, dispatcher: InputDispatcher) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

        Ok(Self {
            listener,
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            session_active: Arc::new(AtomicBool::new(false)),
            idle_timeout: SESSION_IDLE_TIMEOUT,
        })
    }

    /// Overrides [`SESSION_IDLE_TIMEOUT`].
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Returns the bound address; useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until `running` is set to `false`.
    ///
    /// Sessions already in progress are left to finish on their own tasks.
    ///
    /// # Errors
    ///
    /// Currently never fails after a successful bind; accept errors are
    /// logged and the loop continues.
    pub async fn run(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        info!(
            "listening on ws://{}{WS_PATH} (auth {})",
            self.local_addr().unwrap_or(self.config.bind_addr),
            if self.config.auth_token.is_some() { "required" } else { "disabled" }
        );

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // Short timeout so the shutdown flag is polled while idle.
            match timeout(Duration::from_millis(200), self.listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    debug!("new connection from {peer_addr}");
                    let session = SessionContext {
                        config: Arc::clone(&self.config),
                        dispatcher: Arc::clone(&self.dispatcher),
                        active: Arc::clone(&self.session_active),
                        idle_timeout: self.idle_timeout,
                    };
                    tokio::spawn(handle_connection(stream, peer_addr, session));
                }
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        }

        Ok(())
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Shared state each connection task needs.
struct SessionContext {
    config: Arc<HostConfig>,
    dispatcher: Arc<InputDispatcher>,
    active: Arc<AtomicBool>,
    idle_timeout: Duration,
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, session: SessionContext) {
    match run_session(stream, peer_addr, session).await {
        Ok(()) => info!("session with {peer_addr} closed"),
        Err(e) => warn!("session with {peer_addr} ended: {e:#}"),
    }
}

async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    session: SessionContext,
) -> anyhow::Result<()> {
    let SessionContext { config, dispatcher, active, idle_timeout } = session;
    let mut slot: Option<SessionSlot> = None;
    let callback = |request: &Request, response: Response| {
        if let Err(rejection) = check_request(request, &config) {
            warn!("rejecting {peer_addr} {}: {:?}", request.uri().path(), rejection);
            return Err(rejection.into_response());
        }
        match SessionSlot::acquire(&active) {
            Some(acquired) => {
                slot = Some(acquired);
                Ok(response)
            }
            None => {
                warn!("rejecting {peer_addr}: another session is active");
                Err(Rejection::Busy.into_response())
            }
        }
    };

    let ws_stream = accept_hdr_async(stream, callback)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;
    let _slot = slot.context("handshake completed without a session slot")?;

    let session_id = Uuid::new_v4();
    info!("session {session_id} established with {peer_addr}");

    let (ws_tx, mut ws_rx) = ws_stream.split();
    let ws_tx = Arc::new(Mutex::new(ws_tx));
    let (queue_tx, queue_rx) = mpsc::channel::<ClientMessage>(DISPATCH_QUEUE);
    let open = Arc::new(AtomicBool::new(true));

    let worker = tokio::spawn(dispatch_worker(
        session_id,
        queue_rx,
        Arc::clone(&open),
        Arc::clone(&dispatcher),
        Arc::clone(&ws_tx),
    ));

    // ── Reader ────────────────────────────────────────────────────────────────
    loop {
        let frame = match timeout(idle_timeout, ws_rx.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(WsError::ConnectionClosed | WsError::Protocol(_)))) | Ok(None) => {
                debug!("session {session_id}: stream closed");
                break;
            }
            Err(_) => {
                warn!("session {session_id}: nothing received for {idle_timeout:?}; ending session");
                break;
            }
            Ok(Some(Err(e))) => {
                warn!("session {session_id}: WebSocket error: {e}");
                break;
            }
        };

        match frame {
            WsMessage::Text(text) => {
                let msg = match decode_client_frame(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        debug!("session {session_id}: dropping frame: {e}");
                        continue;
                    }
                };
                if let ClientMessage::Ping { timestamp } = msg {
                    send_reply(&ws_tx, &ServerMessage::Pong { timestamp }, session_id).await;
                    continue;
                }
                debug!("session {session_id}: queued {}", msg.type_name());
                if queue_tx.send(msg).await.is_err() {
                    break;
                }
            }
            WsMessage::Binary(_) => debug!("session {session_id}: binary frame ignored"),
            WsMessage::Close(_) => {
                debug!("session {session_id}: close frame received");
                break;
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }

    // Whatever is still queued is stale once the remote is gone.
    open.store(false, Ordering::Release);
    drop(queue_tx);
    if let Err(e) = worker.await {
        error!("session {session_id}: dispatch worker failed: {e}");
    }
    Ok(())
}

/// Dispatches queued messages strictly in arrival order.
///
/// Once `open` is cleared the rest of the queue is drained without
/// dispatching, and the buttons still held are released.
async fn dispatch_worker<S>(
    session_id: Uuid,
    mut queue: mpsc::Receiver<ClientMessage>,
    open: Arc<AtomicBool>,
    dispatcher: Arc<InputDispatcher>,
    ws_tx: Arc<Mutex<S>>,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
{
    let mut held_buttons: HashSet<MouseButton> = HashSet::new();
    let mut discarded = 0usize;

    while let Some(msg) = queue.recv().await {
        if !open.load(Ordering::Acquire) {
            discarded += 1;
            continue;
        }
        if let ClientMessage::Click { button, press } = msg {
            if press {
                held_buttons.insert(button);
            } else {
                held_buttons.remove(&button);
            }
        }

        let worker_dispatcher = Arc::clone(&dispatcher);
        match tokio::task::spawn_blocking(move || worker_dispatcher.handle(&msg)).await {
            Ok(Some(reply)) => send_reply(&ws_tx, &reply, session_id).await,
            Ok(None) => {}
            Err(e) => error!("session {session_id}: dispatch task panicked: {e}"),
        }
    }

    if discarded > 0 {
        debug!("session {session_id}: discarded {discarded} queued messages after disconnect");
    }

    for button in held_buttons {
        debug!("session {session_id}: releasing {button:?} left pressed");
        let release = ClientMessage::Click { button, press: false };
        let worker_dispatcher = Arc::clone(&dispatcher);
        if let Err(e) = tokio::task::spawn_blocking(move || worker_dispatcher.handle(&release)).await {
            error!("session {session_id}: release task panicked: {e}");
        }
    }
}

async fn send_reply<S>(ws_tx: &Mutex<S>, reply: &ServerMessage, session_id: Uuid)
where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
{
    let frame = match encode_frame(reply) {
        Ok(frame) => frame,
        Err(e) => {
            error!("session {session_id}: failed to encode reply: {e}");
            return;
        }
    };
    let mut sink = ws_tx.lock().await;
    match timeout(REPLY_TIMEOUT, sink.send(WsMessage::Text(frame))).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("session {session_id}: reply not sent: {e}"),
        Err(_) => debug!("session {session_id}: reply timed out"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
