//! Connection state machine for the remote side of a Rein session.
//!
//! The machine owns no socket and no timers. The driver feeds it
//! [`ConnectionEvent`]s (with the current wall-clock time where it matters)
//! and executes the [`ConnectionAction`]s it returns, in order.
//!
//! ```text
//!              Activate / ReconnectDue
//! ┌──────────────┐ ────────────────> ┌────────────┐  Opened   ┌───────────┐
//! │ Disconnected │                   │ Connecting │ ────────> │ Connected │
//! └──────────────┘ <──────────────── └────────────┘           └───────────┘
//!        ^               Closed                                     │
//!        └──────────────────────────────────────────────────────────┘
//!                                   Closed
//! ```
//!
//! Every transition into `Disconnected` schedules exactly one reconnect and
//! doubles the delay for the next one, bounded by the ceiling. A successful
//! open resets the delay to the floor. Errors never transition on their own:
//! they ask the driver to close the transport, and the resulting `Closed`
//! event is the single place the session goes down.

use std::time::Duration;

use rein_core::{decode_server_frame, ClientMessage, ServerMessage};
use tracing::debug;

use super::config::ConnectionTimings;

/// Observable state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Start connecting. Ignored unless idle and disconnected.
    Activate,
    /// The transport finished its handshake.
    Opened { now_ms: f64 },
    /// The transport is gone, whoever closed it.
    Closed,
    /// The transport reported an error.
    Errored,
    /// A text frame arrived from the host.
    Frame { text: String, now_ms: f64 },
    /// The heartbeat interval elapsed.
    HeartbeatTick { now_ms: f64 },
    /// The scheduled reconnect delay elapsed.
    ReconnectDue,
    /// Tear the session down for good.
    Dispose,
}

/// Effects the driver must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionAction {
    /// Open a new transport.
    Open,
    /// Close the current transport, if any.
    Close,
    /// Send this message on the current transport.
    Send(ClientMessage),
    ArmHeartbeat(Duration),
    DisarmHeartbeat,
    ScheduleReconnect(Duration),
    CancelReconnect,
    /// Stop turning transport callbacks into events.
    DetachHandlers,
    PublishStatus(ConnectionStatus),
    PublishLatency(Option<f64>),
    PublishClipboard(String),
}

/// Pure session lifecycle: status, backoff, heartbeat and latency.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    timings: ConnectionTimings,
    status: ConnectionStatus,
    reconnect_delay: Duration,
    latency: Option<f64>,
    epoch: u64,
    reconnect_pending: bool,
    disposed: bool,
}

impl ConnectionMachine {
    pub fn new(timings: ConnectionTimings) -> Self {
        Self {
            timings,
            status: ConnectionStatus::Disconnected,
            reconnect_delay: timings.reconnect_floor,
            latency: None,
            epoch: 0,
            reconnect_pending: false,
            disposed: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Delay the next reconnect will wait for.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Last accepted round-trip time in milliseconds.
    #[must_use]
    pub fn latency(&self) -> Option<f64> {
        self.latency
    }

    /// Number of successful opens so far. Identifies the live transport.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Applies `event` and returns the actions to execute, in order.
    pub fn handle(&mut self, event: ConnectionEvent) -> Vec<ConnectionAction> {
        if self.disposed {
            return Vec::new();
        }

        match event {
            ConnectionEvent::Activate => self.on_activate(),
            ConnectionEvent::ReconnectDue => self.on_reconnect_due(),
            ConnectionEvent::Opened { now_ms } => self.on_opened(now_ms),
            ConnectionEvent::Closed => self.on_closed(),
            ConnectionEvent::Errored => self.on_errored(),
            ConnectionEvent::Frame { text, now_ms } => self.on_frame(&text, now_ms),
            ConnectionEvent::HeartbeatTick { now_ms } => self.on_heartbeat(now_ms),
            ConnectionEvent::Dispose => self.on_dispose(),
        }
    }

    fn start_connecting(&mut self) -> Vec<ConnectionAction> {
        self.status = ConnectionStatus::Connecting;
        vec![ConnectionAction::PublishStatus(self.status), ConnectionAction::Open]
    }

    fn on_activate(&mut self) -> Vec<ConnectionAction> {
        if self.status != ConnectionStatus::Disconnected {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(ConnectionAction::CancelReconnect);
        }
        actions.extend(self.start_connecting());
        actions
    }

    fn on_reconnect_due(&mut self) -> Vec<ConnectionAction> {
        if !self.reconnect_pending || self.status != ConnectionStatus::Disconnected {
            return Vec::new();
        }
        self.reconnect_pending = false;
        self.start_connecting()
    }

    fn on_opened(&mut self, now_ms: f64) -> Vec<ConnectionAction> {
        if self.status != ConnectionStatus::Connecting {
            return Vec::new();
        }
        self.status = ConnectionStatus::Connected;
        self.epoch += 1;
        self.reconnect_delay = self.timings.reconnect_floor;
        vec![
            ConnectionAction::PublishStatus(self.status),
            ConnectionAction::Send(ClientMessage::Ping { timestamp: now_ms }),
            ConnectionAction::ArmHeartbeat(self.timings.heartbeat_interval),
        ]
    }

    fn on_closed(&mut self) -> Vec<ConnectionAction> {
        if self.status == ConnectionStatus::Disconnected {
            return Vec::new();
        }
        self.status = ConnectionStatus::Disconnected;
        self.latency = None;
        self.reconnect_pending = true;

        let delay = self.reconnect_delay;
        self.reconnect_delay = (delay * 2).min(self.timings.reconnect_ceiling);

        vec![
            ConnectionAction::DisarmHeartbeat,
            ConnectionAction::PublishStatus(self.status),
            ConnectionAction::PublishLatency(None),
            ConnectionAction::ScheduleReconnect(delay),
        ]
    }

    fn on_errored(&mut self) -> Vec<ConnectionAction> {
        if self.status == ConnectionStatus::Disconnected {
            return Vec::new();
        }
        vec![ConnectionAction::Close]
    }

    fn on_frame(&mut self, text: &str, now_ms: f64) -> Vec<ConnectionAction> {
        if self.status != ConnectionStatus::Connected {
            return Vec::new();
        }
        let msg = match decode_server_frame(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("dropping frame from host: {e}");
                return Vec::new();
            }
        };

        match msg {
            ServerMessage::Pong { timestamp } => match self.round_trip(timestamp, now_ms) {
                Some(rtt) => {
                    self.latency = Some(rtt);
                    vec![ConnectionAction::PublishLatency(Some(rtt))]
                }
                None => {
                    debug!(timestamp, now_ms, "discarding implausible pong");
                    Vec::new()
                }
            },
            ServerMessage::ClipboardContent { text } => vec![ConnectionAction::PublishClipboard(text)],
            ServerMessage::Unknown => Vec::new(),
        }
    }

    fn round_trip(&self, timestamp: f64, now_ms: f64) -> Option<f64> {
        if !timestamp.is_finite() {
            return None;
        }
        let rtt = now_ms - timestamp;
        (rtt.is_finite() && rtt >= 0.0 && rtt < self.timings.max_rtt_ms).then_some(rtt)
    }

    fn on_heartbeat(&mut self, now_ms: f64) -> Vec<ConnectionAction> {
        if self.status != ConnectionStatus::Connected {
            return Vec::new();
        }
        vec![ConnectionAction::Send(ClientMessage::Ping { timestamp: now_ms })]
    }

    fn on_dispose(&mut self) -> Vec<ConnectionAction> {
        self.disposed = true;
        self.reconnect_pending = false;
        self.latency = None;
        let was = self.status;
        self.status = ConnectionStatus::Disconnected;

        let mut actions = vec![
            ConnectionAction::CancelReconnect,
            ConnectionAction::DisarmHeartbeat,
            ConnectionAction::DetachHandlers,
            ConnectionAction::Close,
        ];
        if was != ConnectionStatus::Disconnected {
            actions.push(ConnectionAction::PublishStatus(ConnectionStatus::Disconnected));
            actions.push(ConnectionAction::PublishLatency(None));
        }
        actions
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(ConnectionTimings::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> ConnectionMachine {
        let mut m = ConnectionMachine::default();
        m.handle(ConnectionEvent::Activate);
        m.handle(ConnectionEvent::Opened { now_ms: 1_000.0 });
        m
    }

    fn pong(timestamp: f64, now_ms: f64) -> ConnectionEvent {
        ConnectionEvent::Frame {
            text: format!(r#"{{"type":"pong","timestamp":{timestamp}}}"#),
            now_ms,
        }
    }

    fn scheduled_delay(actions: &[ConnectionAction]) -> Duration {
        actions
            .iter()
            .find_map(|a| match a {
                ConnectionAction::ScheduleReconnect(d) => Some(*d),
                _ => None,
            })
            .unwrap_or_else(|| panic!("expected ScheduleReconnect, got {:?}", actions))
    }

    #[test]
    fn test_new_machine_is_disconnected_with_floor_delay() {
        let m = ConnectionMachine::default();
        assert_eq!(m.status(), ConnectionStatus::Disconnected);
        assert_eq!(m.reconnect_delay(), Duration::from_millis(1000));
        assert_eq!(m.latency(), None);
        assert_eq!(m.epoch(), 0);
    }

    #[test]
    fn test_activate_publishes_connecting_and_opens() {
        // Arrange
        let mut m = ConnectionMachine::default();

        // Act
        let actions = m.handle(ConnectionEvent::Activate);

        // Assert
        assert_eq!(
            actions,
            vec![
                ConnectionAction::PublishStatus(ConnectionStatus::Connecting),
                ConnectionAction::Open,
            ]
        );
        assert_eq!(m.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_activate_is_idempotent_while_connecting_or_connected() {
        let mut m = ConnectionMachine::default();
        m.handle(ConnectionEvent::Activate);
        assert!(m.handle(ConnectionEvent::Activate).is_empty());

        m.handle(ConnectionEvent::Opened { now_ms: 0.0 });
        assert!(m.handle(ConnectionEvent::Activate).is_empty());
    }

    #[test]
    fn test_opened_sends_immediate_ping_and_arms_heartbeat() {
        // Arrange
        let mut m = ConnectionMachine::default();
        m.handle(ConnectionEvent::Activate);

        // Act
        let actions = m.handle(ConnectionEvent::Opened { now_ms: 1_700_000_000_000.0 });

        // Assert
        assert_eq!(
            actions,
            vec![
                ConnectionAction::PublishStatus(ConnectionStatus::Connected),
                ConnectionAction::Send(ClientMessage::Ping { timestamp: 1_700_000_000_000.0 }),
                ConnectionAction::ArmHeartbeat(Duration::from_millis(3000)),
            ]
        );
        assert_eq!(m.epoch(), 1);
    }

    #[test]
    fn test_opened_without_connecting_is_ignored() {
        let mut m = ConnectionMachine::default();
        assert!(m.handle(ConnectionEvent::Opened { now_ms: 0.0 }).is_empty());
        assert_eq!(m.status(), ConnectionStatus::Disconnected);
        assert_eq!(m.epoch(), 0);
    }

    #[test]
    fn test_close_while_connected_schedules_reconnect_and_clears_latency() {
        // Arrange
        let mut m = connected();
        m.handle(pong(1_000.0, 1_040.0));
        assert_eq!(m.latency(), Some(40.0));

        // Act
        let actions = m.handle(ConnectionEvent::Closed);

        // Assert
        assert_eq!(
            actions,
            vec![
                ConnectionAction::DisarmHeartbeat,
                ConnectionAction::PublishStatus(ConnectionStatus::Disconnected),
                ConnectionAction::PublishLatency(None),
                ConnectionAction::ScheduleReconnect(Duration::from_millis(1000)),
            ]
        );
        assert_eq!(m.latency(), None);
        assert_eq!(m.reconnect_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_close_while_disconnected_is_ignored() {
        let mut m = connected();
        m.handle(ConnectionEvent::Closed);

        let actions = m.handle(ConnectionEvent::Closed);

        assert!(actions.is_empty());
        assert_eq!(m.reconnect_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_three_consecutive_closes_back_off_1000_2000_4000() {
        // Arrange
        let mut m = ConnectionMachine::default();
        m.handle(ConnectionEvent::Activate);
        let mut delays = Vec::new();

        // Act: the transport fails to open three times in a row
        for _ in 0..3 {
            let actions = m.handle(ConnectionEvent::Closed);
            delays.push(scheduled_delay(&actions));
            m.handle(ConnectionEvent::ReconnectDue);
        }

        // Assert
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
    }

    #[test]
    fn test_backoff_is_capped_at_ceiling() {
        let mut m = ConnectionMachine::default();
        m.handle(ConnectionEvent::Activate);
        let mut last = Duration::ZERO;

        for _ in 0..10 {
            last = scheduled_delay(&m.handle(ConnectionEvent::Closed));
            m.handle(ConnectionEvent::ReconnectDue);
        }

        assert_eq!(last, Duration::from_millis(30_000));
        assert_eq!(m.reconnect_delay(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_successful_open_resets_backoff_to_floor() {
        let mut m = ConnectionMachine::default();
        m.handle(ConnectionEvent::Activate);
        m.handle(ConnectionEvent::Closed);
        m.handle(ConnectionEvent::ReconnectDue);
        m.handle(ConnectionEvent::Closed);
        m.handle(ConnectionEvent::ReconnectDue);
        assert_eq!(m.reconnect_delay(), Duration::from_millis(4000));

        m.handle(ConnectionEvent::Opened { now_ms: 0.0 });
        let actions = m.handle(ConnectionEvent::Closed);

        assert_eq!(scheduled_delay(&actions), Duration::from_millis(1000));
    }

    #[test]
    fn test_status_sequence_over_a_drop() {
        let mut m = ConnectionMachine::default();
        let mut seen = Vec::new();
        let events = [
            ConnectionEvent::Activate,
            ConnectionEvent::Opened { now_ms: 0.0 },
            ConnectionEvent::Closed,
            ConnectionEvent::ReconnectDue,
            ConnectionEvent::Opened { now_ms: 0.0 },
        ];

        for event in events {
            for action in m.handle(event) {
                if let ConnectionAction::PublishStatus(s) = action {
                    seen.push(s);
                }
            }
        }

        assert_eq!(
            seen,
            vec![
                ConnectionStatus::Connecting,
                ConnectionStatus::Connected,
                ConnectionStatus::Disconnected,
                ConnectionStatus::Connecting,
                ConnectionStatus::Connected,
            ]
        );
        assert_eq!(m.epoch(), 2);
    }

    #[test]
    fn test_error_requests_close_without_transition() {
        let mut m = connected();

        let actions = m.handle(ConnectionEvent::Errored);

        assert_eq!(actions, vec![ConnectionAction::Close]);
        assert_eq!(m.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_error_then_close_goes_down_once() {
        let mut m = connected();
        m.handle(ConnectionEvent::Errored);

        let first = m.handle(ConnectionEvent::Closed);
        let second = m.handle(ConnectionEvent::Closed);

        assert_eq!(scheduled_delay(&first), Duration::from_millis(1000));
        assert!(second.is_empty());
    }

    #[test]
    fn test_error_while_disconnected_is_ignored() {
        let mut m = ConnectionMachine::default();
        assert!(m.handle(ConnectionEvent::Errored).is_empty());
    }

    #[test]
    fn test_reconnect_due_without_pending_reconnect_is_ignored() {
        let mut m = ConnectionMachine::default();
        assert!(m.handle(ConnectionEvent::ReconnectDue).is_empty());
        assert_eq!(m.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_activate_during_backoff_cancels_pending_reconnect() {
        let mut m = connected();
        m.handle(ConnectionEvent::Closed);

        let actions = m.handle(ConnectionEvent::Activate);

        assert_eq!(
            actions,
            vec![
                ConnectionAction::CancelReconnect,
                ConnectionAction::PublishStatus(ConnectionStatus::Connecting),
                ConnectionAction::Open,
            ]
        );
        assert!(m.handle(ConnectionEvent::ReconnectDue).is_empty());
    }

    #[test]
    fn test_heartbeat_pings_only_while_connected() {
        let mut m = ConnectionMachine::default();
        assert!(m.handle(ConnectionEvent::HeartbeatTick { now_ms: 5.0 }).is_empty());

        let mut m = connected();
        let actions = m.handle(ConnectionEvent::HeartbeatTick { now_ms: 4_000.0 });

        assert_eq!(actions, vec![ConnectionAction::Send(ClientMessage::Ping { timestamp: 4_000.0 })]);
    }

    #[test]
    fn test_valid_pong_publishes_latency() {
        let mut m = connected();

        let actions = m.handle(pong(1_000.0, 1_023.5));

        assert_eq!(actions, vec![ConnectionAction::PublishLatency(Some(23.5))]);
        assert_eq!(m.latency(), Some(23.5));
    }

    #[test]
    fn test_pong_from_the_future_is_discarded() {
        let mut m = connected();
        m.handle(pong(1_000.0, 1_010.0));

        let actions = m.handle(pong(2_000.0, 1_500.0));

        assert!(actions.is_empty());
        assert_eq!(m.latency(), Some(10.0));
    }

    #[test]
    fn test_pong_at_or_over_one_minute_is_discarded() {
        let mut m = connected();

        assert!(m.handle(pong(0.0, 60_000.0)).is_empty());
        assert!(m.handle(pong(0.0, 90_000.0)).is_empty());
        assert_eq!(m.latency(), None);

        assert_eq!(
            m.handle(pong(0.0, 59_999.0)),
            vec![ConnectionAction::PublishLatency(Some(59_999.0))]
        );
    }

    #[test]
    fn test_pong_with_null_timestamp_is_dropped() {
        // NaN on the wire is `null`, which does not decode as a pong
        let mut m = connected();
        let frame = ConnectionEvent::Frame {
            text: r#"{"type":"pong","timestamp":null}"#.into(),
            now_ms: 1_000.0,
        };

        assert!(m.handle(frame).is_empty());
        assert_eq!(m.latency(), None);
    }

    #[test]
    fn test_non_finite_rtt_is_discarded() {
        let mut m = connected();
        assert!(m.handle(pong(1_000.0, f64::INFINITY)).is_empty());
        assert_eq!(m.latency(), None);
    }

    #[test]
    fn test_clipboard_content_is_published() {
        let mut m = connected();
        let frame = ConnectionEvent::Frame {
            text: r#"{"type":"clipboard-content","text":"copied on host"}"#.into(),
            now_ms: 0.0,
        };

        let actions = m.handle(frame);

        assert_eq!(actions, vec![ConnectionAction::PublishClipboard("copied on host".into())]);
    }

    #[test]
    fn test_malformed_or_unknown_frames_are_ignored() {
        let mut m = connected();
        for text in ["not json", "{}", r#"{"type":"telemetry","x":1}"#] {
            let actions = m.handle(ConnectionEvent::Frame { text: text.into(), now_ms: 0.0 });
            assert!(actions.is_empty(), "{text} must be ignored");
        }
        assert_eq!(m.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_dispose_tears_down_in_order() {
        // Arrange
        let mut m = connected();

        // Act
        let actions = m.handle(ConnectionEvent::Dispose);

        // Assert
        assert_eq!(
            actions,
            vec![
                ConnectionAction::CancelReconnect,
                ConnectionAction::DisarmHeartbeat,
                ConnectionAction::DetachHandlers,
                ConnectionAction::Close,
                ConnectionAction::PublishStatus(ConnectionStatus::Disconnected),
                ConnectionAction::PublishLatency(None),
            ]
        );
        assert!(m.is_disposed());
    }

    #[test]
    fn test_events_after_dispose_are_ignored() {
        let mut m = connected();
        m.handle(ConnectionEvent::Dispose);

        for event in [
            ConnectionEvent::Closed,
            ConnectionEvent::Activate,
            ConnectionEvent::ReconnectDue,
            ConnectionEvent::HeartbeatTick { now_ms: 0.0 },
            ConnectionEvent::Dispose,
        ] {
            assert!(m.handle(event).is_empty());
        }
        assert_eq!(m.status(), ConnectionStatus::Disconnected);
    }
}
