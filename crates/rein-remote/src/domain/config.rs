//! Remote connection settings.

use std::time::Duration;

use url::Url;

/// Path the host upgrades WebSocket connections on.
pub const WS_PATH: &str = "/ws";

/// Timer settings for the connection machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionTimings {
    /// Period between heartbeat pings while connected.
    pub heartbeat_interval: Duration,
    /// First reconnect delay, and the value the delay resets to on connect.
    pub reconnect_floor: Duration,
    /// Upper bound of the reconnect delay.
    pub reconnect_ceiling: Duration,
    /// Round trips at or above this are treated as bogus and discarded.
    pub max_rtt_ms: f64,
}

impl Default for ConnectionTimings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(3000),
            reconnect_floor: Duration::from_millis(1000),
            reconnect_ceiling: Duration::from_millis(30_000),
            max_rtt_ms: 60_000.0,
        }
    }
}

/// Where and how the remote connects.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// `host[:port]` of the Rein host.
    pub host: String,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// Token given explicitly for this run (e.g. from a scanned URL).
    pub url_token: Option<String>,
    pub timings: ConnectionTimings,
}

impl RemoteConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            secure: false,
            url_token: None,
            timings: ConnectionTimings::default(),
        }
    }
}

/// Builds `ws(s)://<host>/ws`, appending a percent-encoded `token` query
/// parameter when `token` is present and non-empty.
///
/// # Errors
///
/// Returns the parse error if `host` does not form a valid URL authority.
pub fn endpoint_url(host: &str, secure: bool, token: Option<&str>) -> Result<Url, url::ParseError> {
    let scheme = if secure { "wss" } else { "ws" };
    let mut url = Url::parse(&format!("{scheme}://{host}{WS_PATH}"))?;
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url)
}
