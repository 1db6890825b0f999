//! Runtime configuration for the host server.

use std::net::SocketAddr;

/// Settings the server needs once the CLI and config file have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Shared secret the remote must present as `?token=`.
    ///
    /// `None` disables the check; any remote on the network may connect.
    pub auth_token: Option<String>,

    /// Flips both scroll axes.
    pub invert_scroll: bool,
}

impl HostConfig {
    /// Returns `true` if `presented` satisfies the configured token.
    ///
    /// With no token configured every request passes.
    pub fn token_matches(&self, presented: Option<&str>) -> bool {
        match &self.auth_token {
            None => true,
            Some(expected) => presented == Some(expected.as_str()),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            auth_token: None,
            invert_scroll: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_all_interfaces_on_port_3000() {
        let config = HostConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_no_token_accepts_any_request() {
        let config = HostConfig::default();
        assert!(config.token_matches(None));
        assert!(config.token_matches(Some("anything")));
    }

    #[test]
    fn test_configured_token_requires_exact_match() {
        // Arrange
        let config = HostConfig { auth_token: Some("s3cret".into()), ..HostConfig::default() };

        // Act / Assert
        assert!(config.token_matches(Some("s3cret")));
        assert!(!config.token_matches(Some("S3CRET")));
        assert!(!config.token_matches(None));
    }
}
