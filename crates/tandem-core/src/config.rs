//! Link configuration.

use std::time::Duration;

/// Link configuration
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Author name attached to locally typed messages
    pub username: String,
    /// Upper bound on opening a transport
    pub connect_timeout: Duration,
    /// Disable Nagle's algorithm on TCP transports
    pub nodelay: bool,
    /// How long teardown waits for the receive loop before aborting it
    pub teardown_grace: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            username: "me".to_string(),
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
            teardown_grace: Duration::from_secs(1),
        }
    }
}

impl LinkConfig {
    /// Default configuration with the given user name.
    pub fn with_username(username: impl Into<String>) -> Self {
        Self { username: username.into(), ..Self::default() }
    }
}
