//! Transport abstraction.
//!
//! The link only needs a reliable, ordered, bidirectional byte stream. The
//! [`Connector`] trait opens one; production uses [`TcpConnector`], tests use
//! in-memory pipes or the turmoil simulated network.

use std::{fmt, io, str::FromStr, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

/// Remote endpoint, `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Failure to parse an [`Endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    /// No `:port` suffix.
    #[error("missing port in {0:?} (expected host:port)")]
    MissingPort(String),
    /// Empty host part.
    #[error("missing host in {0:?} (expected host:port)")]
    MissingHost(String),
    /// Port is not a number in 1..=65535.
    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((host, port)) = s.rsplit_once(':') else {
            return Err(EndpointParseError::MissingPort(s.to_string()));
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(EndpointParseError::MissingHost(s.to_string()));
        }

        match port.parse::<u16>() {
            Ok(port) if port != 0 => Ok(Self::new(host, port)),
            _ => Err(EndpointParseError::InvalidPort(port.to_string())),
        }
    }
}

/// Opens byte-stream transports to remote endpoints.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `endpoint`, waiting for the handshake to complete.
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Stream>;
}

/// TCP connector backed by tokio.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    nodelay: bool,
}

impl TcpConnector {
    /// Create a connector.
    pub fn new(connect_timeout: Duration, nodelay: bool) -> Self {
        Self { connect_timeout, nodelay }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), true)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let addr = (endpoint.host.as_str(), endpoint.port);
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", self.connect_timeout),
                )
            })??;

        stream.set_nodelay(self.nodelay)?;
        Ok(stream)
    }
}
