//! In-memory connector.

use std::io;

use async_trait::async_trait;
use tandem_core::{Connector, Endpoint};
use tokio::{
    io::{DuplexStream, duplex},
    sync::mpsc,
};

/// Connector over `tokio::io::duplex` pipes.
///
/// Every successful connect hands the far end of the pipe to the paired
/// [`PeerAcceptor`]. Dropping the acceptor makes further connects fail with
/// `ConnectionRefused`.
#[derive(Debug, Clone)]
pub struct DuplexConnector {
    capacity: usize,
    peers: mpsc::UnboundedSender<(Endpoint, DuplexStream)>,
}

/// Receives the peer ends of connections made through a [`DuplexConnector`].
#[derive(Debug)]
pub struct PeerAcceptor {
    peers: mpsc::UnboundedReceiver<(Endpoint, DuplexStream)>,
}

impl DuplexConnector {
    /// Create a connector whose pipes buffer up to `capacity` bytes each way.
    pub fn new(capacity: usize) -> (Self, PeerAcceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { capacity, peers: tx }, PeerAcceptor { peers: rx })
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<DuplexStream> {
        let (ours, theirs) = duplex(self.capacity);
        self.peers.send((endpoint.clone(), theirs)).map_err(|_| {
            io::Error::new(io::ErrorKind::ConnectionRefused, format!("nobody at {endpoint}"))
        })?;

        tracing::trace!(%endpoint, "duplex connection opened");
        Ok(ours)
    }
}

impl PeerAcceptor {
    /// Wait for the next connection. `None` once every connector is gone.
    pub async fn accept(&mut self) -> Option<(Endpoint, DuplexStream)> {
        self.peers.recv().await
    }

    /// Take a connection that is already waiting.
    pub fn try_accept(&mut self) -> Option<(Endpoint, DuplexStream)> {
        self.peers.try_recv().ok()
    }
}
