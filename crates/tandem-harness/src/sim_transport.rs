//! Turmoil simulated TCP.
//!
//! Only usable inside a running `turmoil::Sim`: host names resolve through the
//! simulation, and time, latency and loss are under its control.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tandem_core::{Connector, Endpoint};
use turmoil::net::{TcpListener, TcpStream};

/// Connector that dials simulated hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimConnector;

#[async_trait]
impl Connector for SimConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        TcpStream::connect(endpoint.to_string()).await
    }
}

/// Listener on a simulated host.
pub struct SimListener {
    inner: TcpListener,
}

impl SimListener {
    /// Bind to `addr` on the current simulated host, e.g. `"0.0.0.0:7000"`.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        Ok(Self { inner })
    }

    /// Accept one connection, labelled with the peer's address.
    pub async fn accept(&self) -> io::Result<(TcpStream, String)> {
        let (stream, addr) = self.inner.accept().await?;
        tracing::debug!(%addr, "simulated connection accepted");
        Ok((stream, addr.to_string()))
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
