//! Test transports and deterministic simulation for the Tandem link.
//!
//! - [`TrickleReader`]: scripted stream that hands out bytes in small chunks
//! - [`DuplexConnector`]: in-memory connector whose peer ends go to a
//!   [`PeerAcceptor`]
//! - [`SimConnector`] / [`SimListener`]: turmoil simulated TCP for
//!   reproducible end-to-end scenarios under latency and faults

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod duplex;
pub mod sim_transport;
pub mod trickle;

pub use duplex::{DuplexConnector, PeerAcceptor};
pub use sim_transport::{SimConnector, SimListener};
pub use trickle::TrickleReader;
