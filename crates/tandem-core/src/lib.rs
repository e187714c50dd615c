//! Tandem link core
//!
//! Everything between the frame codec and the operator: the transport seam,
//! the session that owns one live connection, the background task that
//! drains it, and the lifecycle that decides when connections open and close.
//!
//! # Architecture
//!
//! The lifecycle is a pure state machine in [`lifecycle`]. It never touches
//! I/O; each event returns the actions the caller must perform (tear the
//! session down, start a session, publish an event). [`Controller`] is the
//! driver that executes those actions against a real [`Connector`].
//!
//! ```text
//!  operator ──commands──> Controller ──send──> Session ──frames──> transport
//!                            │  ▲                                     │
//!                            │  └──── LoopExit ──── ReceiveLoop <─────┘
//!                            ▼                          │
//!                        LinkEvent feed <──messages─────┘
//! ```
//!
//! # Components
//!
//! - [`transport`]: Connector trait and the TCP implementation
//! - [`session`]: write side, read side and the close signal between them
//! - [`receive_loop`]: background task that turns frames into events
//! - [`lifecycle`]: connection state machine
//! - [`controller`]: executes lifecycle actions
//! - [`event`]: the feed consumed by the presentation layer
//! - [`config`]: link configuration
//! - [`error`]: link error types

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod receive_loop;
pub mod session;
pub mod transport;

pub use config::LinkConfig;
pub use controller::Controller;
pub use error::LinkError;
pub use event::{LinkEvent, LinkEvents};
pub use lifecycle::{ConnectionState, Lifecycle, LifecycleAction, LossCause};
pub use receive_loop::{LoopExit, LoopOutcome, ReceiveLoop};
pub use session::{Session, SessionReader};
pub use transport::{Connector, Endpoint, EndpointParseError, TcpConnector};
