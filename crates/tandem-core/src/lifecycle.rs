//! Connection lifecycle state machine.
//!
//! Decides when a session is created and destroyed, and what the operator is
//! told about it. The state machine does no I/O: each event returns the
//! actions the driver must execute, in order.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Events are method calls (`connect_requested`, `transport_opened`, ...)
//! - Methods return `Result<Vec<LifecycleAction>, LinkError>`
//! - [`crate::Controller`] executes the actions against real sessions
//!
//! # State Machine
//!
//! ```text
//!                 connect                 opened
//! ┌──────────────┐────────>┌────────────┐───────>┌───────────┐
//! │ Disconnected │         │ Connecting │        │ Connected │
//! └──────────────┘<────────└────────────┘        └───────────┘
//!      ▲   ▲   open failed (via Faulted)               │ │
//!      │   └───────────── disconnect / peer closed ────┘ │
//!      └──────────────── fault (via Faulted) ────────────┘
//! ```
//!
//! `Faulted` is never a resting state. It is published so observers can tell
//! a failure from an orderly close, then immediately followed by
//! `Disconnected`; retrying is always possible by requesting a new connect.

use std::fmt;

use crate::{error::LinkError, event::LinkEvent};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session exists.
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// A session and its receive loop are live.
    Connected,
    /// The connection failed; always followed by `Disconnected`.
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Actions returned by the lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Cancel the receive loop and close the live session, if any.
    TearDown,
    /// Wrap the freshly opened transport in a session and start its receive
    /// loop.
    StartSession,
    /// Publish this event to observers.
    Emit(LinkEvent),
}

/// Why a live connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LossCause {
    /// The peer closed the stream.
    Closed,
    /// A protocol or transport error broke the stream.
    Faulted,
}

/// Connection lifecycle state machine.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
}

impl Lifecycle {
    /// Create a lifecycle in `Disconnected`.
    pub fn new() -> Self {
        Self { state: ConnectionState::Disconnected }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Fail with `NotConnected` unless `Connected`.
    pub fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.state == ConnectionState::Connected { Ok(()) } else { Err(LinkError::NotConnected) }
    }

    /// Operator asked to connect.
    ///
    /// On success the caller opens the transport and reports the outcome via
    /// [`Self::transport_opened`] or [`Self::open_failed`]. Connecting while
    /// connected tears the current session down first.
    ///
    /// # Errors
    /// Returns `InvalidState` while a connect is already in progress.
    pub fn connect_requested(&mut self) -> Result<Vec<LifecycleAction>, LinkError> {
        let mut actions = Vec::new();
        match self.state {
            ConnectionState::Disconnected => {},
            ConnectionState::Connected => {
                actions.push(LifecycleAction::TearDown);
                actions.extend(self.transition(ConnectionState::Disconnected));
            },
            state @ (ConnectionState::Connecting | ConnectionState::Faulted) => {
                return Err(LinkError::InvalidState { state, operation: "connect" });
            },
        }

        actions.extend(self.transition(ConnectionState::Connecting));
        Ok(actions)
    }

    /// The transport requested by [`Self::connect_requested`] is open.
    ///
    /// `Connected` is published before the session starts, so no received
    /// message can precede it on the event feed.
    ///
    /// # Errors
    /// Returns `InvalidState` unless `Connecting`.
    pub fn transport_opened(&mut self) -> Result<Vec<LifecycleAction>, LinkError> {
        self.require_state(ConnectionState::Connecting, "attach a transport")?;

        let mut actions: Vec<_> = self.transition(ConnectionState::Connected).into_iter().collect();
        actions.push(LifecycleAction::StartSession);
        Ok(actions)
    }

    /// Opening the transport failed.
    ///
    /// # Errors
    /// Returns `InvalidState` unless `Connecting`.
    pub fn open_failed(
        &mut self,
        endpoint: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<Vec<LifecycleAction>, LinkError> {
        self.require_state(ConnectionState::Connecting, "fail a connect")?;

        let mut actions: Vec<_> = self.transition(ConnectionState::Faulted).into_iter().collect();
        actions.push(LifecycleAction::Emit(LinkEvent::ConnectFailed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }));
        actions.extend(self.transition(ConnectionState::Disconnected));
        Ok(actions)
    }

    /// Operator asked to disconnect. Idempotent when already disconnected.
    ///
    /// # Errors
    /// Returns `InvalidState` while connecting.
    pub fn disconnect_requested(&mut self) -> Result<Vec<LifecycleAction>, LinkError> {
        match self.state {
            ConnectionState::Disconnected => Ok(Vec::new()),
            ConnectionState::Connected => {
                let mut actions = vec![LifecycleAction::TearDown];
                actions.extend(self.transition(ConnectionState::Disconnected));
                Ok(actions)
            },
            state @ (ConnectionState::Connecting | ConnectionState::Faulted) => {
                Err(LinkError::InvalidState { state, operation: "disconnect" })
            },
        }
    }

    /// The live connection ended on its own: the receive loop exited or a
    /// send failed.
    ///
    /// # Errors
    /// Returns `InvalidState` unless `Connected`; the driver treats that as a
    /// stale report from a session that is already gone.
    pub fn connection_lost(
        &mut self,
        cause: &LossCause,
        reason: impl Into<String>,
    ) -> Result<Vec<LifecycleAction>, LinkError> {
        self.require_state(ConnectionState::Connected, "lose a connection")?;

        let mut actions = vec![LifecycleAction::TearDown];
        if *cause == LossCause::Faulted {
            actions.extend(self.transition(ConnectionState::Faulted));
        }
        actions.push(LifecycleAction::Emit(LinkEvent::ConnectionLost { reason: reason.into() }));
        actions.extend(self.transition(ConnectionState::Disconnected));
        Ok(actions)
    }

    /// Process teardown: cancel and close unconditionally.
    pub fn teardown(&mut self) -> Vec<LifecycleAction> {
        let mut actions = vec![LifecycleAction::TearDown];
        actions.extend(self.transition(ConnectionState::Disconnected));
        actions
    }

    fn require_state(
        &self,
        expected: ConnectionState,
        operation: &'static str,
    ) -> Result<(), LinkError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LinkError::InvalidState { state: self.state, operation })
        }
    }

    /// Move to `next`, returning the state-change event if the state changed.
    fn transition(&mut self, next: ConnectionState) -> Option<LifecycleAction> {
        if self.state == next {
            return None;
        }
        tracing::debug!(from = %self.state, to = %next, "connection state transition");
        self.state = next;
        Some(LifecycleAction::Emit(LinkEvent::StateChanged(next)))
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
