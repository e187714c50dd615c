//! Link error types.

use std::io;

use tandem_proto::FrameError;
use thiserror::Error;

use crate::lifecycle::ConnectionState;

/// Errors surfaced by the link to its operator.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Command needs a connection and there is none.
    #[error("not connected")]
    NotConnected,

    /// Framing or transport failure on the live session.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Opening the transport failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint we tried to reach.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Operation is not valid in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Current state
        state: ConnectionState,
        /// Operation attempted
        operation: &'static str,
    },
}

impl LinkError {
    /// True if the connection (if any) is still usable after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotConnected | Self::InvalidState { .. } | Self::Connect { .. } => true,
            Self::Frame(err) => err.is_rejected_input(),
        }
    }
}
