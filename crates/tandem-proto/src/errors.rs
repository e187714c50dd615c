//! Framing error types.

use std::io;

use thiserror::Error;

use crate::frame::MAX_FRAME_BYTES;

/// Result type for framing operations.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors raised while encoding or decoding frames.
///
/// None of these are retried by the codec. A half-read frame cannot be
/// resumed, so everything except [`FrameError::EmptyMessage`] and
/// [`FrameError::PayloadTooLarge`] is terminal for the connection it came
/// from.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Attempted to frame an empty payload. Rejected before any I/O.
    #[error("cannot send an empty message")]
    EmptyMessage,

    /// Payload is larger than a frame can carry.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Largest size accepted.
        max: usize,
    },

    /// Decoded length prefix is zero or above [`MAX_FRAME_BYTES`].
    #[error("invalid frame length {length} (expected 1..={max})", max = MAX_FRAME_BYTES)]
    InvalidFrameLength {
        /// Length read from the wire.
        length: u32,
    },

    /// The peer closed the stream, or we closed it locally while an
    /// operation was pending.
    #[error("connection closed")]
    ConnectionClosed,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(io::Error),
}

impl FrameError {
    /// True if this error is an orderly or abrupt end of the stream rather
    /// than corruption.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// True if the error was raised before touching the transport.
    ///
    /// Such errors leave the connection usable.
    pub fn is_rejected_input(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::PayloadTooLarge { .. })
    }
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WriteZero => Self::ConnectionClosed,
            _ => Self::Transport(err),
        }
    }
}
