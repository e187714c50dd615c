//! Chat messages carried by frames.

use std::{fmt, time::SystemTime};

use crate::frame::Frame;

/// A chat message, either typed locally or decoded from a peer frame.
///
/// Messages are immutable once created. Only the text travels on the wire;
/// the author of a remote message is whatever label the receiving side gives
/// the peer, and the timestamp is the local receive time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    author: String,
    timestamp: SystemTime,
    is_local: bool,
}

impl Message {
    /// Message typed by the local operator.
    pub fn local(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self { text: text.into(), author: author.into(), timestamp: SystemTime::now(), is_local: true }
    }

    /// Message received from the peer.
    pub fn remote(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            timestamp: SystemTime::now(),
            is_local: false,
        }
    }

    /// Decode a received frame into a remote message.
    pub fn from_frame(author: impl Into<String>, frame: Frame) -> Self {
        Self::remote(author, frame.into_text())
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Who wrote it.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// When it was created (local) or received (remote).
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// True for operator input, false for peer messages.
    pub fn is_local(&self) -> bool {
        self.is_local
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.author, self.text)
    }
}
