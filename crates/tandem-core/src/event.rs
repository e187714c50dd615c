//! Events published to the presentation layer.

use tandem_proto::Message;
use tokio::sync::mpsc;

use crate::lifecycle::ConnectionState;

/// Receiving end of the event feed.
///
/// Events arrive in the order they happened. Messages from the receive loop
/// and the foreground share one channel, so a consumer never mutates display
/// state from two tasks.
pub type LinkEvents = mpsc::UnboundedReceiver<LinkEvent>;

/// Sending end of the event feed.
pub(crate) type EventSink = mpsc::UnboundedSender<LinkEvent>;

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connection state changed.
    StateChanged(ConnectionState),

    /// A message was sent (`is_local`) or received.
    Message(Message),

    /// Opening a transport failed.
    ConnectFailed {
        /// Endpoint we tried to reach.
        endpoint: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A live connection ended without the operator asking.
    ConnectionLost {
        /// Human-readable cause.
        reason: String,
    },
}
