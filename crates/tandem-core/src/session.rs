//! Connection session.
//!
//! A session owns one live transport. Opening it splits the stream in two:
//!
//! - [`Session`]: the write side, kept by the controller. Sends frames and
//!   closes the connection.
//! - [`SessionReader`]: the read side, moved into the receive loop. Decodes
//!   frames into messages.
//!
//! The two halves share a close signal. Closing raises it, and any
//! `receive_one` pending on the other half returns
//! [`FrameError::ConnectionClosed`] immediately instead of waiting for the
//! next frame: the signal races the in-flight read, which is dropped
//! together with whatever bytes it had consumed. A reader is never used
//! again after that, so the lost partial frame does not matter.

use tandem_proto::{Frame, FrameError, Message, read_frame, write_frame};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::watch,
};

use crate::error::LinkError;

/// Write side of a live connection.
#[derive(Debug)]
pub struct Session<S> {
    writer: Option<WriteHalf<S>>,
    closed: watch::Sender<bool>,
    peer: String,
    frames_sent: u64,
}

/// Read side of a live connection.
#[derive(Debug)]
pub struct SessionReader<S> {
    reader: ReadHalf<S>,
    closed: watch::Receiver<bool>,
    peer: String,
    frames_received: u64,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap an open transport.
    ///
    /// `peer` labels the remote side; it becomes the author of every message
    /// read from this session.
    pub fn open(stream: S, peer: impl Into<String>) -> (Self, SessionReader<S>) {
        let peer = peer.into();
        let (reader, writer) = tokio::io::split(stream);
        let (closed_tx, closed_rx) = watch::channel(false);

        tracing::debug!(%peer, "session opened");

        let session =
            Self { writer: Some(writer), closed: closed_tx, peer: peer.clone(), frames_sent: 0 };
        let reader = SessionReader { reader, closed: closed_rx, peer, frames_received: 0 };
        (session, reader)
    }

    /// Send `text` as one frame.
    ///
    /// Rejects empty or oversized text before any I/O. Writes the whole frame
    /// or fails; there is no acknowledgment.
    ///
    /// # Errors
    /// - `NotConnected` once the session has been closed
    /// - `Frame(EmptyMessage | PayloadTooLarge)` for unsendable text
    /// - `Frame(ConnectionClosed | Transport)` if the write fails
    pub async fn send(&mut self, text: &str) -> Result<(), LinkError>
    where
        S: Unpin,
    {
        let Some(writer) = self.writer.as_mut() else {
            return Err(LinkError::NotConnected);
        };

        let frame = Frame::from_text(text)?;
        write_frame(writer, &frame).await?;

        self.frames_sent += 1;
        tracing::trace!(peer = %self.peer, len = frame.payload_len(), "frame sent");
        Ok(())
    }

    /// Close the connection. Idempotent.
    ///
    /// Raises the close signal (aborting a pending read on the other half),
    /// shuts the write side down and releases it.
    pub async fn close(&mut self) {
        self.closed.send_replace(true);

        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.shutdown().await {
                tracing::debug!(peer = %self.peer, error = %err, "shutdown after close failed");
            }
            tracing::debug!(peer = %self.peer, frames_sent = self.frames_sent, "session closed");
        }
    }

    /// True until [`Self::close`] is called.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Peer label.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Number of frames written so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

impl<S> SessionReader<S>
where
    S: AsyncRead,
{
    /// Read the next frame and wrap it as a remote message.
    ///
    /// Suspends until a whole frame arrives, the stream fails, or the
    /// session is closed.
    pub async fn receive_one(&mut self) -> Result<Message, FrameError> {
        if self.is_closed() {
            return Err(FrameError::ConnectionClosed);
        }

        let frame = tokio::select! {
            biased;
            // Fires on close and when the session is dropped.
            _ = self.closed.wait_for(|closed| *closed) => {
                return Err(FrameError::ConnectionClosed);
            },
            frame = read_frame(&mut self.reader) => frame?,
        };

        self.frames_received += 1;
        Ok(Message::from_frame(self.peer.clone(), frame))
    }

    /// True once the write side has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.closed.has_changed().is_err()
    }

    /// Peer label.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Number of frames decoded so far.
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, duplex};

    use super::*;

    #[tokio::test]
    async fn send_writes_one_frame() {
        let (ours, mut theirs) = duplex(64);
        let (mut session, _reader) = Session::open(ours, "peer");

        session.send("hello").await.unwrap();

        let mut wire = [0u8; 9];
        theirs.read_exact(&mut wire).await.unwrap();
        assert_eq!(&wire, b"\x05\x00\x00\x00hello");
        assert_eq!(session.frames_sent(), 1);
    }

    #[tokio::test]
    async fn empty_send_is_rejected_before_io() {
        let (ours, mut theirs) = duplex(64);
        let (mut session, _reader) = Session::open(ours, "peer");

        let err = session.send("").await.unwrap_err();
        assert!(matches!(err, LinkError::Frame(FrameError::EmptyMessage)));

        // Nothing reached the wire: closing shows EOF with zero bytes.
        session.close().await;
        let mut buf = Vec::new();
        theirs.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn send_after_close_is_not_connected() {
        let (ours, _theirs) = duplex(64);
        let (mut session, _reader) = Session::open(ours, "peer");

        session.close().await;
        session.close().await;

        assert!(!session.is_open());
        assert!(matches!(session.send("late").await, Err(LinkError::NotConnected)));
    }

    #[tokio::test]
    async fn receive_one_wraps_remote_message() {
        let (ours, mut theirs) = duplex(64);
        let (_session, mut reader) = Session::open(ours, "10.0.0.2:4000");

        theirs.write_all(b"\x02\x00\x00\x00hi").await.unwrap();

        let msg = reader.receive_one().await.unwrap();
        assert_eq!(msg.text(), "hi");
        assert_eq!(msg.author(), "10.0.0.2:4000");
        assert!(!msg.is_local());
        assert_eq!(reader.frames_received(), 1);
    }

    #[tokio::test]
    async fn close_aborts_pending_receive() {
        let (ours, _theirs) = duplex(64);
        let (mut session, mut reader) = Session::open(ours, "peer");

        let pending = tokio::spawn(async move { reader.receive_one().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        session.close().await;

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("receive did not abort")
            .unwrap();
        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn close_aborts_receive_mid_frame() {
        let (ours, mut theirs) = duplex(64);
        let (mut session, mut reader) = Session::open(ours, "peer");

        // Header promises five bytes, only two arrive.
        theirs.write_all(b"\x05\x00\x00\x00he").await.unwrap();
        let pending = tokio::spawn(async move { reader.receive_one().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        session.close().await;

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("receive did not abort")
            .unwrap();
        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn dropping_session_closes_reader() {
        let (ours, _theirs) = duplex(64);
        let (session, mut reader) = Session::open(ours, "peer");

        drop(session);

        assert!(reader.is_closed());
        assert!(matches!(reader.receive_one().await, Err(FrameError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn peer_close_mid_frame_is_connection_closed() {
        let (ours, mut theirs) = duplex(64);
        let (_session, mut reader) = Session::open(ours, "peer");

        theirs.write_all(b"\x05\x00\x00\x00").await.unwrap();
        drop(theirs);

        assert!(matches!(reader.receive_one().await, Err(FrameError::ConnectionClosed)));
    }
}
