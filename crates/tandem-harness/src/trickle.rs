//! Scripted stream with bounded reads.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Stream that delivers a fixed script at most `chunk` bytes per read.
///
/// Every other poll returns `Pending` (after waking itself) so readers are
/// forced through their resume path mid-frame. Once the script is drained the
/// stream reports EOF, or stays pending forever when built with
/// [`Self::hold_open`].
///
/// Writes are accepted and discarded, so it can back a full session.
#[derive(Debug)]
pub struct TrickleReader {
    data: Bytes,
    chunk: usize,
    consumed: usize,
    stall: bool,
    hold_open: bool,
}

impl TrickleReader {
    /// Script `data`, delivered `chunk` bytes at a time (at least one).
    pub fn new(data: impl Into<Bytes>, chunk: usize) -> Self {
        Self { data: data.into(), chunk: chunk.max(1), consumed: 0, stall: false, hold_open: false }
    }

    /// Never report EOF; an idle peer instead of a closed one.
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Bytes handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes still to be delivered.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }
}

impl AsyncRead for TrickleReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;

        if this.stall {
            this.stall = false;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        if this.data.is_empty() {
            // Nothing will ever arrive; only an outside signal can end the read.
            return if this.hold_open { Poll::Pending } else { Poll::Ready(Ok(())) };
        }

        let n = this.chunk.min(this.data.len()).min(buf.remaining());
        buf.put_slice(&this.data.split_to(n));
        this.consumed += n;
        this.stall = true;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for TrickleReader {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
