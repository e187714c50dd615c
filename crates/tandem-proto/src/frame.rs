//! Frame encoding and decoding.
//!
//! ```text
//! +----------------------+---------------------------+
//! | length: u32 (LE)     | payload: [u8; length]     |
//! +----------------------+---------------------------+
//! ```
//!
//! Both directions loop over partial I/O: the transport may hand us a single
//! byte per read or accept a single byte per write, and the codec keeps going
//! until the exact count is satisfied or the stream ends.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{FrameError, Result};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload a receiver accepts (10 MiB).
pub const MAX_FRAME_BYTES: u32 = 10 * 1024 * 1024;

/// A single length-prefixed frame.
///
/// Holds a non-empty payload. The length prefix is derived from the payload
/// when encoding and never stored separately, so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap a payload.
    ///
    /// Only checks that the payload is non-empty and representable by the
    /// 32-bit length prefix. Staying under [`MAX_FRAME_BYTES`] is the sender's
    /// job, see [`Frame::bounded`].
    pub fn new(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(FrameError::EmptyMessage);
        }
        if u32::try_from(payload.len()).is_err() {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: u32::MAX as usize,
            });
        }
        Ok(Self { payload })
    }

    /// Wrap a payload a conforming receiver will accept.
    pub fn bounded(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_FRAME_BYTES as usize {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_FRAME_BYTES as usize,
            });
        }
        Self::new(payload)
    }

    /// Frame the UTF-8 bytes of `text`.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::bounded(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Value of the length prefix.
    pub fn payload_len(&self) -> u32 {
        // Checked in `new`.
        self.payload.len() as u32
    }

    /// Total number of bytes on the wire.
    pub fn encoded_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }

    /// Append the wire encoding to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u32_le(self.payload_len());
        dst.put_slice(&self.payload);
    }

    /// Wire encoding as a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Consume the frame, returning its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Interpret the payload as UTF-8.
    ///
    /// Malformed sequences are replaced with U+FFFD rather than rejected;
    /// that is a display concern, not a framing error.
    pub fn into_text(self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Validate a decoded length prefix.
    pub fn check_length(length: u32) -> Result<usize> {
        if length == 0 || length > MAX_FRAME_BYTES {
            return Err(FrameError::InvalidFrameLength { length });
        }
        Ok(length as usize)
    }
}

/// Encode a payload into a length-prefixed frame.
///
/// Fails with [`FrameError::EmptyMessage`] for an empty payload. No upper
/// bound beyond what the prefix can express.
pub fn encode(payload: &[u8]) -> Result<Bytes> {
    Frame::new(Bytes::copy_from_slice(payload)).map(|frame| frame.to_bytes())
}

/// Read exactly one frame.
///
/// The length prefix is validated before the payload buffer is allocated;
/// an out-of-range length fails with [`FrameError::InvalidFrameLength`] and
/// leaves the payload bytes unread. End of stream anywhere inside the frame
/// fails with [`FrameError::ConnectionClosed`].
///
/// Not cancel safe: dropping the future mid-frame loses the bytes consumed so
/// far. Callers that cancel a read must discard the stream afterwards.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    read_full(reader, &mut prefix).await?;

    let length = Frame::check_length(u32::from_le_bytes(prefix))?;

    let mut payload = vec![0u8; length];
    read_full(reader, &mut payload).await?;

    Ok(Frame { payload: Bytes::from(payload) })
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_full(writer, &frame.payload_len().to_le_bytes()).await?;
    write_full(writer, frame.payload()).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        filled += n;
    }
    Ok(())
}

async fn write_full<W>(writer: &mut W, buf: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while written < buf.len() {
        let n = writer.write(&buf[written..]).await?;
        if n == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        written += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };

    use hex_literal::hex;
    use proptest::prelude::*;
    use tokio::io::ReadBuf;

    use super::*;

    /// Hands out at most `chunk` bytes per read and records how much was
    /// consumed.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
        consumed: usize,
    }

    impl<'a> Trickle<'a> {
        fn new(data: &'a [u8], chunk: usize) -> Self {
            Self { data, chunk, consumed: 0 }
        }
    }

    impl AsyncRead for Trickle<'_> {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let data = self.data;
            let remaining = &data[self.consumed..];
            let n = remaining.len().min(self.chunk).min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            self.consumed += n;
            Poll::Ready(Ok(()))
        }
    }

    /// Accepts one byte per write call and counts the calls.
    #[derive(Default)]
    struct ByteSink {
        bytes: Vec<u8>,
        writes: usize,
    }

    impl AsyncWrite for ByteSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes += 1;
            match buf.first() {
                Some(&byte) => {
                    self.bytes.push(byte);
                    Poll::Ready(Ok(1))
                },
                None => Poll::Ready(Ok(0)),
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(future)
    }

    #[test]
    fn hello_wire_bytes() {
        let wire = encode(b"hello").unwrap();
        assert_eq!(&wire[..], hex!("05000000 68656c6c6f"));
    }

    #[test]
    fn hello_decodes_from_wire() {
        let wire = hex!("05000000 68656c6c6f");
        let frame = block_on(read_frame(&mut &wire[..])).unwrap();
        assert_eq!(frame.into_text(), "hello");
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(encode(b""), Err(FrameError::EmptyMessage)));
        assert!(matches!(Frame::from_text(""), Err(FrameError::EmptyMessage)));
    }

    #[test]
    fn bounded_rejects_oversized_payload() {
        let payload = vec![b'x'; MAX_FRAME_BYTES as usize + 1];
        let err = Frame::bounded(payload).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size, .. } if size == MAX_FRAME_BYTES as usize + 1));
    }

    #[test]
    fn encode_has_no_receiver_bound() {
        let payload = vec![b'x'; MAX_FRAME_BYTES as usize + 1];
        let frame = Frame::new(payload).unwrap();
        assert_eq!(frame.payload_len(), MAX_FRAME_BYTES + 1);
    }

    #[test]
    fn largest_frame_round_trips() {
        let payload = vec![b'a'; MAX_FRAME_BYTES as usize];
        let wire = Frame::bounded(payload.clone()).unwrap().to_bytes();
        let frame = block_on(read_frame(&mut &wire[..])).unwrap();
        assert_eq!(frame.payload(), &payload[..]);
    }

    #[test]
    fn zero_length_rejected_without_payload_read() {
        let wire = hex!("00000000 68656c6c6f");
        let mut reader = Trickle::new(&wire, 64);
        let err = block_on(read_frame(&mut reader)).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrameLength { length: 0 }));
        assert_eq!(reader.consumed, LENGTH_PREFIX_SIZE);
    }

    #[test]
    fn oversized_length_rejected_without_payload_read() {
        let mut wire = (MAX_FRAME_BYTES + 1).to_le_bytes().to_vec();
        wire.extend_from_slice(&[0xAB; 32]);
        let mut reader = Trickle::new(&wire, 64);
        let err = block_on(read_frame(&mut reader)).unwrap_err();
        assert!(
            matches!(err, FrameError::InvalidFrameLength { length } if length == MAX_FRAME_BYTES + 1)
        );
        assert_eq!(reader.consumed, LENGTH_PREFIX_SIZE);
    }

    #[test]
    fn max_u32_length_rejected() {
        let wire = hex!("ffffffff");
        let err = block_on(read_frame(&mut &wire[..])).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrameLength { length: u32::MAX }));
    }

    #[test]
    fn eof_inside_prefix_is_connection_closed() {
        let wire = hex!("0500");
        let err = block_on(read_frame(&mut &wire[..])).unwrap_err();
        assert!(err.is_connection_closed());
    }

    #[test]
    fn eof_after_prefix_is_connection_closed() {
        let wire = hex!("05000000");
        let err = block_on(read_frame(&mut &wire[..])).unwrap_err();
        assert!(err.is_connection_closed());
    }

    #[test]
    fn eof_inside_payload_is_connection_closed() {
        let wire = hex!("05000000 6865");
        let err = block_on(read_frame(&mut &wire[..])).unwrap_err();
        assert!(err.is_connection_closed());
    }

    #[test]
    fn consecutive_frames_keep_order() {
        let mut wire = BytesMut::new();
        for text in ["one", "two", "three"] {
            Frame::from_text(text).unwrap().encode(&mut wire);
        }
        let mut reader = &wire[..];
        let decoded: Vec<String> = block_on(async {
            let mut out = Vec::new();
            for _ in 0..3 {
                out.push(read_frame(&mut reader).await.unwrap().into_text());
            }
            out
        });
        assert_eq!(decoded, ["one", "two", "three"]);
        assert!(reader.is_empty());
    }

    #[test]
    fn write_loops_over_partial_writes() {
        let frame = Frame::from_text("hi").unwrap();
        let mut sink = ByteSink::default();
        block_on(write_frame(&mut sink, &frame)).unwrap();
        assert_eq!(sink.bytes, hex!("02000000 6869"));
        assert_eq!(sink.writes, 6);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let frame = Frame::new(vec![b'o', b'k', 0xFF]).unwrap();
        assert_eq!(frame.into_text(), "ok\u{FFFD}");
    }

    proptest! {
        #[test]
        fn text_round_trips(text in "\\PC{1,512}") {
            let wire = Frame::from_text(&text).unwrap().to_bytes();
            let frame = block_on(read_frame(&mut &wire[..])).unwrap();
            prop_assert_eq!(frame.into_text(), text);
        }

        #[test]
        fn round_trips_under_any_chunking(
            text in "\\PC{1,256}",
            chunk in 1usize..8,
        ) {
            let wire = Frame::from_text(&text).unwrap().to_bytes();
            let mut reader = Trickle::new(&wire, chunk);
            let frame = block_on(read_frame(&mut reader)).unwrap();
            prop_assert_eq!(frame.into_text(), text);
            prop_assert_eq!(reader.consumed, wire.len());
        }
    }
}
