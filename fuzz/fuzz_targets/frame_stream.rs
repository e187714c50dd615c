//! Fuzz target: a stream of frames built from arbitrary messages.
//!
//! Encoding a sequence of non-empty payloads back to back and reading them
//! with the frame reader must yield the same payloads in order.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tandem_proto::{read_frame, Frame, FrameError};

fuzz_target!(|payloads: Vec<Vec<u8>>| {
    let frames: Vec<Frame> = payloads.into_iter().filter_map(|p| Frame::bounded(p).ok()).collect();

    let mut wire = BytesMut::new();
    for frame in &frames {
        frame.encode(&mut wire);
    }

    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };

    runtime.block_on(async {
        let mut reader = &wire[..];
        for expected in &frames {
            let frame = read_frame(&mut reader).await.expect("well-formed frame");
            assert_eq!(frame.payload(), expected.payload());
        }
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::ConnectionClosed)));
    });
});
