//! Fuzz target: arbitrary bytes through the frame reader.
//!
//! The reader must never panic, never allocate for a length it rejects, and
//! any frame it returns must re-encode to exactly the bytes it consumed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tandem_proto::{read_frame, FrameError, LENGTH_PREFIX_SIZE, MAX_FRAME_BYTES};

fuzz_target!(|data: &[u8]| {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };

    runtime.block_on(async {
        let mut reader = data;
        match read_frame(&mut reader).await {
            Ok(frame) => {
                let consumed = data.len() - reader.len();
                assert_eq!(frame.encoded_len(), consumed);
                assert_eq!(&frame.to_bytes()[..], &data[..consumed]);
                assert!(frame.payload_len() >= 1 && frame.payload_len() <= MAX_FRAME_BYTES);
            },
            Err(FrameError::InvalidFrameLength { length }) => {
                // Rejected from the prefix alone.
                assert!(length == 0 || length > MAX_FRAME_BYTES);
                assert_eq!(data.len() - reader.len(), LENGTH_PREFIX_SIZE);
            },
            Err(FrameError::ConnectionClosed) => {
                // Short input: ran out mid-prefix or mid-payload.
            },
            Err(err) => panic!("unexpected error from in-memory read: {err}"),
        }
    });
});
