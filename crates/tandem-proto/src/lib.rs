//! Wire format for the Tandem text link.
//!
//! A frame is a 4-byte little-endian length prefix followed by exactly that
//! many bytes of UTF-8 text. There is no version byte, no opcode and no
//! checksum: the transport is a reliable ordered byte stream, so the only job
//! of the framing layer is to recover message boundaries.
//!
//! # Security
//!
//! The length prefix is validated before any payload is buffered. A frame
//! longer than [`MAX_FRAME_BYTES`] or of length zero is rejected without
//! reading past the header, so a corrupted or hostile peer cannot make us
//! allocate an arbitrary buffer.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod frame;
pub mod message;

pub use errors::{FrameError, Result};
pub use frame::{Frame, LENGTH_PREFIX_SIZE, MAX_FRAME_BYTES, encode, read_frame, write_frame};
pub use message::Message;
