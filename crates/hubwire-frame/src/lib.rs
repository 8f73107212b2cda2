//! Length-delimited envelope framing for hubwire.
//!
//! Every wire unit is framed with:
//! - A 1-byte discriminator selecting the envelope kind (or the fallback codec)
//! - A 4-byte little-endian body length
//!
//! Decoding is streaming-safe: a buffer holding less than one complete frame
//! yields "not yet" without consuming a single byte, so callers can feed
//! arbitrarily chunked transport reads and retry from the same offset.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{decode_frame, encode_frame, FrameConfig, RawFrame, DEFAULT_MAX_BODY, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::RawFrameCodec;
