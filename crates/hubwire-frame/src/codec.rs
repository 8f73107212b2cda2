use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: discriminator (1) + body length (4) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

/// One complete wire frame: a discriminator byte and its body.
///
/// The discriminator is opaque at this layer; the protocol crate maps it to
/// an envelope kind or to the fallback codec.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Selects how the body is interpreted.
    pub discriminator: u8,
    /// Everything after the length field.
    pub body: Bytes,
}

impl RawFrame {
    /// Create a new frame.
    pub fn new(discriminator: u8, body: impl Into<Bytes>) -> Self {
        Self {
            discriminator,
            body: body.into(),
        }
    }

    /// The total wire size of this frame (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────────┬─────────────┬────────────────┐
/// │ Discriminator (1B) │ Length (4B  │ Body            │
/// │                    │ LE)         │ (Length bytes)  │
/// └────────────────────┴─────────────┴────────────────┘
/// ```
pub fn encode_frame(discriminator: u8, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > u32::MAX as usize {
        return Err(FrameError::BodyTooLarge {
            size: body.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_u8(discriminator);
    dst.put_u32_le(body.len() as u32);
    dst.put_slice(body);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet; the
/// buffer is left untouched so the caller can retry after reading more bytes.
/// On success, consumes exactly the frame's bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_body: usize) -> Result<Option<RawFrame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let discriminator = src[0];
    let body_len = u32::from_le_bytes(src[1..5].try_into().unwrap()) as usize;

    if body_len > max_body {
        return Err(FrameError::BodyTooLarge {
            size: body_len,
            max: max_body,
        });
    }

    let total = HEADER_SIZE + body_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let body = src.split_to(body_len).freeze();

    Ok(Some(RawFrame {
        discriminator,
        body,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_body_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
