//! `tokio_util::codec` adapter for async transports.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, FrameConfig, RawFrame};
use crate::error::FrameError;

/// Frame codec usable with `tokio_util::codec::Framed`.
#[derive(Debug, Clone, Default)]
pub struct RawFrameCodec {
    config: FrameConfig,
}

impl RawFrameCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }
}

impl Decoder for RawFrameCodec {
    type Item = RawFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, FrameError> {
        decode_frame(src, self.config.max_body_size)
    }
}

impl Encoder<RawFrame> for RawFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: RawFrame, dst: &mut BytesMut) -> Result<(), FrameError> {
        if frame.body.len() > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: frame.body.len(),
                max: self.config.max_body_size,
            });
        }
        encode_frame(frame.discriminator, &frame.body, dst)
    }
}
