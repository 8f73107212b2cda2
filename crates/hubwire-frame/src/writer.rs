use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, FrameConfig, RawFrame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &RawFrame) -> Result<()> {
        self.send(frame.discriminator, frame.body.as_ref())
    }

    /// Encode and send a body under a discriminator.
    pub fn send(&mut self, discriminator: u8, body: &[u8]) -> Result<()> {
        if body.len() > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: body.len(),
                max: self.config.max_body_size,
            });
        }

        self.buf.clear();
        encode_frame(discriminator, body, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_BODY};

    #[test]
    fn write_then_decode() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.send(4, b"response").unwrap();

        let mut buf = BytesMut::from(&writer.into_inner()[..]);
        let frame = decode_frame(&mut buf, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(frame.discriminator, 4);
        assert_eq!(frame.body.as_ref(), b"response");
    }

    #[test]
    fn oversized_body_rejected_before_any_write() {
        let config = FrameConfig {
            max_body_size: 8,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::new(), config);

        let result = writer.send(1, b"way past the limit");
        assert!(matches!(result, Err(FrameError::BodyTooLarge { .. })));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn write_frame_matches_send() {
        let mut via_frame = FrameWriter::new(Vec::new());
        via_frame
            .write_frame(&RawFrame::new(6, bytes::Bytes::new()))
            .unwrap();

        let mut via_send = FrameWriter::new(Vec::new());
        via_send.send(6, b"").unwrap();

        assert_eq!(via_frame.into_inner(), via_send.into_inner());
    }
}
