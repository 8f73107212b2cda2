//! The top-level envelope codec.
//!
//! Encode path: per-kind metadata + item descriptors, then payload bytes
//! back-to-back, wrapped in one discriminator-tagged, length-delimited frame.
//! Decode path is the mirror, driven by a streaming-safe cursor: nothing is
//! consumed until a full frame is buffered.

use bytes::{Buf, BufMut, BytesMut};
use hubwire_frame::{decode_frame, encode_frame, FrameError, RawFrame, DEFAULT_MAX_BODY};

use crate::descriptor::{ItemDescriptor, SlotOutcome};
use crate::envelope::{Envelope, EnvelopeKind, FALLBACK_DISCRIMINATOR};
use crate::error::{DecodeError, EncodeError};
use crate::fallback::BoxedFallback;
use crate::kinds;
use crate::registry::PayloadRegistry;
use crate::wire::ensure;

/// Protocol name advertised during handshakes.
pub const PROTOCOL_NAME: &str = "hubwire";

/// Major protocol version.
pub const PROTOCOL_VERSION: i32 = 1;

/// Minor version, reserved for forward evolution within the major version.
pub const PROTOCOL_MINOR_VERSION: i32 = 0;

/// Maximum payload slots per envelope (one-byte wire count).
pub const MAX_SLOTS: usize = u8::MAX as usize;

/// Codec configuration.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum frame body size accepted on decode and produced on encode.
    pub max_body_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
        }
    }
}

/// Immutable envelope codec.
///
/// Holds the payload registry and the fallback handle, both fixed at
/// construction; a single instance is safe to share across connections, and
/// every encode/decode call works purely on caller-provided buffers.
#[derive(Debug)]
pub struct EnvelopeCodec {
    registry: PayloadRegistry,
    fallback: BoxedFallback,
    config: CodecConfig,
}

impl EnvelopeCodec {
    /// Create a codec with default configuration.
    pub fn new(registry: PayloadRegistry, fallback: BoxedFallback) -> Self {
        Self::with_config(registry, fallback, CodecConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(
        registry: PayloadRegistry,
        fallback: BoxedFallback,
        config: CodecConfig,
    ) -> Self {
        Self {
            registry,
            fallback,
            config,
        }
    }

    /// The payload registry this codec was built with.
    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    /// Current configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode one envelope as a complete frame appended to `dst`.
    pub fn encode(&self, envelope: &Envelope, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let Some(kind) = envelope.kind() else {
            return Err(EncodeError::NotWireEncodable {
                kind: envelope.kind_name(),
            });
        };

        if self.requires_fallback(envelope) {
            tracing::debug!(
                kind = kind.name(),
                fallback = self.fallback.name(),
                "deferring envelope with unregistered argument types to fallback codec"
            );
            return self.encode_fallback(envelope, dst);
        }

        let slots = kinds::payload_slots(envelope);
        if slots.len() > MAX_SLOTS {
            return Err(EncodeError::TooManySlots(slots.len()));
        }

        let mut descriptors = Vec::with_capacity(slots.len());
        for slot in &slots {
            descriptors.push(ItemDescriptor::describe(slot, &self.registry)?);
        }

        let mut meta = BytesMut::new();
        kinds::encode_meta(envelope, &mut meta);
        meta.put_u8(slots.len() as u8);
        for descriptor in &descriptors {
            descriptor.encode(&mut meta);
        }

        // Declared sizes let us size the body without serializing twice.
        let payload_size: usize = descriptors
            .iter()
            .map(ItemDescriptor::total_payload_size)
            .sum();
        let body_size = 4 + meta.len() + payload_size;
        if body_size > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: body_size,
                max: self.config.max_body_size,
            }
            .into());
        }

        let mut body = BytesMut::with_capacity(body_size);
        body.put_u32_le(meta.len() as u32);
        body.extend_from_slice(&meta);
        for slot in &slots {
            for value in slot.values() {
                value.write_to(&mut body)?;
            }
        }
        debug_assert_eq!(body.len(), body_size, "declared sizes must match emission");

        encode_frame(kind.discriminator(), &body, dst)?;
        Ok(())
    }

    /// Decode the next envelope from a streaming buffer.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold one complete
    /// frame; the buffer is untouched so callers can append more transport
    /// bytes and retry from the same offset. The cursor advances only past
    /// fully decoded frames.
    pub fn decode(&self, src: &mut BytesMut) -> Result<Option<Envelope>, DecodeError> {
        let Some(frame) = decode_frame(src, self.config.max_body_size)? else {
            tracing::trace!(buffered = src.len(), "incomplete frame, awaiting more bytes");
            return Ok(None);
        };
        self.decode_raw(&frame).map(Some)
    }

    /// Decode one already-framed unit.
    pub fn decode_raw(&self, frame: &RawFrame) -> Result<Envelope, DecodeError> {
        if frame.discriminator == FALLBACK_DISCRIMINATOR {
            return Ok(self.fallback.decode(&frame.body)?);
        }

        let kind = EnvelopeKind::from_discriminator(frame.discriminator)
            .ok_or(DecodeError::UnknownDiscriminator(frame.discriminator))?;

        let mut body = frame.body.clone();
        ensure(&body, 4)?;
        let meta_len = body.get_u32_le() as usize;
        if body.remaining() < meta_len {
            return Err(DecodeError::Malformed(format!(
                "metadata length {meta_len} exceeds body ({})",
                body.remaining()
            )));
        }
        let mut meta = body.split_to(meta_len);
        let mut payload = body;

        let envelope = kinds::decode_meta(kind, &mut meta)?;

        ensure(&meta, 1)?;
        let item_count = meta.get_u8() as usize;
        let mut descriptors = Vec::with_capacity(item_count);
        for _ in 0..item_count {
            descriptors.push(ItemDescriptor::decode(&mut meta)?);
        }

        let mut slots = Vec::with_capacity(item_count);
        let mut binding = None;
        for descriptor in &descriptors {
            match descriptor.reconstruct(&mut payload, &self.registry)? {
                SlotOutcome::Slot(slot) => slots.push(slot),
                // Unknown to this reader; already skipped, simply omitted.
                SlotOutcome::Omitted => {}
                SlotOutcome::BindingFailed(err) => {
                    tracing::warn!(
                        kind = kind.name(),
                        invocation_id = envelope.invocation_id().unwrap_or(""),
                        error = %err,
                        "payload binding failed, producing failure envelope"
                    );
                    binding = Some(err);
                    break;
                }
            }
        }

        Ok(kinds::apply_slots(envelope, slots, binding))
    }

    /// True when an invocation carries any argument whose concrete type was
    /// never registered — the whole message then defers to the fallback codec
    /// rather than emitting a partial core frame.
    fn requires_fallback(&self, envelope: &Envelope) -> bool {
        let arguments = match envelope {
            Envelope::Invocation { arguments, .. }
            | Envelope::StreamInvocation { arguments, .. } => arguments,
            _ => return false,
        };
        arguments
            .iter()
            .flat_map(|slot| slot.values())
            .any(|value| self.registry.index_of(value).is_none())
    }

    fn encode_fallback(&self, envelope: &Envelope, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let bytes = self.fallback.encode(envelope)?;
        if bytes.len() > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: bytes.len(),
                max: self.config.max_body_size,
            }
            .into());
        }
        encode_frame(FALLBACK_DISCRIMINATOR, &bytes, dst)?;
        Ok(())
    }
}
