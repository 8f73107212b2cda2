use hubwire_frame::FrameError;

/// Errors surfaced while encoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A payload value's concrete type was never registered.
    ///
    /// This is a programming error on the encode side; the wire never sees a
    /// partial frame. Invocation kinds route around it via the fallback codec.
    #[error("unknown payload type {type_name} (never registered)")]
    UnknownPayloadType { type_name: &'static str },

    /// A single payload value's serialized form does not fit a u32 size field.
    #[error("payload of type {type_name} too large ({size} bytes)")]
    PayloadTooLarge { type_name: &'static str, size: usize },

    /// More payload slots than the wire's one-byte item count can carry.
    #[error("too many payload slots ({0}, max 255)")]
    TooManySlots(usize),

    /// Binding-failure envelopes are decode-side artifacts with no wire form.
    #[error("{kind} envelopes have no wire representation")]
    NotWireEncodable { kind: &'static str },

    /// The external fallback codec failed.
    #[error(transparent)]
    Fallback(#[from] FallbackError),

    /// Frame-level failure (body over the configured limit).
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The opaque payload serializer reported a failure.
    #[error("payload serialization failed: {0}")]
    Payload(#[from] prost::EncodeError),
}

/// Errors surfaced while decoding a frame that was fully buffered.
///
/// "Not enough bytes yet" is never an error: the decode entry point returns
/// `Ok(None)` for that, and the input cursor stays put.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Frame-level failure (declared body over the configured limit).
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The frame was complete but its contents are not parseable.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The discriminator byte maps to no known envelope kind.
    #[error("unknown discriminator byte 0x{0:02x}")]
    UnknownDiscriminator(u8),

    /// The external fallback codec failed.
    #[error(transparent)]
    Fallback(#[from] FallbackError),
}

/// Failure reported by the external fallback codec.
#[derive(Debug, thiserror::Error)]
#[error("fallback codec error: {message}")]
pub struct FallbackError {
    message: String,
}

impl FallbackError {
    /// Create a fallback error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced while building a payload registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The same concrete type was registered twice; its index would be ambiguous.
    #[error("duplicate payload type {0}")]
    DuplicateType(&'static str),

    /// The registry cannot hold more entries.
    #[error("registry full ({0} types)")]
    Full(usize),
}
