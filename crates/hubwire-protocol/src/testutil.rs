//! Shared test fixtures: hand-written protobuf payload types and a stub
//! fallback codec.

use bytes::Bytes;

use crate::codec::EnvelopeCodec;
use crate::envelope::Envelope;
use crate::error::FallbackError;
use crate::fallback::{BoxedFallback, FallbackCodec};
use crate::registry::PayloadRegistry;

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct ChatPosted {
    #[prost(string, tag = "1")]
    pub channel: String,
    #[prost(string, tag = "2")]
    pub body: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PresenceChanged {
    #[prost(string, tag = "1")]
    pub user: String,
    #[prost(bool, tag = "2")]
    pub online: bool,
}

/// Valid protobuf type that is deliberately never registered.
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct UnregisteredEvent {
    #[prost(int64, tag = "1")]
    pub value: i64,
}

pub(crate) fn registry() -> PayloadRegistry {
    PayloadRegistry::builder()
        .register::<ChatPosted>()
        .unwrap()
        .register::<PresenceChanged>()
        .unwrap()
        .build()
}

pub(crate) fn codec() -> EnvelopeCodec {
    EnvelopeCodec::new(registry(), BoxedFallback::new(StubFallback))
}

pub(crate) const STUB_FALLBACK_BYTES: &[u8] = b"<stub-fallback-frame>";

/// Fallback stand-in: emits a fixed marker body and decodes it back to a
/// recognizable envelope, which is all the dispatch tests need.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StubFallback;

impl StubFallback {
    pub(crate) fn decoded_marker() -> Envelope {
        Envelope::Close {
            error: Some("decoded by stub fallback".into()),
        }
    }
}

impl FallbackCodec for StubFallback {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn encode(&self, _envelope: &Envelope) -> Result<Bytes, FallbackError> {
        Ok(Bytes::from_static(STUB_FALLBACK_BYTES))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, FallbackError> {
        if bytes == STUB_FALLBACK_BYTES {
            Ok(Self::decoded_marker())
        } else {
            Err(FallbackError::new("unexpected fallback body"))
        }
    }
}
