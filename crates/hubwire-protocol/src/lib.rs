//! RPC envelope codec with an indexed payload registry and fallback dispatch.
//!
//! hubwire-protocol turns typed [`Envelope`]s carrying type-erased protobuf
//! payloads into self-describing, length-delimited frames and back. Payload
//! types are identified on the wire by their position in a
//! [`PayloadRegistry`] built once per codec instance, which is what lets the
//! format survive schema growth: a reader simply skips indices it has never
//! registered. Kinds and payload types outside the registry defer to an
//! external [`FallbackCodec`] behind a reserved discriminator.
//!
//! The decode entry point is streaming-safe: it reports "not enough bytes
//! yet" as `Ok(None)` and never advances the input cursor across an
//! incomplete frame.

pub mod codec;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod fallback;
pub mod payload;
pub mod registry;

mod kinds;
mod wire;

#[cfg(test)]
mod testutil;

pub use codec::{
    CodecConfig, EnvelopeCodec, MAX_SLOTS, PROTOCOL_MINOR_VERSION, PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use descriptor::{
    BindingError, ItemDescriptor, SlotOutcome, LIST_MARKER_INDEX, NULL_ITEM_INDEX,
    RESERVED_INDEX_FLOOR,
};
pub use envelope::{Envelope, EnvelopeKind, FALLBACK_DISCRIMINATOR};
pub use error::{DecodeError, EncodeError, FallbackError, RegistryError};
pub use fallback::{BoxedFallback, FallbackCodec, NoFallback};
pub use payload::{BoxedPayload, PayloadMessage, PayloadSlot};
pub use registry::{PayloadRegistry, PayloadRegistryBuilder, MAX_REGISTERED_TYPES};
