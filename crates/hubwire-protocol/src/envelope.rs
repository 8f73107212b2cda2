//! The envelope model: one closed tagged union over all wire message kinds.

use std::collections::HashMap;

use crate::payload::PayloadSlot;

/// Reserved discriminator byte: the frame body belongs entirely to the
/// external fallback codec.
pub const FALLBACK_DISCRIMINATOR: u8 = 0x7F;

/// Wire discriminators for the core envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EnvelopeKind {
    CancelInvocation = 0,
    Close = 1,
    Completion = 2,
    HandshakeRequest = 3,
    HandshakeResponse = 4,
    Invocation = 5,
    Ping = 6,
    StreamInvocation = 7,
    StreamItem = 8,
}

impl EnvelopeKind {
    /// Map a discriminator byte back to a kind.
    pub fn from_discriminator(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::CancelInvocation),
            1 => Some(Self::Close),
            2 => Some(Self::Completion),
            3 => Some(Self::HandshakeRequest),
            4 => Some(Self::HandshakeResponse),
            5 => Some(Self::Invocation),
            6 => Some(Self::Ping),
            7 => Some(Self::StreamInvocation),
            8 => Some(Self::StreamItem),
            _ => None,
        }
    }

    /// The discriminator byte written to the wire.
    pub fn discriminator(self) -> u8 {
        self as u8
    }

    /// Human-readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            Self::CancelInvocation => "CancelInvocation",
            Self::Close => "Close",
            Self::Completion => "Completion",
            Self::HandshakeRequest => "HandshakeRequest",
            Self::HandshakeResponse => "HandshakeResponse",
            Self::Invocation => "Invocation",
            Self::Ping => "Ping",
            Self::StreamInvocation => "StreamInvocation",
            Self::StreamItem => "StreamItem",
        }
    }
}

/// One RPC-layer message.
///
/// The nine wire kinds plus two decode-side artifacts
/// ([`Envelope::InvocationBindingFailure`], [`Envelope::StreamBindingFailure`])
/// that a decoder produces when a payload item fails to reconstruct; those two
/// never appear on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Caller abandons a streaming invocation.
    CancelInvocation {
        invocation_id: String,
        headers: HashMap<String, String>,
    },

    /// The connection is going away, optionally with an error.
    Close { error: Option<String> },

    /// Terminal result of an invocation.
    Completion {
        invocation_id: String,
        headers: HashMap<String, String>,
        error: Option<String>,
        /// Distinguishes "completed with a null result" from "no result".
        has_result: bool,
        result: PayloadSlot,
    },

    /// Client opens the protocol negotiation.
    HandshakeRequest {
        protocol: String,
        version: i32,
        /// Reserved for forward evolution within a major version.
        minor_version: i32,
    },

    /// Server answers the negotiation; an error rejects the connection.
    HandshakeResponse {
        error: Option<String>,
        minor_version: i32,
    },

    /// Fire-and-forget or tracked method call.
    Invocation {
        /// Absent for fire-and-forget calls that expect no completion.
        invocation_id: Option<String>,
        target: String,
        headers: HashMap<String, String>,
        stream_ids: Vec<String>,
        arguments: Vec<PayloadSlot>,
    },

    /// Keep-alive.
    Ping,

    /// Method call whose results arrive as a stream of items.
    StreamInvocation {
        invocation_id: String,
        target: String,
        headers: HashMap<String, String>,
        stream_ids: Vec<String>,
        arguments: Vec<PayloadSlot>,
    },

    /// One element of an active stream.
    StreamItem {
        invocation_id: String,
        headers: HashMap<String, String>,
        item: PayloadSlot,
    },

    /// Decode-side artifact: an invocation whose arguments failed to bind.
    InvocationBindingFailure {
        invocation_id: Option<String>,
        target: String,
        error: String,
    },

    /// Decode-side artifact: a stream value or result that failed to bind.
    StreamBindingFailure {
        invocation_id: String,
        error: String,
    },
}

impl Envelope {
    /// Wire kind, or `None` for the decode-side binding-failure artifacts.
    pub fn kind(&self) -> Option<EnvelopeKind> {
        match self {
            Self::CancelInvocation { .. } => Some(EnvelopeKind::CancelInvocation),
            Self::Close { .. } => Some(EnvelopeKind::Close),
            Self::Completion { .. } => Some(EnvelopeKind::Completion),
            Self::HandshakeRequest { .. } => Some(EnvelopeKind::HandshakeRequest),
            Self::HandshakeResponse { .. } => Some(EnvelopeKind::HandshakeResponse),
            Self::Invocation { .. } => Some(EnvelopeKind::Invocation),
            Self::Ping => Some(EnvelopeKind::Ping),
            Self::StreamInvocation { .. } => Some(EnvelopeKind::StreamInvocation),
            Self::StreamItem { .. } => Some(EnvelopeKind::StreamItem),
            Self::InvocationBindingFailure { .. } | Self::StreamBindingFailure { .. } => None,
        }
    }

    /// Kind name including the non-wire artifacts, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind() {
            Some(kind) => kind.name(),
            None => match self {
                Self::InvocationBindingFailure { .. } => "InvocationBindingFailure",
                Self::StreamBindingFailure { .. } => "StreamBindingFailure",
                _ => unreachable!("wire kinds are covered above"),
            },
        }
    }

    /// The invocation this envelope relates to, when it has one.
    pub fn invocation_id(&self) -> Option<&str> {
        match self {
            Self::CancelInvocation { invocation_id, .. }
            | Self::Completion { invocation_id, .. }
            | Self::StreamInvocation { invocation_id, .. }
            | Self::StreamItem { invocation_id, .. }
            | Self::StreamBindingFailure { invocation_id, .. } => Some(invocation_id),
            Self::Invocation { invocation_id, .. }
            | Self::InvocationBindingFailure { invocation_id, .. } => invocation_id.as_deref(),
            Self::Close { .. }
            | Self::HandshakeRequest { .. }
            | Self::HandshakeResponse { .. }
            | Self::Ping => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminators_roundtrip() {
        for byte in 0..=8u8 {
            let kind = EnvelopeKind::from_discriminator(byte).unwrap();
            assert_eq!(kind.discriminator(), byte);
        }
        assert_eq!(EnvelopeKind::from_discriminator(9), None);
        assert_eq!(EnvelopeKind::from_discriminator(FALLBACK_DISCRIMINATOR), None);
    }

    #[test]
    fn binding_failures_have_no_wire_kind() {
        let envelope = Envelope::StreamBindingFailure {
            invocation_id: "7".into(),
            error: "bad bytes".into(),
        };
        assert_eq!(envelope.kind(), None);
        assert_eq!(envelope.kind_name(), "StreamBindingFailure");
    }

    #[test]
    fn invocation_id_accessor() {
        let ping = Envelope::Ping;
        assert_eq!(ping.invocation_id(), None);

        let cancel = Envelope::CancelInvocation {
            invocation_id: "42".into(),
            headers: HashMap::new(),
        };
        assert_eq!(cancel.invocation_id(), Some("42"));

        let blind = Envelope::Invocation {
            invocation_id: None,
            target: "Notify".into(),
            headers: HashMap::new(),
            stream_ids: Vec::new(),
            arguments: Vec::new(),
        };
        assert_eq!(blind.invocation_id(), None);
    }
}
