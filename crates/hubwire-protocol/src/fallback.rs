//! External codec hook for traffic outside the registry.

use std::sync::Arc;

use bytes::Bytes;

use crate::envelope::Envelope;
use crate::error::FallbackError;

/// External codec for envelope kinds and payload types the registry does not
/// cover.
///
/// A frame written under the reserved fallback discriminator hands its entire
/// body to this codec; the core format makes no assumption about what is
/// inside beyond the outer length delimiting.
pub trait FallbackCodec: Send + Sync + 'static {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Serialize an entire envelope.
    fn encode(&self, envelope: &Envelope) -> Result<Bytes, FallbackError>;

    /// Reconstruct an envelope from fallback bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Envelope, FallbackError>;
}

/// Type-erased, shared fallback codec handle.
#[derive(Clone)]
pub struct BoxedFallback(Arc<dyn FallbackCodec>);

impl BoxedFallback {
    /// Wrap a fallback codec.
    pub fn new<C: FallbackCodec>(codec: C) -> Self {
        Self(Arc::new(codec))
    }

    /// The wrapped codec's name.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Serialize an entire envelope.
    pub fn encode(&self, envelope: &Envelope) -> Result<Bytes, FallbackError> {
        self.0.encode(envelope)
    }

    /// Reconstruct an envelope from fallback bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, FallbackError> {
        self.0.decode(bytes)
    }
}

impl std::fmt::Debug for BoxedFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedFallback").field(&self.name()).finish()
    }
}

/// Fallback placeholder that rejects everything.
///
/// For deployments where all traffic is expected to use registered payload
/// types and core kinds; any attempt to defer becomes an explicit error
/// instead of silent data loss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl FallbackCodec for NoFallback {
    fn name(&self) -> &'static str {
        "none"
    }

    fn encode(&self, envelope: &Envelope) -> Result<Bytes, FallbackError> {
        Err(FallbackError::new(format!(
            "no fallback codec configured (cannot encode {})",
            envelope.kind_name()
        )))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, FallbackError> {
        Err(FallbackError::new(format!(
            "no fallback codec configured (cannot decode {} bytes)",
            bytes.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fallback_rejects_both_directions() {
        let fallback = BoxedFallback::new(NoFallback);
        assert_eq!(fallback.name(), "none");
        assert!(fallback.encode(&Envelope::Ping).is_err());
        assert!(fallback.decode(b"anything").is_err());
    }

    #[test]
    fn boxed_fallback_is_cheaply_cloneable() {
        let fallback = BoxedFallback::new(NoFallback);
        let clone = fallback.clone();
        assert_eq!(clone.name(), fallback.name());
    }
}
