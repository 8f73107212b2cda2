//! Per-kind metadata encode/decode.
//!
//! One exhaustive match per direction instead of per-kind virtual dispatch.
//! Metadata carries only the plain fields (ids, strings, headers); the item
//! count and descriptors follow it inside the metadata block, written by the
//! codec layer.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::descriptor::BindingError;
use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::DecodeError;
use crate::payload::PayloadSlot;
use crate::wire::{
    ensure, get_headers, get_opt_str, get_str, get_str_seq, put_headers, put_opt_str, put_str,
    put_str_seq,
};

/// Append the kind-specific plain fields to the metadata block.
pub(crate) fn encode_meta(envelope: &Envelope, dst: &mut BytesMut) {
    match envelope {
        Envelope::CancelInvocation {
            invocation_id,
            headers,
        } => {
            put_str(dst, invocation_id);
            put_headers(dst, headers);
        }
        Envelope::Close { error } => {
            put_opt_str(dst, error.as_deref());
        }
        Envelope::Completion {
            invocation_id,
            headers,
            error,
            has_result,
            result: _,
        } => {
            put_str(dst, invocation_id);
            put_headers(dst, headers);
            put_opt_str(dst, error.as_deref());
            dst.put_u8(u8::from(*has_result));
        }
        Envelope::HandshakeRequest {
            protocol,
            version,
            minor_version,
        } => {
            put_str(dst, protocol);
            dst.put_i32_le(*version);
            dst.put_i32_le(*minor_version);
        }
        Envelope::HandshakeResponse {
            error,
            minor_version,
        } => {
            put_opt_str(dst, error.as_deref());
            dst.put_i32_le(*minor_version);
        }
        Envelope::Invocation {
            invocation_id,
            target,
            headers,
            stream_ids,
            arguments: _,
        } => {
            put_opt_str(dst, invocation_id.as_deref());
            put_str(dst, target);
            put_headers(dst, headers);
            put_str_seq(dst, stream_ids);
        }
        Envelope::Ping => {}
        Envelope::StreamInvocation {
            invocation_id,
            target,
            headers,
            stream_ids,
            arguments: _,
        } => {
            put_str(dst, invocation_id);
            put_str(dst, target);
            put_headers(dst, headers);
            put_str_seq(dst, stream_ids);
        }
        Envelope::StreamItem {
            invocation_id,
            headers,
            item: _,
        } => {
            put_str(dst, invocation_id);
            put_headers(dst, headers);
        }
        Envelope::InvocationBindingFailure { .. } | Envelope::StreamBindingFailure { .. } => {
            unreachable!("non-wire envelopes are rejected before metadata encoding")
        }
    }
}

/// Borrow the envelope's payload slots in declaration order.
pub(crate) fn payload_slots(envelope: &Envelope) -> Vec<&PayloadSlot> {
    match envelope {
        Envelope::Completion { result, .. } => vec![result],
        Envelope::Invocation { arguments, .. } | Envelope::StreamInvocation { arguments, .. } => {
            arguments.iter().collect()
        }
        Envelope::StreamItem { item, .. } => vec![item],
        _ => Vec::new(),
    }
}

/// Parse the kind-specific plain fields, leaving the cursor at the item count.
///
/// Payload slots come back defaulted (empty/null); [`apply_slots`] fills them
/// in once the descriptors and payload bytes have been consumed.
pub(crate) fn decode_meta(kind: EnvelopeKind, meta: &mut Bytes) -> Result<Envelope, DecodeError> {
    match kind {
        EnvelopeKind::CancelInvocation => Ok(Envelope::CancelInvocation {
            invocation_id: get_str(meta)?,
            headers: get_headers(meta)?,
        }),
        EnvelopeKind::Close => Ok(Envelope::Close {
            error: get_opt_str(meta)?,
        }),
        EnvelopeKind::Completion => Ok(Envelope::Completion {
            invocation_id: get_str(meta)?,
            headers: get_headers(meta)?,
            error: get_opt_str(meta)?,
            has_result: {
                ensure(meta, 1)?;
                meta.get_u8() != 0
            },
            result: PayloadSlot::Null,
        }),
        EnvelopeKind::HandshakeRequest => Ok(Envelope::HandshakeRequest {
            protocol: get_str(meta)?,
            version: {
                ensure(meta, 4)?;
                meta.get_i32_le()
            },
            minor_version: {
                ensure(meta, 4)?;
                meta.get_i32_le()
            },
        }),
        EnvelopeKind::HandshakeResponse => Ok(Envelope::HandshakeResponse {
            error: get_opt_str(meta)?,
            minor_version: {
                ensure(meta, 4)?;
                meta.get_i32_le()
            },
        }),
        EnvelopeKind::Invocation => Ok(Envelope::Invocation {
            invocation_id: get_opt_str(meta)?,
            target: get_str(meta)?,
            headers: get_headers(meta)?,
            stream_ids: get_str_seq(meta)?,
            arguments: Vec::new(),
        }),
        EnvelopeKind::Ping => Ok(Envelope::Ping),
        EnvelopeKind::StreamInvocation => Ok(Envelope::StreamInvocation {
            invocation_id: get_str(meta)?,
            target: get_str(meta)?,
            headers: get_headers(meta)?,
            stream_ids: get_str_seq(meta)?,
            arguments: Vec::new(),
        }),
        EnvelopeKind::StreamItem => Ok(Envelope::StreamItem {
            invocation_id: get_str(meta)?,
            headers: get_headers(meta)?,
            item: PayloadSlot::Null,
        }),
    }
}

/// Attach reconstructed slots, or swap to the binding-failure artifact if any
/// item failed to bind.
pub(crate) fn apply_slots(
    envelope: Envelope,
    slots: Vec<PayloadSlot>,
    binding: Option<BindingError>,
) -> Envelope {
    if let Some(err) = binding {
        return binding_failure_for(envelope, &err);
    }

    let mut slots = slots.into_iter();
    match envelope {
        Envelope::Completion {
            invocation_id,
            headers,
            error,
            has_result,
            result: _,
        } => Envelope::Completion {
            invocation_id,
            headers,
            error,
            has_result,
            // A result of an unregistered type was omitted; fall back to null.
            result: slots.next().unwrap_or(PayloadSlot::Null),
        },
        Envelope::Invocation {
            invocation_id,
            target,
            headers,
            stream_ids,
            arguments: _,
        } => Envelope::Invocation {
            invocation_id,
            target,
            headers,
            stream_ids,
            arguments: slots.collect(),
        },
        Envelope::StreamInvocation {
            invocation_id,
            target,
            headers,
            stream_ids,
            arguments: _,
        } => Envelope::StreamInvocation {
            invocation_id,
            target,
            headers,
            stream_ids,
            arguments: slots.collect(),
        },
        Envelope::StreamItem {
            invocation_id,
            headers,
            item: _,
        } => Envelope::StreamItem {
            invocation_id,
            headers,
            item: slots.next().unwrap_or(PayloadSlot::Null),
        },
        // No payload slots to attach.
        other => other,
    }
}

fn binding_failure_for(envelope: Envelope, err: &BindingError) -> Envelope {
    let error = err.to_string();
    match envelope {
        Envelope::Invocation {
            invocation_id,
            target,
            ..
        } => Envelope::InvocationBindingFailure {
            invocation_id,
            target,
            error,
        },
        Envelope::StreamInvocation {
            invocation_id,
            target,
            ..
        } => Envelope::InvocationBindingFailure {
            invocation_id: Some(invocation_id),
            target,
            error,
        },
        Envelope::Completion { invocation_id, .. } | Envelope::StreamItem { invocation_id, .. } => {
            Envelope::StreamBindingFailure {
                invocation_id,
                error,
            }
        }
        // Kinds without payload slots cannot produce binding errors.
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn roundtrip_meta(envelope: &Envelope) -> Envelope {
        let kind = envelope.kind().unwrap();
        let mut dst = BytesMut::new();
        encode_meta(envelope, &mut dst);
        let mut src = dst.freeze();
        let decoded = decode_meta(kind, &mut src).unwrap();
        assert!(src.is_empty(), "{} metadata fully consumed", kind.name());
        decoded
    }

    #[test]
    fn cancel_invocation_meta_roundtrip() {
        let mut headers = HashMap::new();
        headers.insert("trace".to_string(), "1".to_string());
        let envelope = Envelope::CancelInvocation {
            invocation_id: "42".into(),
            headers,
        };
        assert_eq!(roundtrip_meta(&envelope), envelope);
    }

    #[test]
    fn close_meta_roundtrip_with_and_without_error() {
        let with = Envelope::Close {
            error: Some("going away".into()),
        };
        let without = Envelope::Close { error: None };
        assert_eq!(roundtrip_meta(&with), with);
        assert_eq!(roundtrip_meta(&without), without);
    }

    #[test]
    fn handshake_meta_roundtrip() {
        let request = Envelope::HandshakeRequest {
            protocol: "hubwire".into(),
            version: 1,
            minor_version: 3,
        };
        let response = Envelope::HandshakeResponse {
            error: None,
            minor_version: 3,
        };
        assert_eq!(roundtrip_meta(&request), request);
        assert_eq!(roundtrip_meta(&response), response);
    }

    #[test]
    fn ping_meta_is_empty() {
        let mut dst = BytesMut::new();
        encode_meta(&Envelope::Ping, &mut dst);
        assert!(dst.is_empty());
        assert_eq!(roundtrip_meta(&Envelope::Ping), Envelope::Ping);
    }

    #[test]
    fn invocation_meta_roundtrip_keeps_stream_ids() {
        let envelope = Envelope::Invocation {
            invocation_id: Some("9".into()),
            target: "Upload".into(),
            headers: HashMap::new(),
            stream_ids: vec!["s1".into(), "s2".into()],
            arguments: Vec::new(),
        };
        assert_eq!(roundtrip_meta(&envelope), envelope);
    }

    #[test]
    fn completion_meta_keeps_has_result_flag() {
        let envelope = Envelope::Completion {
            invocation_id: "5".into(),
            headers: HashMap::new(),
            error: None,
            has_result: true,
            result: PayloadSlot::Null,
        };
        match roundtrip_meta(&envelope) {
            Envelope::Completion { has_result, .. } => assert!(has_result),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn apply_slots_fills_arguments() {
        let envelope = Envelope::Invocation {
            invocation_id: None,
            target: "T".into(),
            headers: HashMap::new(),
            stream_ids: Vec::new(),
            arguments: Vec::new(),
        };
        let filled = apply_slots(envelope, vec![PayloadSlot::Null, PayloadSlot::Null], None);
        match filled {
            Envelope::Invocation { arguments, .. } => assert_eq!(arguments.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn binding_error_swaps_to_failure_variant() {
        let envelope = Envelope::StreamItem {
            invocation_id: "3".into(),
            headers: HashMap::new(),
            item: PayloadSlot::Null,
        };
        let err = BindingError {
            type_name: "test::Broken",
            source: prost::DecodeError::new("invalid wire type"),
        };
        match apply_slots(envelope, Vec::new(), Some(err)) {
            Envelope::StreamBindingFailure {
                invocation_id,
                error,
            } => {
                assert_eq!(invocation_id, "3");
                assert!(error.contains("test::Broken"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
