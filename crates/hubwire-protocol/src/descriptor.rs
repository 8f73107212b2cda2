//! Wire descriptors for payload slots.
//!
//! Each slot is described by `(type index, byte size)` pairs ahead of the
//! payload bytes themselves. A null item is the `(-1, 0)` sentinel; a list
//! slot opens with the `-2` marker and an entry count, so an empty list stays
//! distinguishable from a null slot.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::payload::{PayloadMessage, PayloadSlot};
use crate::registry::PayloadRegistry;
use crate::wire::ensure;

/// Type-index sentinel marking a null item (declared size is always 0).
pub const NULL_ITEM_INDEX: i32 = -1;

/// Type-index marker introducing a list slot.
pub const LIST_MARKER_INDEX: i32 = -2;

/// Indices at or below this are reserved for infrastructure types, so they
/// can never collide with caller-registered payload types (which are >= 0).
pub const RESERVED_INDEX_FLOOR: i32 = -65;

/// Wire description of one payload slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDescriptor {
    /// Absent or single item; null is `(NULL_ITEM_INDEX, 0)`.
    Single { type_index: i32, size: u32 },
    /// Ordered list; each entry may be the null sentinel.
    List { entries: Vec<(i32, u32)> },
}

impl ItemDescriptor {
    /// Describe `slot`, resolving each contained value through the registry.
    pub fn describe(slot: &PayloadSlot, registry: &PayloadRegistry) -> Result<Self, EncodeError> {
        match slot {
            PayloadSlot::Null => Ok(Self::Single {
                type_index: NULL_ITEM_INDEX,
                size: 0,
            }),
            PayloadSlot::Single(value) => {
                let (type_index, size) = describe_value(value.as_ref(), registry)?;
                Ok(Self::Single { type_index, size })
            }
            PayloadSlot::List(items) => {
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    entries.push(match item {
                        None => (NULL_ITEM_INDEX, 0),
                        Some(value) => describe_value(value.as_ref(), registry)?,
                    });
                }
                Ok(Self::List { entries })
            }
        }
    }

    /// Sum of declared item sizes.
    ///
    /// The enclosing frame uses this to compute its total body length without
    /// serializing payload bytes a second time.
    pub fn total_payload_size(&self) -> usize {
        match self {
            Self::Single { size, .. } => *size as usize,
            Self::List { entries } => entries.iter().map(|(_, size)| *size as usize).sum(),
        }
    }

    /// Serialized length of the descriptor itself within the metadata block.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Single { .. } => 8,
            Self::List { entries } => 8 + entries.len() * 8,
        }
    }

    /// Append the descriptor's wire form to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Single { type_index, size } => {
                dst.put_i32_le(*type_index);
                dst.put_u32_le(*size);
            }
            Self::List { entries } => {
                dst.put_i32_le(LIST_MARKER_INDEX);
                dst.put_u32_le(entries.len() as u32);
                for (type_index, size) in entries {
                    dst.put_i32_le(*type_index);
                    dst.put_u32_le(*size);
                }
            }
        }
    }

    /// Parse one descriptor from the metadata block.
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        ensure(src, 8)?;
        let first = src.get_i32_le();

        if first == LIST_MARKER_INDEX {
            let count = src.get_u32_le() as usize;
            if count > src.remaining() / 8 {
                return Err(DecodeError::Malformed(format!(
                    "list descriptor count {count} exceeds remaining metadata"
                )));
            }
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                ensure(src, 8)?;
                entries.push((src.get_i32_le(), src.get_u32_le()));
            }
            Ok(Self::List { entries })
        } else {
            Ok(Self::Single {
                type_index: first,
                size: src.get_u32_le(),
            })
        }
    }

    /// Reconstruct the slot, consuming exactly the declared bytes from
    /// `payload`.
    ///
    /// Unknown type indices are skipped and their items omitted (the writer
    /// registered a type this reader has not — forward compatibility). A
    /// merge failure on a known type stops at that item and is reported as a
    /// binding failure; the declared sizes already told us where every item
    /// ends, so the enclosing stream stays aligned either way.
    pub fn reconstruct(
        &self,
        payload: &mut Bytes,
        registry: &PayloadRegistry,
    ) -> Result<SlotOutcome, DecodeError> {
        match self {
            Self::Single { type_index, size } => {
                match read_item(*type_index, *size, payload, registry)? {
                    ItemOutcome::Value(value) => Ok(SlotOutcome::Slot(PayloadSlot::Single(value))),
                    ItemOutcome::Null => Ok(SlotOutcome::Slot(PayloadSlot::Null)),
                    ItemOutcome::Unknown => Ok(SlotOutcome::Omitted),
                    ItemOutcome::BindingFailed(err) => Ok(SlotOutcome::BindingFailed(err)),
                }
            }
            Self::List { entries } => {
                let mut items = Vec::with_capacity(entries.len());
                for (type_index, size) in entries {
                    match read_item(*type_index, *size, payload, registry)? {
                        ItemOutcome::Value(value) => items.push(Some(value)),
                        ItemOutcome::Null => items.push(None),
                        // Omitted entirely, shrinking the list.
                        ItemOutcome::Unknown => {}
                        ItemOutcome::BindingFailed(err) => {
                            return Ok(SlotOutcome::BindingFailed(err))
                        }
                    }
                }
                Ok(SlotOutcome::Slot(PayloadSlot::List(items)))
            }
        }
    }
}

/// Outcome of reconstructing one slot.
#[derive(Debug)]
pub enum SlotOutcome {
    /// The slot, possibly with unknown list entries omitted.
    Slot(PayloadSlot),
    /// The whole item came from a type this reader never registered.
    Omitted,
    /// A known item failed to merge from its declared bytes.
    BindingFailed(BindingError),
}

/// A registered item that failed to reconstruct from its declared bytes.
#[derive(Debug, thiserror::Error)]
#[error("failed to bind payload of type {type_name}: {source}")]
pub struct BindingError {
    /// Registered name of the offending type.
    pub type_name: &'static str,
    /// The underlying merge failure.
    #[source]
    pub source: prost::DecodeError,
}

enum ItemOutcome {
    Value(crate::payload::BoxedPayload),
    Null,
    Unknown,
    BindingFailed(BindingError),
}

fn read_item(
    type_index: i32,
    size: u32,
    payload: &mut Bytes,
    registry: &PayloadRegistry,
) -> Result<ItemOutcome, DecodeError> {
    if type_index == NULL_ITEM_INDEX {
        return Ok(ItemOutcome::Null);
    }
    if type_index < 0 {
        return Err(DecodeError::Malformed(format!(
            "reserved type index {type_index} in item position"
        )));
    }

    let size = size as usize;
    if payload.remaining() < size {
        return Err(DecodeError::Malformed(format!(
            "declared item size {size} exceeds remaining payload ({})",
            payload.remaining()
        )));
    }
    let item_bytes = payload.split_to(size);

    match registry.decode_item(type_index, &item_bytes) {
        Some(Ok(value)) => Ok(ItemOutcome::Value(value)),
        Some(Err(source)) => Ok(ItemOutcome::BindingFailed(BindingError {
            // contains_index held, so the name is present.
            type_name: registry.type_name_at(type_index).unwrap_or("<unknown>"),
            source,
        })),
        None => {
            tracing::debug!(
                type_index,
                size,
                "skipping payload item of unregistered type"
            );
            Ok(ItemOutcome::Unknown)
        }
    }
}

fn describe_value(
    value: &dyn PayloadMessage,
    registry: &PayloadRegistry,
) -> Result<(i32, u32), EncodeError> {
    let type_index = registry
        .index_of(value)
        .ok_or_else(|| EncodeError::UnknownPayloadType {
            type_name: value.type_name(),
        })?;
    let size =
        u32::try_from(value.byte_size()).map_err(|_| EncodeError::PayloadTooLarge {
            type_name: value.type_name(),
            size: value.byte_size(),
        })?;
    Ok((type_index, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::BoxedPayload;
    use crate::testutil::{registry, ChatPosted, PresenceChanged, UnregisteredEvent};

    fn chat(body: &str) -> ChatPosted {
        ChatPosted {
            channel: "general".into(),
            body: body.into(),
        }
    }

    #[test]
    fn null_slot_is_the_sentinel_pair() {
        let descriptor = ItemDescriptor::describe(&PayloadSlot::Null, &registry()).unwrap();
        assert_eq!(
            descriptor,
            ItemDescriptor::Single {
                type_index: NULL_ITEM_INDEX,
                size: 0
            }
        );
        assert_eq!(descriptor.total_payload_size(), 0);
    }

    #[test]
    fn single_slot_records_index_and_size() {
        let value = chat("hello");
        let expected_size = value.byte_size() as u32;
        let slot = PayloadSlot::single(value);

        let descriptor = ItemDescriptor::describe(&slot, &registry()).unwrap();
        assert_eq!(
            descriptor,
            ItemDescriptor::Single {
                type_index: 0,
                size: expected_size
            }
        );
    }

    #[test]
    fn unregistered_value_fails_description() {
        let slot = PayloadSlot::single(UnregisteredEvent { value: 1 });
        let result = ItemDescriptor::describe(&slot, &registry());
        assert!(matches!(
            result,
            Err(EncodeError::UnknownPayloadType { .. })
        ));
    }

    #[test]
    fn list_descriptor_roundtrip_with_interior_null() {
        let slot = PayloadSlot::list([
            Some(Box::new(chat("one")) as BoxedPayload),
            None,
            Some(Box::new(PresenceChanged {
                user: "ada".into(),
                online: true,
            }) as BoxedPayload),
        ]);
        let descriptor = ItemDescriptor::describe(&slot, &registry()).unwrap();

        let mut dst = BytesMut::new();
        descriptor.encode(&mut dst);
        assert_eq!(dst.len(), descriptor.encoded_len());

        let mut src = dst.freeze();
        let decoded = ItemDescriptor::decode(&mut src).unwrap();
        assert_eq!(decoded, descriptor);
        assert!(src.is_empty());

        match decoded {
            ItemDescriptor::List { ref entries } => {
                assert_eq!(entries.len(), 3);
                assert_eq!(entries[1], (NULL_ITEM_INDEX, 0));
            }
            _ => panic!("expected list descriptor"),
        }
    }

    #[test]
    fn empty_list_is_not_null() {
        let empty = ItemDescriptor::describe(&PayloadSlot::List(Vec::new()), &registry()).unwrap();
        let null = ItemDescriptor::describe(&PayloadSlot::Null, &registry()).unwrap();
        assert_ne!(empty, null);

        let mut dst = BytesMut::new();
        empty.encode(&mut dst);
        let mut src = dst.freeze();
        let decoded = ItemDescriptor::decode(&mut src).unwrap();
        assert_eq!(decoded, ItemDescriptor::List { entries: vec![] });
    }

    #[test]
    fn total_size_sums_list_entries() {
        let descriptor = ItemDescriptor::List {
            entries: vec![(0, 11), (NULL_ITEM_INDEX, 0), (1, 7)],
        };
        assert_eq!(descriptor.total_payload_size(), 18);
    }

    #[test]
    fn reconstruct_roundtrips_single() {
        let reg = registry();
        let value = chat("roundtrip");
        let slot = PayloadSlot::single(value.clone());
        let descriptor = ItemDescriptor::describe(&slot, &reg).unwrap();

        let mut payload = BytesMut::new();
        value.write_to(&mut payload).unwrap();
        let mut payload = payload.freeze();

        match descriptor.reconstruct(&mut payload, &reg).unwrap() {
            SlotOutcome::Slot(decoded) => assert_eq!(decoded, slot),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(payload.is_empty());
    }

    #[test]
    fn unknown_index_skips_declared_bytes_exactly() {
        let reg = registry();
        // Index 9 was registered by a newer writer; 4 bytes of opaque payload,
        // then a trailing byte belonging to the next item.
        let descriptor = ItemDescriptor::Single {
            type_index: 9,
            size: 4,
        };
        let mut payload = Bytes::from_static(&[1, 2, 3, 4, 0xAA]);

        match descriptor.reconstruct(&mut payload, &reg).unwrap() {
            SlotOutcome::Omitted => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(payload.as_ref(), &[0xAA]);
    }

    #[test]
    fn corrupt_bytes_yield_binding_failure() {
        let reg = registry();
        let descriptor = ItemDescriptor::Single {
            type_index: 0,
            size: 2,
        };
        let mut payload = Bytes::from_static(&[0xFF, 0xFF]);

        match descriptor.reconstruct(&mut payload, &reg).unwrap() {
            SlotOutcome::BindingFailed(err) => {
                assert!(err.type_name.contains("ChatPosted"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn lying_size_is_malformed_not_binding() {
        let reg = registry();
        let descriptor = ItemDescriptor::Single {
            type_index: 0,
            size: 64,
        };
        let mut payload = Bytes::from_static(&[0x0A]);
        assert!(matches!(
            descriptor.reconstruct(&mut payload, &reg),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn reserved_index_in_item_position_is_malformed() {
        let reg = registry();
        let descriptor = ItemDescriptor::Single {
            type_index: -7,
            size: 0,
        };
        let mut payload = Bytes::new();
        assert!(matches!(
            descriptor.reconstruct(&mut payload, &reg),
            Err(DecodeError::Malformed(_))
        ));
    }
}
