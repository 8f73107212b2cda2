//! Construction-time table of payload types known to a codec instance.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::RegistryError;
use crate::payload::{BoxedPayload, PayloadMessage};

/// Hard cap on registered types; indices must stay within the positive `i32`
/// range the wire reserves for caller payload types.
pub const MAX_REGISTERED_TYPES: usize = i32::MAX as usize;

type DecodeFn = fn(&[u8]) -> Result<BoxedPayload, prost::DecodeError>;

struct RegistryEntry {
    type_name: &'static str,
    decode: DecodeFn,
}

/// Ordered, immutable mapping between payload types and compact wire indices.
///
/// Insertion order defines the index, so both peers must register the same
/// types in the same order. Built once, then shared read-only across every
/// encode/decode call on the codec instance; no interior mutability.
pub struct PayloadRegistry {
    entries: Vec<RegistryEntry>,
    index_by_type: HashMap<TypeId, i32>,
}

impl PayloadRegistry {
    /// Start building a registry.
    pub fn builder() -> PayloadRegistryBuilder {
        PayloadRegistryBuilder {
            entries: Vec::new(),
            index_by_type: HashMap::new(),
        }
    }

    /// A registry with no payload types.
    ///
    /// Every decoded item is treated as unknown and skipped; useful for
    /// inspection tools that only care about envelope metadata.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index_by_type: HashMap::new(),
        }
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wire index of a value's concrete type, or `None` if never registered.
    pub fn index_of(&self, value: &dyn PayloadMessage) -> Option<i32> {
        self.index_by_type.get(&value.as_any().type_id()).copied()
    }

    /// Wire index of a concrete type.
    pub fn index_of_type<M: PayloadMessage>(&self) -> Option<i32> {
        self.index_by_type.get(&TypeId::of::<M>()).copied()
    }

    /// Name of the type registered at `index`, or `None` if out of range.
    pub fn type_name_at(&self, index: i32) -> Option<&'static str> {
        self.entry_at(index).map(|entry| entry.type_name)
    }

    /// True when `index` maps to a registered type.
    pub fn contains_index(&self, index: i32) -> bool {
        self.entry_at(index).is_some()
    }

    /// Instantiate the type at `index` and merge `bytes` into it.
    ///
    /// Returns `None` for indices outside the registered range — the
    /// forward-compatibility case where the writer knows a type this reader
    /// does not. A `Some(Err(_))` is a binding failure for a known type.
    pub fn decode_item(
        &self,
        index: i32,
        bytes: &[u8],
    ) -> Option<Result<BoxedPayload, prost::DecodeError>> {
        self.entry_at(index).map(|entry| (entry.decode)(bytes))
    }

    fn entry_at(&self, index: i32) -> Option<&RegistryEntry> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.entries.get(index))
    }
}

impl std::fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.type_name))
            .finish()
    }
}

/// Builder enforcing the one-type-one-index invariant.
pub struct PayloadRegistryBuilder {
    entries: Vec<RegistryEntry>,
    index_by_type: HashMap<TypeId, i32>,
}

impl PayloadRegistryBuilder {
    /// Register the next payload type; its index is the registration order.
    pub fn register<M>(mut self) -> Result<Self, RegistryError>
    where
        M: prost::Message + PartialEq + Clone + Default + 'static + std::fmt::Debug,
    {
        let type_id = TypeId::of::<M>();
        let type_name = std::any::type_name::<M>();

        if self.index_by_type.contains_key(&type_id) {
            return Err(RegistryError::DuplicateType(type_name));
        }
        if self.entries.len() >= MAX_REGISTERED_TYPES {
            return Err(RegistryError::Full(self.entries.len()));
        }

        let index = self.entries.len() as i32;
        self.entries.push(RegistryEntry {
            type_name,
            decode: decode_payload::<M>,
        });
        self.index_by_type.insert(type_id, index);
        Ok(self)
    }

    /// Finish building.
    pub fn build(self) -> PayloadRegistry {
        debug_assert_eq!(self.entries.len(), self.index_by_type.len());
        PayloadRegistry {
            entries: self.entries,
            index_by_type: self.index_by_type,
        }
    }
}

fn decode_payload<M>(bytes: &[u8]) -> Result<BoxedPayload, prost::DecodeError>
where
    M: prost::Message + PartialEq + Clone + Default + 'static + std::fmt::Debug,
{
    let mut value = M::default();
    value.merge(bytes)?;
    Ok(Box::new(value))
}
