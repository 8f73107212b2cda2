//! Type-erased payload values and the slots that carry them.

use std::any::Any;
use std::fmt;

use bytes::BytesMut;

/// A type-erased, externally-serialized payload value.
///
/// Blanket-implemented for every `prost::Message` that is also
/// `Clone + PartialEq`, so generated protobuf types participate without any
/// per-type glue. The codec itself only ever needs the serialized byte length
/// and the bytes; reconstruction goes through the registry's per-type decode
/// table.
pub trait PayloadMessage: fmt::Debug + Send + Sync + 'static {
    /// Stable name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Serialized byte length of this value.
    fn byte_size(&self) -> usize;

    /// Append this value's serialized bytes to `dst`.
    fn write_to(&self, dst: &mut BytesMut) -> Result<(), prost::EncodeError>;

    /// Upcast for concrete-type inspection.
    fn as_any(&self) -> &dyn Any;

    /// Value equality across the type-erasure boundary.
    fn dyn_eq(&self, other: &dyn PayloadMessage) -> bool;

    /// Clone into a new boxed value.
    fn dyn_clone(&self) -> Box<dyn PayloadMessage>;
}

impl<M> PayloadMessage for M
where
    M: prost::Message + PartialEq + Clone + 'static + fmt::Debug,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn byte_size(&self) -> usize {
        self.encoded_len()
    }

    fn write_to(&self, dst: &mut BytesMut) -> Result<(), prost::EncodeError> {
        self.encode(dst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn PayloadMessage) -> bool {
        other
            .as_any()
            .downcast_ref::<M>()
            .is_some_and(|other| other == self)
    }

    fn dyn_clone(&self) -> Box<dyn PayloadMessage> {
        Box::new(self.clone())
    }
}

/// Owned, type-erased payload value.
pub type BoxedPayload = Box<dyn PayloadMessage>;

impl Clone for BoxedPayload {
    fn clone(&self) -> Self {
        self.dyn_clone()
    }
}

impl PartialEq for dyn PayloadMessage {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

/// One envelope payload slot.
///
/// A slot's wire form always records a type index and byte length per
/// contained item — including the null sentinel — which is what lets readers
/// skip items they don't understand without losing the frame.
#[derive(Debug, Clone)]
pub enum PayloadSlot {
    /// No value.
    Null,
    /// A single opaque value.
    Single(BoxedPayload),
    /// An ordered list of opaque values, each individually nullable.
    List(Vec<Option<BoxedPayload>>),
}

impl PayloadSlot {
    /// Wrap a single value.
    pub fn single<M: PayloadMessage>(value: M) -> Self {
        Self::Single(Box::new(value))
    }

    /// Wrap an ordered list of optional values.
    pub fn list(values: impl IntoIterator<Item = Option<BoxedPayload>>) -> Self {
        Self::List(values.into_iter().collect())
    }

    /// True for the null slot.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the single value, if this slot holds exactly one.
    pub fn as_single(&self) -> Option<&dyn PayloadMessage> {
        match self {
            Self::Single(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Non-null contained values in wire order.
    pub fn values(&self) -> Vec<&dyn PayloadMessage> {
        match self {
            Self::Null => Vec::new(),
            Self::Single(value) => vec![value.as_ref()],
            Self::List(items) => items.iter().filter_map(|item| item.as_deref()).collect(),
        }
    }
}

impl PartialEq for PayloadSlot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Single(a), Self::Single(b)) => a.dyn_eq(b.as_ref()),
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| match (x, y) {
                        (None, None) => true,
                        (Some(x), Some(y)) => x.dyn_eq(y.as_ref()),
                        _ => false,
                    })
            }
            _ => false,
        }
    }
}
