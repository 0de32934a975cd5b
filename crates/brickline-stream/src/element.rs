//! Stream payload element types
//!
//! Streamed payloads are sequences of one element type per function:
//! booleans for pixel buffers, bytes for data streams, 16-bit samples
//! for measurement streams. The engine stays generic over the element
//! and maps it to the wire through these conversions.

use brickline_core::{FieldKind, Value, WireError};

/// An element type a stream payload is made of
pub trait StreamElement: Copy + PartialEq + Send + Sync + 'static {
    /// Value used to pad the final short chunk up to the chunk length
    const FILLER: Self;
    /// Wire kind of a single element
    const KIND: FieldKind;

    fn to_value(self) -> Value;
    fn from_value(value: &Value) -> Result<Self, WireError>;

    /// Pack a whole chunk as the wire array value
    fn pack_chunk(items: &[Self]) -> Value {
        Value::Array(items.iter().map(|item| item.to_value()).collect())
    }

    /// Unpack a wire array value into elements
    fn unpack_chunk(value: &Value) -> Result<Vec<Self>, WireError> {
        match value {
            Value::Array(items) => items.iter().map(Self::from_value).collect(),
            _ => Err(WireError::KindMismatch {
                expected: Self::KIND,
            }),
        }
    }
}

impl StreamElement for bool {
    const FILLER: Self = false;
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Result<Self, WireError> {
        match value {
            Value::Bool(v) => Ok(*v),
            _ => Err(WireError::KindMismatch {
                expected: Self::KIND,
            }),
        }
    }
}

impl StreamElement for u8 {
    const FILLER: Self = 0;
    const KIND: FieldKind = FieldKind::Uint8;

    fn to_value(self) -> Value {
        Value::Uint8(self)
    }

    fn from_value(value: &Value) -> Result<Self, WireError> {
        match value {
            Value::Uint8(v) => Ok(*v),
            _ => Err(WireError::KindMismatch {
                expected: Self::KIND,
            }),
        }
    }
}

impl StreamElement for u16 {
    const FILLER: Self = 0;
    const KIND: FieldKind = FieldKind::Uint16;

    fn to_value(self) -> Value {
        Value::Uint16(self)
    }

    fn from_value(value: &Value) -> Result<Self, WireError> {
        match value {
            Value::Uint16(v) => Ok(*v),
            _ => Err(WireError::KindMismatch {
                expected: Self::KIND,
            }),
        }
    }
}
