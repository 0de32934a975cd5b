//! Wire format descriptors and payload packing
//!
//! Each device function describes its request and response payload with a
//! compact format string, e.g. `"H B H B H H ?432"`: whitespace-separated
//! tokens of a type character plus an optional repeat count. Scalars are
//! little-endian, strings are NUL-padded to their declared size, and bool
//! arrays are packed LSB-first into bitmask bytes (`?432` occupies 54
//! bytes on the wire).

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WireError {
    #[error("Unknown wire format character {0:?}")]
    UnknownFormat(char),
    #[error("Invalid repeat count in format token {0:?}")]
    BadCount(String),
    #[error("Format expects {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Value does not match wire kind {expected:?}")]
    KindMismatch { expected: FieldKind },
    #[error("Array field expects {expected} elements, got {got}")]
    ArrayLength { expected: usize, got: usize },
    #[error("Payload truncated: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
}

/// Type of a single wire field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `c` - single ASCII character
    Char,
    /// `b` - signed 8-bit integer
    Int8,
    /// `B` - unsigned 8-bit integer
    Uint8,
    /// `h` - signed 16-bit integer
    Int16,
    /// `H` - unsigned 16-bit integer
    Uint16,
    /// `i` - signed 32-bit integer
    Int32,
    /// `I` - unsigned 32-bit integer
    Uint32,
    /// `q` - signed 64-bit integer
    Int64,
    /// `Q` - unsigned 64-bit integer
    Uint64,
    /// `f` - 32-bit float
    Float,
    /// `?` - boolean; arrays are packed as bitmask bytes
    Bool,
    /// `s` - fixed-size NUL-padded string
    Str,
}

impl FieldKind {
    fn from_char(c: char) -> Result<Self, WireError> {
        match c {
            'c' => Ok(Self::Char),
            'b' => Ok(Self::Int8),
            'B' => Ok(Self::Uint8),
            'h' => Ok(Self::Int16),
            'H' => Ok(Self::Uint16),
            'i' => Ok(Self::Int32),
            'I' => Ok(Self::Uint32),
            'q' => Ok(Self::Int64),
            'Q' => Ok(Self::Uint64),
            'f' => Ok(Self::Float),
            '?' => Ok(Self::Bool),
            's' => Ok(Self::Str),
            other => Err(WireError::UnknownFormat(other)),
        }
    }

    /// Wire size of one scalar of this kind
    fn scalar_len(&self) -> usize {
        match self {
            Self::Char | Self::Int8 | Self::Uint8 | Self::Bool | Self::Str => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float => 4,
            Self::Int64 | Self::Uint64 => 8,
        }
    }
}

/// One field of a wire format: a kind plus a repeat count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub count: usize,
}

impl FieldSpec {
    /// Bytes this field occupies on the wire
    pub fn wire_len(&self) -> usize {
        match self.kind {
            FieldKind::Bool if self.count > 1 => (self.count + 7) / 8,
            FieldKind::Str => self.count,
            kind => kind.scalar_len() * self.count,
        }
    }
}

/// Parsed wire format for one payload direction of one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    fields: Vec<FieldSpec>,
}

impl FormatDescriptor {
    /// Parse a format string like `"H B H B H H ?432"`
    pub fn parse(format: &str) -> Result<Self, WireError> {
        let mut fields = Vec::new();

        for token in format.split_whitespace() {
            let mut chars = token.chars();
            let kind = FieldKind::from_char(
                chars.next().ok_or_else(|| WireError::BadCount(token.to_string()))?,
            )?;
            let rest = chars.as_str();
            let count = if rest.is_empty() {
                1
            } else {
                rest.parse::<usize>()
                    .ok()
                    .filter(|&c| c > 0)
                    .ok_or_else(|| WireError::BadCount(token.to_string()))?
            };
            fields.push(FieldSpec { kind, count });
        }

        Ok(Self { fields })
    }

    /// Format with no payload
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Total payload size in bytes
    pub fn wire_len(&self) -> usize {
        self.fields.iter().map(FieldSpec::wire_len).sum()
    }
}

/// A typed payload value, one per format field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Char(char),
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Bool(bool),
    String(String),
    /// Repeat-count fields (other than strings) carry their elements here
    Array(Vec<Value>),
}

impl Value {
    /// Extract an unsigned 16-bit value
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::Uint16(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract any unsigned integer as usize
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Uint8(v) => Some(*v as usize),
            Value::Uint16(v) => Some(*v as usize),
            Value::Uint32(v) => Some(*v as usize),
            Value::Uint64(v) => Some(*v as usize),
            _ => None,
        }
    }
}

/// Pack one value per format field into a payload
pub fn pack(values: &[Value], format: &FormatDescriptor) -> Result<Vec<u8>, WireError> {
    if values.len() != format.fields().len() {
        return Err(WireError::ArityMismatch {
            expected: format.fields().len(),
            got: values.len(),
        });
    }

    let mut out = Vec::with_capacity(format.wire_len());

    for (value, spec) in values.iter().zip(format.fields()) {
        match (spec.kind, spec.count) {
            (FieldKind::Str, count) => {
                let s = match value {
                    Value::String(s) => s,
                    _ => return Err(WireError::KindMismatch { expected: FieldKind::Str }),
                };
                let bytes = s.as_bytes();
                if bytes.len() > count {
                    return Err(WireError::ArrayLength {
                        expected: count,
                        got: bytes.len(),
                    });
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + count - bytes.len(), 0);
            }
            (FieldKind::Bool, count) if count > 1 => {
                let items = expect_array(value, count)?;
                let mut bits = vec![0u8; (count + 7) / 8];
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Bool(true) => bits[i / 8] |= 1 << (i % 8),
                        Value::Bool(false) => {}
                        _ => return Err(WireError::KindMismatch { expected: FieldKind::Bool }),
                    }
                }
                out.extend_from_slice(&bits);
            }
            (kind, 1) => pack_scalar(&mut out, value, kind)?,
            (kind, count) => {
                let items = expect_array(value, count)?;
                for item in items {
                    pack_scalar(&mut out, item, kind)?;
                }
            }
        }
    }

    Ok(out)
}

/// Unpack a payload into one value per format field
pub fn unpack(payload: &[u8], format: &FormatDescriptor) -> Result<Vec<Value>, WireError> {
    let needed = format.wire_len();
    if payload.len() < needed {
        return Err(WireError::Truncated {
            needed,
            got: payload.len(),
        });
    }

    let mut values = Vec::with_capacity(format.fields().len());
    let mut cursor = 0usize;

    for spec in format.fields() {
        match (spec.kind, spec.count) {
            (FieldKind::Str, count) => {
                let bytes = &payload[cursor..cursor + count];
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(count);
                values.push(Value::String(
                    String::from_utf8_lossy(&bytes[..end]).into_owned(),
                ));
                cursor += count;
            }
            (FieldKind::Bool, count) if count > 1 => {
                let bits = &payload[cursor..cursor + (count + 7) / 8];
                let items = (0..count)
                    .map(|i| Value::Bool(bits[i / 8] & (1 << (i % 8)) != 0))
                    .collect();
                values.push(Value::Array(items));
                cursor += (count + 7) / 8;
            }
            (kind, 1) => {
                values.push(unpack_scalar(payload, &mut cursor, kind));
            }
            (kind, count) => {
                let items = (0..count)
                    .map(|_| unpack_scalar(payload, &mut cursor, kind))
                    .collect();
                values.push(Value::Array(items));
            }
        }
    }

    Ok(values)
}

fn expect_array(value: &Value, count: usize) -> Result<&[Value], WireError> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        _ => {
            return Err(WireError::ArrayLength {
                expected: count,
                got: 1,
            })
        }
    };
    if items.len() != count {
        return Err(WireError::ArrayLength {
            expected: count,
            got: items.len(),
        });
    }
    Ok(items)
}

fn pack_scalar(out: &mut Vec<u8>, value: &Value, kind: FieldKind) -> Result<(), WireError> {
    match (kind, value) {
        (FieldKind::Char, Value::Char(c)) => {
            // the wire carries single bytes; wider chars cannot be encoded
            if !c.is_ascii() {
                return Err(WireError::KindMismatch {
                    expected: FieldKind::Char,
                });
            }
            out.push(*c as u8);
        }
        (FieldKind::Int8, Value::Int8(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Uint8, Value::Uint8(v)) => out.push(*v),
        (FieldKind::Int16, Value::Int16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Uint16, Value::Uint16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Int32, Value::Int32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Uint32, Value::Uint32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Int64, Value::Int64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Uint64, Value::Uint64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Float, Value::Float(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::Bool, Value::Bool(v)) => out.push(*v as u8),
        (expected, _) => return Err(WireError::KindMismatch { expected }),
    }
    Ok(())
}

fn unpack_scalar(payload: &[u8], cursor: &mut usize, kind: FieldKind) -> Value {
    // bounds were validated up front via wire_len
    let at = *cursor;
    *cursor += kind.scalar_len();
    match kind {
        FieldKind::Char => Value::Char(payload[at] as char),
        FieldKind::Int8 => Value::Int8(payload[at] as i8),
        FieldKind::Uint8 => Value::Uint8(payload[at]),
        FieldKind::Int16 => Value::Int16(i16::from_le_bytes([payload[at], payload[at + 1]])),
        FieldKind::Uint16 => Value::Uint16(u16::from_le_bytes([payload[at], payload[at + 1]])),
        FieldKind::Int32 => Value::Int32(i32::from_le_bytes([
            payload[at],
            payload[at + 1],
            payload[at + 2],
            payload[at + 3],
        ])),
        FieldKind::Uint32 => Value::Uint32(u32::from_le_bytes([
            payload[at],
            payload[at + 1],
            payload[at + 2],
            payload[at + 3],
        ])),
        FieldKind::Int64 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&payload[at..at + 8]);
            Value::Int64(i64::from_le_bytes(bytes))
        }
        FieldKind::Uint64 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&payload[at..at + 8]);
            Value::Uint64(u64::from_le_bytes(bytes))
        }
        FieldKind::Float => Value::Float(f32::from_le_bytes([
            payload[at],
            payload[at + 1],
            payload[at + 2],
            payload[at + 3],
        ])),
        FieldKind::Bool => Value::Bool(payload[at] != 0),
        FieldKind::Str => Value::String((payload[at] as char).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        let format = FormatDescriptor::parse("H B H B H H ?432").unwrap();
        assert_eq!(format.fields().len(), 7);
        assert_eq!(
            format.fields()[6],
            FieldSpec {
                kind: FieldKind::Bool,
                count: 432
            }
        );
        // 2 + 1 + 2 + 1 + 2 + 2 + 54
        assert_eq!(format.wire_len(), 64);
    }

    #[test]
    fn test_parse_empty_format() {
        let format = FormatDescriptor::parse("").unwrap();
        assert_eq!(format, FormatDescriptor::empty());
        assert_eq!(format.wire_len(), 0);
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert_eq!(
            FormatDescriptor::parse("x"),
            Err(WireError::UnknownFormat('x'))
        );
        assert!(matches!(
            FormatDescriptor::parse("H0"),
            Err(WireError::BadCount(_))
        ));
        assert!(matches!(
            FormatDescriptor::parse("Habc"),
            Err(WireError::BadCount(_))
        ));
    }

    #[test]
    fn test_scalar_round_trip() {
        let format = FormatDescriptor::parse("b B h H i I q Q f ? c").unwrap();
        let values = vec![
            Value::Int8(-5),
            Value::Uint8(200),
            Value::Int16(-12345),
            Value::Uint16(54321),
            Value::Int32(-100000),
            Value::Uint32(4000000000),
            Value::Int64(-1),
            Value::Uint64(u64::MAX),
            Value::Float(1.5),
            Value::Bool(true),
            Value::Char('A'),
        ];
        let payload = pack(&values, &format).unwrap();
        assert_eq!(payload.len(), format.wire_len());
        assert_eq!(unpack(&payload, &format).unwrap(), values);
    }

    #[test]
    fn test_bool_array_bitmask() {
        let format = FormatDescriptor::parse("?9").unwrap();
        let mut bools = vec![Value::Bool(false); 9];
        bools[0] = Value::Bool(true);
        bools[3] = Value::Bool(true);
        bools[8] = Value::Bool(true);

        let payload = pack(&[Value::Array(bools.clone())], &format).unwrap();
        // LSB-first: bits 0 and 3 in the first byte, bit 8 in the second
        assert_eq!(payload, vec![0b0000_1001, 0b0000_0001]);
        assert_eq!(
            unpack(&payload, &format).unwrap(),
            vec![Value::Array(bools)]
        );
    }

    #[test]
    fn test_u16_array_round_trip() {
        let format = FormatDescriptor::parse("H4").unwrap();
        let values = vec![Value::Array(vec![
            Value::Uint16(1),
            Value::Uint16(0x1234),
            Value::Uint16(0),
            Value::Uint16(u16::MAX),
        ])];
        let payload = pack(&values, &format).unwrap();
        assert_eq!(payload.len(), 8);
        assert_eq!(payload[2..4], [0x34, 0x12]);
        assert_eq!(unpack(&payload, &format).unwrap(), values);
    }

    #[test]
    fn test_string_padding() {
        let format = FormatDescriptor::parse("s8").unwrap();
        let payload = pack(&[Value::String("abc".to_string())], &format).unwrap();
        assert_eq!(payload, b"abc\0\0\0\0\0");
        assert_eq!(
            unpack(&payload, &format).unwrap(),
            vec![Value::String("abc".to_string())]
        );
    }

    #[test]
    fn test_string_too_long() {
        let format = FormatDescriptor::parse("s2").unwrap();
        assert!(matches!(
            pack(&[Value::String("abc".to_string())], &format),
            Err(WireError::ArrayLength { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let format = FormatDescriptor::parse("H H").unwrap();
        assert_eq!(
            pack(&[Value::Uint16(1)], &format),
            Err(WireError::ArityMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_char_must_be_ascii() {
        let format = FormatDescriptor::parse("c").unwrap();
        assert_eq!(
            pack(&[Value::Char('é')], &format),
            Err(WireError::KindMismatch {
                expected: FieldKind::Char
            })
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let format = FormatDescriptor::parse("H").unwrap();
        assert_eq!(
            pack(&[Value::Bool(true)], &format),
            Err(WireError::KindMismatch {
                expected: FieldKind::Uint16
            })
        );
    }

    #[test]
    fn test_array_length_mismatch() {
        let format = FormatDescriptor::parse("B3").unwrap();
        assert_eq!(
            pack(
                &[Value::Array(vec![Value::Uint8(1), Value::Uint8(2)])],
                &format
            ),
            Err(WireError::ArrayLength {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_unpack_truncated() {
        let format = FormatDescriptor::parse("I").unwrap();
        assert_eq!(
            unpack(&[1, 2], &format),
            Err(WireError::Truncated { needed: 4, got: 2 })
        );
    }
}
