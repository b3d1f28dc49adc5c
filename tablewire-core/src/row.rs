//! Typed rows and their wire format.
//!
//! Row record payload:
//!
//! ```text
//! [value_count:2] ( [type_tag:1][data] )*
//! ```
//!
//! Values are self-describing; the schema in effect supplies column names
//! and the expected value count. Data per tag:
//!
//! - `0x00` null: no data
//! - `0x01` int64, `0x02` uint64: 8 bytes big-endian
//! - `0x03` double: 8 bytes, IEEE 754 bits big-endian
//! - `0x04` boolean: 1 byte
//! - `0x05` string / `0x06` any: `[len:4][bytes]`

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{check_len, take_u16, take_u32, take_u64, take_u8, WireError};

mod value_tag {
    pub const NULL: u8 = 0x00;
    pub const INT64: u8 = 0x01;
    pub const UINT64: u8 = 0x02;
    pub const DOUBLE: u8 = 0x03;
    pub const BOOLEAN: u8 = 0x04;
    pub const STRING: u8 = 0x05;
    pub const ANY: u8 = 0x06;
}

/// A single decoded value.
///
/// String and opaque payloads share storage with the chunk they were
/// decoded from; cloning a [`Value`] never copies the bytes.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    Uint64(u64),
    Double(f64),
    Boolean(bool),
    String(Bytes),
    /// An arbitrary serialized value, passed through uninterpreted.
    Any(Bytes),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A fixed-shape typed record, consistent with the schema in effect at the
/// moment it was decoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values; always equals the arity of the schema the row was
    /// decoded under.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Encode this row as a record payload.
    ///
    /// Fails when the row holds more values than the count prefix can
    /// express, or a byte value is too long for its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        check_len(self.values.len(), u16::MAX as usize, "row value count")?;
        let mut buf = BytesMut::new();
        buf.put_u16(self.values.len() as u16);
        for value in &self.values {
            match value {
                Value::Null => buf.put_u8(value_tag::NULL),
                Value::Int64(v) => {
                    buf.put_u8(value_tag::INT64);
                    buf.put_i64(*v);
                }
                Value::Uint64(v) => {
                    buf.put_u8(value_tag::UINT64);
                    buf.put_u64(*v);
                }
                Value::Double(v) => {
                    buf.put_u8(value_tag::DOUBLE);
                    buf.put_u64(v.to_bits());
                }
                Value::Boolean(v) => {
                    buf.put_u8(value_tag::BOOLEAN);
                    buf.put_u8(*v as u8);
                }
                Value::String(v) => {
                    check_len(v.len(), u32::MAX as usize, "string value")?;
                    buf.put_u8(value_tag::STRING);
                    buf.put_u32(v.len() as u32);
                    buf.put_slice(v);
                }
                Value::Any(v) => {
                    check_len(v.len(), u32::MAX as usize, "opaque value")?;
                    buf.put_u8(value_tag::ANY);
                    buf.put_u32(v.len() as u32);
                    buf.put_slice(v);
                }
            }
        }
        Ok(buf.to_vec())
    }

    /// Decode a record payload into a row. Trailing bytes are an error.
    ///
    /// Takes the payload as [`Bytes`] so byte-valued fields can share its
    /// storage instead of copying.
    pub fn decode(payload: &Bytes) -> Result<Row, WireError> {
        let mut buf: &[u8] = payload;
        let count = take_u16(&mut buf, "row value count")? as usize;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = take_u8(&mut buf, "value tag")?;
            let value = match tag {
                value_tag::NULL => Value::Null,
                value_tag::INT64 => Value::Int64(take_u64(&mut buf, "int64 value")? as i64),
                value_tag::UINT64 => Value::Uint64(take_u64(&mut buf, "uint64 value")?),
                value_tag::DOUBLE => {
                    Value::Double(f64::from_bits(take_u64(&mut buf, "double value")?))
                }
                value_tag::BOOLEAN => Value::Boolean(take_u8(&mut buf, "boolean value")? != 0),
                value_tag::STRING | value_tag::ANY => {
                    let len = take_u32(&mut buf, "value length")? as usize;
                    if buf.len() < len {
                        return Err(WireError::Truncated {
                            what: "value bytes",
                            expected: len,
                            actual: buf.len(),
                        });
                    }
                    // Re-slice out of the refcounted payload, no copy.
                    let start = payload.len() - buf.len();
                    let bytes = payload.slice(start..start + len);
                    buf = &buf[len..];
                    if tag == value_tag::STRING {
                        Value::String(bytes)
                    } else {
                        Value::Any(bytes)
                    }
                }
                other => return Err(WireError::UnknownValueTag(other)),
            };
            values.push(value);
        }
        if !buf.is_empty() {
            return Err(WireError::Corrupt(format!(
                "{} trailing bytes after row payload",
                buf.len()
            )));
        }
        Ok(Row { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::new(vec![
            Value::String(Bytes::from_static(b"alpha")),
            Value::Int64(-7),
            Value::Uint64(42),
            Value::Double(2.5),
            Value::Boolean(true),
            Value::Null,
            Value::Any(Bytes::from_static(b"{\"k\":1}")),
        ])
    }

    #[test]
    fn test_row_roundtrip() {
        let row = sample_row();
        let payload = Bytes::from(row.encode().unwrap());
        assert_eq!(Row::decode(&payload).unwrap(), row);
    }

    #[test]
    fn test_row_decode_shares_payload_storage() {
        let payload = Bytes::from(sample_row().encode().unwrap());
        let row = Row::decode(&payload).unwrap();
        let Value::String(s) = &row.values()[0] else {
            panic!("expected string value");
        };
        // Same backing allocation, not a copy.
        let payload_range = payload.as_ptr() as usize..payload.as_ptr() as usize + payload.len();
        assert!(payload_range.contains(&(s.as_ptr() as usize)));
    }

    #[test]
    fn test_row_decode_truncated_value() {
        let payload = sample_row().encode().unwrap();
        let payload = Bytes::copy_from_slice(&payload[..payload.len() - 3]);
        assert!(matches!(
            Row::decode(&payload).unwrap_err(),
            WireError::Truncated { .. }
        ));
    }

    #[test]
    fn test_row_decode_unknown_tag() {
        let payload = Bytes::from_static(&[0x00, 0x01, 0x7f]);
        assert_eq!(
            Row::decode(&payload).unwrap_err(),
            WireError::UnknownValueTag(0x7f)
        );
    }

    #[test]
    fn test_row_decode_trailing_bytes() {
        let mut payload = sample_row().encode().unwrap();
        payload.push(0xff);
        assert!(matches!(
            Row::decode(&Bytes::from(payload)).unwrap_err(),
            WireError::Corrupt(_)
        ));
    }

    #[test]
    fn test_empty_row() {
        let row = Row::new(vec![]);
        let payload = Bytes::from(row.encode().unwrap());
        assert_eq!(Row::decode(&payload).unwrap(), row);
    }

    #[test]
    fn test_row_encode_rejects_too_many_values() {
        let row = Row::new(vec![Value::Null; u16::MAX as usize + 1]);
        assert!(matches!(
            row.encode().unwrap_err(),
            WireError::TooLong { .. }
        ));
    }
}
