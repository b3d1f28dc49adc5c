//! Table schemas and their descriptor wire format.
//!
//! A schema is an ordered sequence of `(name, type)` columns. The schema in
//! effect may change between chunks of one read when the underlying table's
//! schema evolves; the decoder always holds the most recently observed one.
//!
//! Descriptor payload:
//!
//! ```text
//! [column_count:2] ( [name_len:2][name][type:1] )*
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{check_len, take, take_u16, take_u8, WireError};

/// Type of a single column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Uint64,
    Double,
    Boolean,
    String,
    /// An arbitrary serialized value, opaque to this layer.
    Any,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Uint64 => "uint64",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
            ColumnType::Any => "any",
        }
    }

    fn to_tag(self) -> u8 {
        match self {
            ColumnType::Int64 => 0x01,
            ColumnType::Uint64 => 0x02,
            ColumnType::Double => 0x03,
            ColumnType::Boolean => 0x04,
            ColumnType::String => 0x05,
            ColumnType::Any => 0x06,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, WireError> {
        match tag {
            0x01 => Ok(ColumnType::Int64),
            0x02 => Ok(ColumnType::Uint64),
            0x03 => Ok(ColumnType::Double),
            0x04 => Ok(ColumnType::Boolean),
            0x05 => Ok(ColumnType::String),
            0x06 => Ok(ColumnType::Any),
            other => Err(WireError::UnknownColumnType(other)),
        }
    }
}

/// One column of a table schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new<S: Into<String>>(name: S, column_type: ColumnType) -> Self {
        ColumnSchema {
            name: name.into(),
            column_type,
        }
    }
}

/// An ordered sequence of columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        TableSchema { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Encode this schema as a descriptor payload.
    ///
    /// Fails when the column count or a column name is too long for its
    /// length prefix.
    pub fn encode_descriptor(&self) -> Result<Vec<u8>, WireError> {
        check_len(self.columns.len(), u16::MAX as usize, "schema column count")?;
        let mut buf = BytesMut::new();
        buf.put_u16(self.columns.len() as u16);
        for column in &self.columns {
            check_len(column.name.len(), u16::MAX as usize, "column name")?;
            buf.put_u16(column.name.len() as u16);
            buf.put_slice(column.name.as_bytes());
            buf.put_u8(column.column_type.to_tag());
        }
        Ok(buf.to_vec())
    }

    /// Decode a descriptor payload. Trailing bytes are an error.
    pub fn decode_descriptor(payload: &[u8]) -> Result<TableSchema, WireError> {
        let mut buf = payload;
        let count = take_u16(&mut buf, "schema column count")? as usize;
        let mut columns = Vec::with_capacity(count);
        for _ in 0..count {
            let name_len = take_u16(&mut buf, "column name")? as usize;
            let name = String::from_utf8(take(&mut buf, name_len, "column name")?.to_vec())
                .map_err(|_| WireError::InvalidUtf8("column name"))?;
            let column_type = ColumnType::from_tag(take_u8(&mut buf, "column type")?)?;
            columns.push(ColumnSchema { name, column_type });
        }
        if !buf.is_empty() {
            return Err(WireError::Corrupt(format!(
                "{} trailing bytes after schema descriptor",
                buf.len()
            )));
        }
        Ok(TableSchema { columns })
    }
}
