//! Incremental decoding of attachment chunks into rows.
//!
//! This module provides:
//! - [`AttachmentDecoder`]: the interface both decoder variants conform to.
//! - [`RowsetDecoder`]: the typed variant. Interprets the record stream,
//!   tracks the current read schema and cumulative statistics, and carries
//!   partial trailing records across chunk boundaries.
//! - [`PassthroughDecoder`]: the opaque variant. Each data chunk is one
//!   "row" of raw bytes; nothing is interpreted.
//!
//! One decoder instance serves exactly one exchange. It is a sequential
//! state machine: `parse` is never called concurrently for one instance,
//! though any number of exchanges run in parallel with their own decoders.

use bytes::{Bytes, BytesMut};
use tablewire_core::{
    parse_record_header, record_tag, Chunk, DataStatistics, Row, TableSchema,
    RECORD_HEADER_SIZE,
};

use crate::ClientError;

/// Interface shared by both decoder variants.
///
/// [`Chunk::EndOfStream`] is the canonical end-of-stream signal and decodes
/// to `Ok(None)`, distinct from `Ok(Some(vec![]))` for a chunk holding zero
/// complete rows.
pub trait AttachmentDecoder {
    /// What one decoded "row" is for this variant.
    type Item;

    /// Consume one whole chunk.
    ///
    /// Returns `Ok(None)` for end-of-stream, otherwise the rows completed
    /// by this chunk (possibly empty; the stream continues).
    fn parse(&mut self, chunk: Chunk) -> Result<Option<Vec<Self::Item>>, ClientError>;

    /// Range-restricted variant of [`parse`](AttachmentDecoder::parse).
    ///
    /// Decodes only `offset..offset + length` of the chunk. The sub-range
    /// shares the chunk's buffer; nothing is copied. When the range covers
    /// the whole chunk this is identical to `parse`.
    fn parse_range(
        &mut self,
        chunk: Chunk,
        offset: usize,
        length: usize,
    ) -> Result<Option<Vec<Self::Item>>, ClientError> {
        match chunk {
            Chunk::EndOfStream => self.parse(Chunk::EndOfStream),
            Chunk::Data(bytes) => {
                if offset == 0 && length == bytes.len() {
                    return self.parse(Chunk::Data(bytes));
                }
                let end = offset.checked_add(length).filter(|&end| end <= bytes.len());
                let Some(end) = end else {
                    return Err(ClientError::Validation(format!(
                        "range {offset}..+{length} out of bounds for a {} byte chunk",
                        bytes.len()
                    )));
                };
                self.parse(Chunk::Data(bytes.slice(offset..end)))
            }
        }
    }

    /// Cumulative count of rows returned by `parse` so far.
    fn total_row_count(&self) -> u64;

    /// Latest statistics snapshot reported by the producer, if any.
    fn data_statistics(&self) -> Option<DataStatistics>;

    /// The schema in effect for the most recently decoded rows, if any has
    /// been observed.
    fn current_read_schema(&self) -> Option<&TableSchema>;
}

/// Typed decoder: turns the record stream into [`Row`]s.
///
/// Record boundaries are independent of chunk boundaries; undecoded
/// trailing bytes are copied into a carry-over buffer and prepended to the
/// next chunk, so no reference into a transport buffer outlives the `parse`
/// call. A partially decoded row is never emitted.
///
/// Schema and statistics descriptors are consumed out of the row stream and
/// update decoder state independently of each other.
#[derive(Debug, Default)]
pub struct RowsetDecoder {
    carry: BytesMut,
    schema: Option<TableSchema>,
    statistics: Option<DataStatistics>,
    total_rows: u64,
}

impl RowsetDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of an incomplete trailing record awaiting continuation.
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }

    fn parse_data(&mut self, bytes: Bytes) -> Result<Vec<Row>, ClientError> {
        // Prepend carried-over bytes from the previous chunk, if any. The
        // carry is owned by the decoder, so transport buffers can be reused
        // as soon as this call returns.
        let buf: Bytes = if self.carry.is_empty() {
            bytes
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(&bytes);
            joined.freeze()
        };

        let mut rows = Vec::new();
        let mut pos = 0;
        while let Some((tag, length)) = parse_record_header(&buf[pos..])? {
            let body_start = pos + RECORD_HEADER_SIZE;
            if buf.len() - body_start < length {
                // Record continues in the next chunk.
                break;
            }
            let payload = buf.slice(body_start..body_start + length);
            pos = body_start + length;

            match tag {
                record_tag::ROW => {
                    let Some(schema) = &self.schema else {
                        return Err(ClientError::SchemaMismatch(
                            "row record before any schema descriptor".into(),
                        ));
                    };
                    let row = Row::decode(&payload)?;
                    if row.len() != schema.len() {
                        return Err(ClientError::SchemaMismatch(format!(
                            "row has {} values but the current schema has {} columns",
                            row.len(),
                            schema.len()
                        )));
                    }
                    self.total_rows += 1;
                    rows.push(row);
                }
                record_tag::SCHEMA => {
                    self.schema = Some(TableSchema::decode_descriptor(&payload)?);
                }
                record_tag::STATISTICS => {
                    let statistics = DataStatistics::decode(&payload)?;
                    if let Some(previous) = &self.statistics {
                        if statistics.regressed_from(previous) {
                            tracing::warn!(
                                ?statistics,
                                ?previous,
                                "cumulative statistics went backwards"
                            );
                        }
                    }
                    self.statistics = Some(statistics);
                }
                other => {
                    // parse_record_header already rejects unknown tags.
                    return Err(ClientError::CorruptStream(format!(
                        "unexpected record tag 0x{other:02x}"
                    )));
                }
            }
        }

        if pos < buf.len() {
            self.carry.extend_from_slice(&buf[pos..]);
        }
        Ok(rows)
    }
}

impl AttachmentDecoder for RowsetDecoder {
    type Item = Row;

    fn parse(&mut self, chunk: Chunk) -> Result<Option<Vec<Row>>, ClientError> {
        match chunk {
            Chunk::EndOfStream => {
                if !self.carry.is_empty() {
                    tracing::warn!(
                        pending = self.carry.len(),
                        "stream ended with an incomplete trailing record"
                    );
                }
                Ok(None)
            }
            Chunk::Data(bytes) => self.parse_data(bytes).map(Some),
        }
    }

    fn total_row_count(&self) -> u64 {
        self.total_rows
    }

    fn data_statistics(&self) -> Option<DataStatistics> {
        self.statistics
    }

    fn current_read_schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }
}

/// Pass-through decoder: each data chunk is one opaque item of raw bytes.
///
/// It interprets no row boundaries, so the row count stays zero and schema
/// and statistics are always absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughDecoder;

impl PassthroughDecoder {
    pub fn new() -> Self {
        PassthroughDecoder
    }
}

impl AttachmentDecoder for PassthroughDecoder {
    type Item = Bytes;

    fn parse(&mut self, chunk: Chunk) -> Result<Option<Vec<Bytes>>, ClientError> {
        match chunk {
            Chunk::EndOfStream => Ok(None),
            Chunk::Data(bytes) => Ok(Some(vec![bytes])),
        }
    }

    fn total_row_count(&self) -> u64 {
        0
    }

    fn data_statistics(&self) -> Option<DataStatistics> {
        None
    }

    fn current_read_schema(&self) -> Option<&TableSchema> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewire_core::{
        wrap_record, ColumnSchema, ColumnType, Value, MAX_RECORD_BYTES,
    };

    fn schema(columns: usize) -> TableSchema {
        TableSchema::new(
            (0..columns)
                .map(|i| ColumnSchema::new(format!("col{i}"), ColumnType::Int64))
                .collect(),
        )
    }

    fn schema_record(columns: usize) -> Vec<u8> {
        wrap_record(record_tag::SCHEMA, &schema(columns).encode_descriptor().unwrap())
    }

    fn row_record(values: &[i64]) -> Vec<u8> {
        let row = Row::new(values.iter().copied().map(Value::Int64).collect());
        wrap_record(record_tag::ROW, &row.encode().unwrap())
    }

    fn statistics_record(statistics: &DataStatistics) -> Vec<u8> {
        wrap_record(record_tag::STATISTICS, &statistics.encode())
    }

    fn data(stream: Vec<u8>) -> Chunk {
        Chunk::Data(Bytes::from(stream))
    }

    #[test]
    fn test_end_of_stream_is_none_for_both_variants() {
        let mut typed = RowsetDecoder::new();
        assert_eq!(typed.parse(Chunk::EndOfStream).unwrap(), None);

        let mut stream = schema_record(1);
        stream.extend(row_record(&[1]));
        typed.parse(data(stream)).unwrap();
        // Regardless of prior state.
        assert_eq!(typed.parse(Chunk::EndOfStream).unwrap(), None);

        let mut passthrough = PassthroughDecoder::new();
        assert_eq!(passthrough.parse(Chunk::EndOfStream).unwrap(), None);
    }

    #[test]
    fn test_empty_chunk_yields_zero_rows_and_stream_continues() {
        let mut decoder = RowsetDecoder::new();
        assert_eq!(decoder.parse(data(vec![])).unwrap(), Some(vec![]));

        let mut stream = schema_record(1);
        stream.extend(row_record(&[5]));
        let rows = decoder.parse(data(stream)).unwrap().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_row_counts_across_chunks() {
        let mut decoder = RowsetDecoder::new();

        let mut first = schema_record(1);
        first.extend(row_record(&[1]));
        first.extend(row_record(&[2]));
        let rows = decoder.parse(data(first)).unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(decoder.total_row_count(), 2);

        let rows = decoder.parse(data(vec![])).unwrap().unwrap();
        assert_eq!(rows.len(), 0);
        assert_eq!(decoder.total_row_count(), 2);

        let mut third = row_record(&[3]);
        third.extend(row_record(&[4]));
        third.extend(row_record(&[5]));
        let rows = decoder.parse(data(third)).unwrap().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(decoder.total_row_count(), 5);

        assert_eq!(decoder.parse(Chunk::EndOfStream).unwrap(), None);
        assert_eq!(decoder.total_row_count(), 5);
    }

    #[test]
    fn test_record_split_across_chunks() {
        let mut stream = schema_record(2);
        stream.extend(row_record(&[10, 20]));
        stream.extend(row_record(&[30, 40]));

        // Split mid-record at every possible offset.
        for split in 1..stream.len() {
            let mut decoder = RowsetDecoder::new();
            let whole = Bytes::from(stream.clone());
            let mut rows = Vec::new();
            rows.extend(
                decoder
                    .parse_range(Chunk::Data(whole.clone()), 0, split)
                    .unwrap()
                    .unwrap(),
            );
            rows.extend(
                decoder
                    .parse_range(Chunk::Data(whole.clone()), split, stream.len() - split)
                    .unwrap()
                    .unwrap(),
            );

            let mut reference = RowsetDecoder::new();
            let expected = reference.parse(Chunk::Data(whole)).unwrap().unwrap();
            assert_eq!(rows, expected, "split at {split}");
            assert_eq!(decoder.total_row_count(), 2);
            assert_eq!(decoder.pending_bytes(), 0);
        }
    }

    #[test]
    fn test_parse_range_full_equals_parse() {
        let string_schema = TableSchema::new(vec![ColumnSchema::new("name", ColumnType::String)]);
        let mut stream = wrap_record(
            record_tag::SCHEMA,
            &string_schema.encode_descriptor().unwrap(),
        );
        let row = Row::new(vec![Value::String(Bytes::from_static(b"shared storage"))]);
        stream.extend(wrap_record(record_tag::ROW, &row.encode().unwrap()));
        let bytes = Bytes::from(stream);

        let mut via_parse = RowsetDecoder::new();
        let mut via_range = RowsetDecoder::new();
        let parsed = via_parse.parse(Chunk::Data(bytes.clone())).unwrap();
        let ranged = via_range
            .parse_range(Chunk::Data(bytes.clone()), 0, bytes.len())
            .unwrap();
        assert_eq!(parsed, ranged);

        // The full-range fast path hands the chunk straight through:
        // decoded byte values point into the original allocation.
        let rows = ranged.unwrap();
        let Value::String(value) = &rows[0].values()[0] else {
            panic!("expected string value");
        };
        let chunk_range = bytes.as_ptr() as usize..bytes.as_ptr() as usize + bytes.len();
        assert!(chunk_range.contains(&(value.as_ptr() as usize)));
    }

    #[test]
    fn test_parse_range_out_of_bounds() {
        let mut decoder = RowsetDecoder::new();
        let err = decoder
            .parse_range(Chunk::Data(Bytes::from_static(b"abc")), 2, 5)
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_schema_change_mid_stream() {
        let mut decoder = RowsetDecoder::new();

        let mut first = schema_record(1);
        first.extend(row_record(&[1]));
        decoder.parse(data(first)).unwrap();
        assert_eq!(decoder.current_read_schema(), Some(&schema(1)));

        let mut second = schema_record(2);
        second.extend(row_record(&[2, 3]));
        let rows = decoder.parse(data(second)).unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        // The new schema is visible as soon as parse returns.
        assert_eq!(decoder.current_read_schema(), Some(&schema(2)));
    }

    #[test]
    fn test_row_before_schema_is_mismatch() {
        let mut decoder = RowsetDecoder::new();
        let err = decoder.parse(data(row_record(&[1]))).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch(_)));
    }

    #[test]
    fn test_row_arity_mismatch() {
        let mut decoder = RowsetDecoder::new();
        let mut stream = schema_record(1);
        stream.extend(row_record(&[1, 2]));
        let err = decoder.parse(data(stream)).unwrap_err();
        assert!(matches!(err, ClientError::SchemaMismatch(_)));
    }

    #[test]
    fn test_statistics_update_independent_of_schema() {
        let mut decoder = RowsetDecoder::new();
        assert_eq!(decoder.data_statistics(), None);

        let first = DataStatistics {
            row_count: 2,
            byte_count: 64,
            chunk_count: 1,
            data_weight: 70,
        };
        let mut stream = schema_record(1);
        stream.extend(row_record(&[1]));
        stream.extend(statistics_record(&first));
        stream.extend(row_record(&[2]));
        let rows = decoder.parse(data(stream)).unwrap().unwrap();
        // Descriptors are consumed out of the row stream.
        assert_eq!(rows.len(), 2);
        assert_eq!(decoder.data_statistics(), Some(first));

        // Statistics may change without a schema change, and vice versa.
        let second = DataStatistics {
            row_count: 4,
            ..first
        };
        decoder.parse(data(statistics_record(&second))).unwrap();
        assert_eq!(decoder.data_statistics(), Some(second));
        assert_eq!(decoder.current_read_schema(), Some(&schema(1)));
    }

    #[test]
    fn test_oversized_record_is_corrupt() {
        let mut decoder = RowsetDecoder::new();
        let mut stream = vec![record_tag::ROW];
        stream.extend(((MAX_RECORD_BYTES as u32) + 1).to_be_bytes());
        let err = decoder.parse(data(stream)).unwrap_err();
        assert!(matches!(err, ClientError::CorruptStream(_)));
    }

    #[test]
    fn test_unknown_record_tag_is_corrupt() {
        let mut decoder = RowsetDecoder::new();
        let err = decoder.parse(data(wrap_record(0x7f, b""))).unwrap_err();
        assert!(matches!(err, ClientError::CorruptStream(_)));
    }

    #[test]
    fn test_passthrough_yields_chunk_bytes() {
        let mut decoder = PassthroughDecoder::new();
        let bytes = Bytes::from_static(b"opaque attachment");
        let items = decoder.parse(Chunk::Data(bytes.clone())).unwrap().unwrap();
        assert_eq!(items, vec![bytes]);

        assert_eq!(decoder.total_row_count(), 0);
        assert_eq!(decoder.data_statistics(), None);
        assert_eq!(decoder.current_read_schema(), None);
    }

    #[test]
    fn test_passthrough_range_shares_buffer() {
        let mut decoder = PassthroughDecoder::new();
        let bytes = Bytes::from_static(b"0123456789");
        let items = decoder
            .parse_range(Chunk::Data(bytes.clone()), 2, 5)
            .unwrap()
            .unwrap();
        assert_eq!(items, vec![Bytes::from_static(b"23456")]);
        // Sub-range is a view into the same allocation, not a copy.
        assert_eq!(items[0].as_ptr() as usize, bytes.as_ptr() as usize + 2);
        // Row count never moves for the pass-through variant.
        assert_eq!(decoder.total_row_count(), 0);
    }
}
