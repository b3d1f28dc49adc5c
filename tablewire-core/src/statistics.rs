//! Cumulative read statistics reported by the producer.
//!
//! Descriptor payload: four big-endian u64 counters.
//!
//! ```text
//! [row_count:8][byte_count:8][chunk_count:8][data_weight:8]
//! ```
//!
//! Counters are cumulative for one decode session and monotonically
//! non-decreasing. They are absent entirely when the producer does not
//! report statistics.

use bytes::{BufMut, BytesMut};

use crate::error::{take_u64, WireError};

/// Size of a statistics descriptor payload.
pub const STATISTICS_WIRE_SIZE: usize = 32;

/// A cumulative statistics snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataStatistics {
    pub row_count: u64,
    pub byte_count: u64,
    pub chunk_count: u64,
    pub data_weight: u64,
}

impl DataStatistics {
    /// Encode this snapshot as a descriptor payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(STATISTICS_WIRE_SIZE);
        buf.put_u64(self.row_count);
        buf.put_u64(self.byte_count);
        buf.put_u64(self.chunk_count);
        buf.put_u64(self.data_weight);
        buf.to_vec()
    }

    /// Decode a descriptor payload. Trailing bytes are an error.
    pub fn decode(payload: &[u8]) -> Result<DataStatistics, WireError> {
        let mut buf = payload;
        let statistics = DataStatistics {
            row_count: take_u64(&mut buf, "statistics row count")?,
            byte_count: take_u64(&mut buf, "statistics byte count")?,
            chunk_count: take_u64(&mut buf, "statistics chunk count")?,
            data_weight: take_u64(&mut buf, "statistics data weight")?,
        };
        if !buf.is_empty() {
            return Err(WireError::Corrupt(format!(
                "{} trailing bytes after statistics descriptor",
                buf.len()
            )));
        }
        Ok(statistics)
    }

    /// Whether any counter went backwards relative to `previous`.
    ///
    /// Counters are cumulative, so a regression means the producer is
    /// misbehaving; callers log it rather than failing the exchange.
    pub fn regressed_from(&self, previous: &DataStatistics) -> bool {
        self.row_count < previous.row_count
            || self.byte_count < previous.byte_count
            || self.chunk_count < previous.chunk_count
            || self.data_weight < previous.data_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_roundtrip() {
        let statistics = DataStatistics {
            row_count: 128,
            byte_count: 4096,
            chunk_count: 2,
            data_weight: 5000,
        };
        assert_eq!(
            DataStatistics::decode(&statistics.encode()).unwrap(),
            statistics
        );
    }

    #[test]
    fn test_statistics_decode_truncated() {
        let payload = DataStatistics::default().encode();
        assert!(matches!(
            DataStatistics::decode(&payload[..12]).unwrap_err(),
            WireError::Truncated { .. }
        ));
    }

    #[test]
    fn test_statistics_regression() {
        let earlier = DataStatistics {
            row_count: 10,
            byte_count: 100,
            chunk_count: 1,
            data_weight: 100,
        };
        let later = DataStatistics {
            row_count: 20,
            byte_count: 250,
            chunk_count: 2,
            data_weight: 260,
        };
        assert!(!later.regressed_from(&earlier));
        assert!(earlier.regressed_from(&later));
        assert!(!earlier.regressed_from(&earlier));
    }
}
