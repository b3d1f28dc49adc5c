//! Record framing inside the attachment byte stream.
//!
//! The typed attachment stream is a sequence of records:
//!
//! ```text
//! [tag:1][length:4][payload:length]
//! ```
//!
//! Tags:
//! - `0x00`: a row
//! - `0x01`: a schema descriptor
//! - `0x02`: a statistics descriptor
//!
//! Record boundaries are independent of chunk boundaries: a record may span
//! chunks, and a chunk may hold many records. Descriptors are consumed out
//! of the row stream; they update decoder state without producing a row.

use crate::error::WireError;

/// Attachment record tags.
pub mod record_tag {
    /// A row record.
    pub const ROW: u8 = 0x00;
    /// A schema descriptor.
    pub const SCHEMA: u8 = 0x01;
    /// A statistics descriptor.
    pub const STATISTICS: u8 = 0x02;
}

/// Size of the record header (tag + length).
pub const RECORD_HEADER_SIZE: usize = 5;

/// Upper bound on a single record's payload. A declared length above this
/// can never be satisfied and marks the stream as corrupt.
pub const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Parse a record header from the front of `data`.
///
/// Returns `Ok(None)` when fewer than [`RECORD_HEADER_SIZE`] bytes are
/// available; the caller retains the bytes and retries with more data.
pub fn parse_record_header(data: &[u8]) -> Result<Option<(u8, usize)>, WireError> {
    if data.len() < RECORD_HEADER_SIZE {
        return Ok(None);
    }
    let tag = data[0];
    if tag != record_tag::ROW && tag != record_tag::SCHEMA && tag != record_tag::STATISTICS {
        return Err(WireError::UnknownRecordTag(tag));
    }
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as usize;
    if length > MAX_RECORD_BYTES {
        return Err(WireError::OversizedRecord {
            length,
            max: MAX_RECORD_BYTES,
        });
    }
    Ok(Some((tag, length)))
}

/// Wrap a payload in a record frame.
pub fn wrap_record(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    frame.push(tag);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}
