//! Wire-level error types.

/// Errors produced while encoding or decoding wire-level structures.
///
/// These are low-level framing errors; the client crate maps them onto its
/// own error taxonomy before surfacing them to callers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// A structure was cut short: fewer bytes were available than the
    /// format requires at this position.
    #[error("truncated {what}: expected {expected} bytes, got {actual}")]
    Truncated {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A record declared a payload length that can never be satisfied.
    #[error("record length {length} exceeds the {max} byte limit")]
    OversizedRecord { length: usize, max: usize },

    /// A field being encoded is longer than its length prefix can express.
    #[error("{what} length {length} exceeds the {max} byte limit")]
    TooLong {
        what: &'static str,
        length: usize,
        max: usize,
    },

    /// The record tag byte is not one of the known tags.
    #[error("unknown record tag 0x{0:02x}")]
    UnknownRecordTag(u8),

    /// A row value carried an unknown type tag.
    #[error("unknown value tag 0x{0:02x}")]
    UnknownValueTag(u8),

    /// A column type tag in a schema descriptor is not a known type.
    #[error("unknown column type tag 0x{0:02x}")]
    UnknownColumnType(u8),

    /// A string field did not hold valid UTF-8.
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Any other malformed wire data.
    #[error("{0}")]
    Corrupt(String),
}

/// Take exactly `n` bytes from the front of `buf`, or report truncation.
pub(crate) fn take<'a>(
    buf: &mut &'a [u8],
    n: usize,
    what: &'static str,
) -> Result<&'a [u8], WireError> {
    if buf.len() < n {
        return Err(WireError::Truncated {
            what,
            expected: n,
            actual: buf.len(),
        });
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

pub(crate) fn take_u8(buf: &mut &[u8], what: &'static str) -> Result<u8, WireError> {
    Ok(take(buf, 1, what)?[0])
}

pub(crate) fn take_u16(buf: &mut &[u8], what: &'static str) -> Result<u16, WireError> {
    let b = take(buf, 2, what)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub(crate) fn take_u32(buf: &mut &[u8], what: &'static str) -> Result<u32, WireError> {
    let b = take(buf, 4, what)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn take_u64(buf: &mut &[u8], what: &'static str) -> Result<u64, WireError> {
    let b = take(buf, 8, what)?;
    Ok(u64::from_be_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

/// Check that a field fits its length prefix before encoding it.
pub(crate) fn check_len(length: usize, max: usize, what: &'static str) -> Result<(), WireError> {
    if length > max {
        return Err(WireError::TooLong { what, length, max });
    }
    Ok(())
}
