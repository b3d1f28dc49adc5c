//! Response attachment chunk framing.
//!
//! A streamed response arrives as an ordered sequence of length-prefixed
//! binary chunks:
//!
//! ```text
//! [length:4][payload:length]
//! ```
//!
//! A length of zero or the `0xFFFF_FFFF` null marker denotes end-of-stream.
//! End-of-stream is an explicit [`Chunk`] case rather than a null sentinel,
//! so an empty-but-valid chunk handed to a decoder is unambiguous.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::WireError;

/// Marker length denoting end-of-stream.
pub const END_OF_STREAM_MARKER: u32 = u32::MAX;

/// Size of the chunk length prefix.
pub const CHUNK_HEADER_SIZE: usize = 4;

/// Upper bound on a single chunk's payload. Anything larger is corrupt.
pub const MAX_CHUNK_BYTES: usize = 128 * 1024 * 1024;

/// One binary unit of a streamed response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// A chunk of attachment bytes. The buffer is reference-counted; slices
    /// of it share storage rather than copying.
    Data(Bytes),
    /// The explicit end-of-stream marker. No further chunks follow.
    EndOfStream,
}

impl Chunk {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Chunk::EndOfStream)
    }

    /// Payload length of a data chunk; zero for end-of-stream.
    pub fn len(&self) -> usize {
        match self {
            Chunk::Data(bytes) => bytes.len(),
            Chunk::EndOfStream => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append a chunk's wire form to `buf`.
///
/// A zero-length data chunk has no distinct wire form; it encodes as
/// end-of-stream, matching the framing rules above.
pub fn write_chunk(buf: &mut BytesMut, chunk: &Chunk) {
    match chunk {
        Chunk::Data(bytes) => {
            buf.put_u32(bytes.len() as u32);
            buf.put_slice(bytes);
        }
        Chunk::EndOfStream => buf.put_u32(END_OF_STREAM_MARKER),
    }
}

/// Try to split one complete chunk off the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a whole chunk; the
/// caller appends more transport bytes and retries. The returned payload
/// shares storage with `buf`'s backing allocation.
pub fn read_chunk(buf: &mut BytesMut) -> Result<Option<Chunk>, WireError> {
    if buf.len() < CHUNK_HEADER_SIZE {
        return Ok(None);
    }
    let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if length == END_OF_STREAM_MARKER || length == 0 {
        let _ = buf.split_to(CHUNK_HEADER_SIZE);
        return Ok(Some(Chunk::EndOfStream));
    }
    let length = length as usize;
    if length > MAX_CHUNK_BYTES {
        return Err(WireError::OversizedRecord {
            length,
            max: MAX_CHUNK_BYTES,
        });
    }
    if buf.len() < CHUNK_HEADER_SIZE + length {
        return Ok(None);
    }
    let mut frame = buf.split_to(CHUNK_HEADER_SIZE + length);
    let payload = frame.split_off(CHUNK_HEADER_SIZE).freeze();
    Ok(Some(Chunk::Data(payload)))
}
