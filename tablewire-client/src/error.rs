//! Client-side error types.

use tablewire_core::WireError;

/// Errors surfaced by the client protocol layer.
///
/// Every failure of an exchange reaches the caller as one of these; this
/// layer never retries internally. Retry, if any, is an exchange-level
/// concern for the caller or the transport.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// A required envelope field was missing or invalid. Fails fast; the
    /// request is never sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed attachment bytes. Fatal for the current exchange; the
    /// decoder does not resynchronize.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// A schema descriptor incompatible with the rows around it. Fatal,
    /// never auto-recovered.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Connection-level failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The exchange was aborted by the caller or its timeout elapsed.
    #[error("exchange cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether this error came from cancellation rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<WireError> for ClientError {
    fn from(err: WireError) -> Self {
        ClientError::CorruptStream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_error_maps_to_corrupt_stream() {
        let err: ClientError = WireError::UnknownRecordTag(0x7f).into();
        assert!(matches!(err, ClientError::CorruptStream(_)));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ClientError::Cancelled.is_cancelled());
        assert!(!ClientError::Validation("x".into()).is_cancelled());
    }
}
