//! The transport seam.
//!
//! The protocol layer never opens connections itself; it hands a fully
//! built [`Envelope`] to a [`Transport`] and gets back the response header
//! plus the attachment channel carrying the response stream. Connection
//! management, retries, and authentication all live behind this trait.

use futures::future::BoxFuture;
use tablewire_core::{Envelope, Guid};

use crate::channel::AttachmentChannel;
use crate::ClientError;

/// Response metadata delivered before the attachment stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Echo of the request's correlation id.
    pub correlation_id: Guid,
}

/// A connection layer able to carry one request/response exchange.
///
/// Implementations must deliver attachment chunks in wire order and
/// terminate every stream with an end-of-stream chunk or an abort.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        envelope: Envelope,
    ) -> BoxFuture<'_, Result<(ResponseHeader, AttachmentChannel), ClientError>>;
}
