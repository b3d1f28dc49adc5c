//! The client facade tying builder, transport, and decoding together.

use std::sync::Arc;
use std::time::Duration;

use crate::decoder::AttachmentDecoder;
use crate::request::RequestBuilder;
use crate::streaming::RowStream;
use crate::transport::Transport;
use crate::ClientError;

/// Entry point for issuing exchanges against a cluster.
///
/// Cheap to clone; all clones share one transport. The client itself is
/// stateless across exchanges: each call builds one envelope, sends it,
/// and wires the response stream to the caller's decoder.
pub struct TableClient<T: Transport> {
    transport: Arc<T>,
    default_timeout: Option<Duration>,
}

impl<T: Transport> Clone for TableClient<T> {
    fn clone(&self) -> Self {
        TableClient {
            transport: Arc::clone(&self.transport),
            default_timeout: self.default_timeout,
        }
    }
}

impl<T: Transport> TableClient<T> {
    pub fn new(transport: T) -> Self {
        TableClient {
            transport: Arc::new(transport),
            default_timeout: None,
        }
    }

    /// Timeout applied to requests that do not set one themselves.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Issue one exchange: build the envelope, send it, and return the
    /// response rows as a [`RowStream`] over `decoder`.
    ///
    /// The client's default timeout is filled in when the builder carries
    /// none. A timeout that elapses while waiting for the response header
    /// surfaces as [`ClientError::Cancelled`].
    pub async fn exchange<D: AttachmentDecoder>(
        &self,
        mut request: RequestBuilder,
        decoder: D,
    ) -> Result<RowStream<D>, ClientError> {
        if request.get_timeout().is_none() {
            if let Some(timeout) = self.default_timeout {
                request = request.timeout(timeout);
            }
        }

        let envelope = request.build()?;
        let correlation_id = envelope.correlation_id;
        tracing::debug!(
            service = %envelope.service,
            method = %envelope.method,
            correlation_id = %correlation_id,
            "sending request"
        );

        let send = self.transport.send(envelope);
        let (header, channel) = match request.get_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, send)
                .await
                .map_err(|_| ClientError::Cancelled)?,
            None => send.await,
        }?;

        if header.correlation_id != correlation_id {
            return Err(ClientError::Transport(format!(
                "correlation id mismatch: sent {correlation_id}, got {}",
                header.correlation_id
            )));
        }
        tracing::debug!(correlation_id = %correlation_id, "response stream open");

        Ok(RowStream::new(channel, decoder))
    }
}
