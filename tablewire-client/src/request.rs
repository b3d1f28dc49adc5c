//! Request construction.
//!
//! [`RequestBuilder`] assembles an [`Envelope`] with a fluent API. Building
//! performs no network side effects; it only validates identity fields and
//! copies the assembled state out, so the builder stays usable and later
//! mutation never affects previously built envelopes.

use std::time::Duration;

use bytes::Bytes;
use tablewire_core::{Envelope, Guid};

use crate::ClientError;

/// User agent reported when the caller does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("tablewire/", env!("CARGO_PKG_VERSION"));

/// Fluent builder for an [`Envelope`].
///
/// Service, method, and correlation id are required;
/// [`build`](RequestBuilder::build) fails with [`ClientError::Validation`]
/// when any of them is unset.
///
/// # Example
///
/// ```
/// use tablewire_client::RequestBuilder;
/// use tablewire_core::Guid;
///
/// let envelope = RequestBuilder::new()
///     .service("ApiService")
///     .method("ReadTable")
///     .correlation_id(Guid::random())
///     .timeout(std::time::Duration::from_secs(30))
///     .body(b"path=//tmp/table".as_slice())
///     .build()?;
/// # Ok::<(), tablewire_client::ClientError>(())
/// ```
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    service: Option<String>,
    method: Option<String>,
    correlation_id: Option<Guid>,
    timeout: Option<Duration>,
    trace_id: Option<Guid>,
    trace_sampled: bool,
    user_agent: Option<String>,
    body: Bytes,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        RequestBuilder {
            service: None,
            method: None,
            correlation_id: None,
            timeout: None,
            trace_id: None,
            trace_sampled: false,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            body: Bytes::new(),
        }
    }

    /// Set the target service name.
    pub fn service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the target method name.
    pub fn method<S: Into<String>>(mut self, method: S) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the correlation id binding the request to its response stream.
    pub fn correlation_id(mut self, id: Guid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Set the request timeout, propagated to the server in the envelope
    /// header.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the configured timeout, if any.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Set the trace context for this request.
    pub fn trace_context(mut self, trace_id: Guid, sampled: bool) -> Self {
        self.trace_id = Some(trace_id);
        self.trace_sampled = sampled;
        self
    }

    /// Override the user agent string. [`DEFAULT_USER_AGENT`] is reported
    /// when not overridden.
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the opaque, method-specific request body.
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Assemble an [`Envelope`] from the current state.
    ///
    /// The builder is left untouched; envelopes built earlier are never
    /// affected by later setter calls.
    pub fn build(&self) -> Result<Envelope, ClientError> {
        let service = match &self.service {
            Some(s) if !s.is_empty() => s.clone(),
            _ => return Err(ClientError::Validation("service name is unset".into())),
        };
        let method = match &self.method {
            Some(m) if !m.is_empty() => m.clone(),
            _ => return Err(ClientError::Validation("method name is unset".into())),
        };
        let correlation_id = self
            .correlation_id
            .ok_or_else(|| ClientError::Validation("correlation id is unset".into()))?;

        Ok(Envelope {
            service,
            method,
            correlation_id,
            timeout: self.timeout,
            trace_id: self.trace_id,
            trace_sampled: self.trace_sampled,
            user_agent: self.user_agent.clone(),
            body: self.body.clone(),
        })
    }
}

/// Target of an operation-scoped request: exactly one of a persisted
/// operation id or a caller-assigned alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationTarget {
    ById(Guid),
    ByAlias(String),
}

impl OperationTarget {
    /// Build an alias target, validating the alias form.
    pub fn by_alias<S: Into<String>>(alias: S) -> Result<Self, ClientError> {
        let alias = alias.into();
        validate_operation_alias(&alias)?;
        Ok(OperationTarget::ByAlias(alias))
    }
}

impl std::fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationTarget::ById(id) => write!(f, "{id}"),
            OperationTarget::ByAlias(alias) => f.write_str(alias),
        }
    }
}

/// Check that an operation alias is well formed: aliases start with `*`
/// and carry at least one further character.
pub fn validate_operation_alias(alias: &str) -> Result<(), ClientError> {
    if alias.len() < 2 || !alias.starts_with('*') {
        return Err(ClientError::Validation(format!(
            "operation alias must start with '*' and be non-empty: {alias:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> RequestBuilder {
        RequestBuilder::new()
            .service("ApiService")
            .method("ReadTable")
            .correlation_id(Guid::new(7))
    }

    #[test]
    fn test_build_requires_service() {
        let err = RequestBuilder::new()
            .method("ReadTable")
            .correlation_id(Guid::new(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_build_requires_method() {
        let err = RequestBuilder::new()
            .service("ApiService")
            .correlation_id(Guid::new(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_build_requires_correlation_id() {
        let err = RequestBuilder::new()
            .service("ApiService")
            .method("ReadTable")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_build_rejects_empty_service() {
        let err = complete_builder().service("").build().unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_build_complete() {
        let envelope = complete_builder()
            .trace_context(Guid::new(9), true)
            .body(b"payload".as_slice())
            .build()
            .unwrap();
        assert_eq!(envelope.service, "ApiService");
        assert_eq!(envelope.method, "ReadTable");
        assert_eq!(envelope.correlation_id, Guid::new(7));
        assert_eq!(envelope.trace_id, Some(Guid::new(9)));
        assert!(envelope.trace_sampled);
        assert_eq!(envelope.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert_eq!(&envelope.body[..], b"payload");
    }

    #[test]
    fn test_built_envelope_unaffected_by_later_mutation() {
        let builder = complete_builder().body(b"first".as_slice());
        let first = builder.build().unwrap();

        let builder = builder.method("GetNode").body(b"second".as_slice());
        let second = builder.build().unwrap();

        assert_eq!(&first.body[..], b"first");
        assert_eq!(first.method, "ReadTable");
        assert_eq!(&second.body[..], b"second");
        assert_eq!(second.method, "GetNode");
    }

    #[test]
    fn test_operation_alias_validation() {
        assert!(OperationTarget::by_alias("*nightly").is_ok());
        assert!(OperationTarget::by_alias("nightly").is_err());
        assert!(OperationTarget::by_alias("*").is_err());
        assert!(OperationTarget::by_alias("").is_err());
    }

    #[test]
    fn test_operation_target_display() {
        let by_alias = OperationTarget::by_alias("*nightly").unwrap();
        assert_eq!(by_alias.to_string(), "*nightly");
        let by_id = OperationTarget::ById(Guid::new(0x10));
        assert_eq!(by_id.to_string(), "0-0-0-10");
    }
}
