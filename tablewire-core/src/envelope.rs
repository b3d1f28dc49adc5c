//! The request envelope and its binary framing.
//!
//! An [`Envelope`] is the fully assembled identity-plus-body unit sent to
//! the cluster for one remote call. Its wire form is:
//!
//! ```text
//! [service_len:2][service][method_len:2][method][correlation_id:16][flags:1]
//! [timeout_ms:8]? [trace_id:16]? [user_agent_len:2][user_agent]?
//! [body_len:4][body]
//! ```
//!
//! All integers are big-endian. Optional fields are present exactly when the
//! corresponding bit in `flags` is set. The body is opaque to this layer;
//! it is interpreted only by the specific operation.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{check_len, take, take_u16, take_u32, take_u64, take_u8, WireError};
use crate::guid::Guid;

/// Envelope header flag bits.
pub mod envelope_flags {
    /// A timeout is present.
    pub const HAS_TIMEOUT: u8 = 0x01;
    /// The trace context is sampled.
    pub const TRACE_SAMPLED: u8 = 0x02;
    /// A trace id is present.
    pub const HAS_TRACE_ID: u8 = 0x04;
    /// A user agent string is present.
    pub const HAS_USER_AGENT: u8 = 0x08;
}

/// A fully assembled request envelope.
///
/// Immutable once built; construct one through
/// `tablewire_client::RequestBuilder`. The service, method, and correlation
/// id are always present and non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub service: String,
    pub method: String,
    pub correlation_id: Guid,
    pub timeout: Option<Duration>,
    pub trace_id: Option<Guid>,
    pub trace_sampled: bool,
    pub user_agent: Option<String>,
    pub body: Bytes,
}

impl Envelope {
    /// Encode the envelope into its wire form.
    ///
    /// Fails when a string field or the body is too long for its length
    /// prefix; nothing is silently truncated.
    pub fn encode(&self) -> Result<Bytes, WireError> {
        check_len(self.service.len(), u16::MAX as usize, "service name")?;
        check_len(self.method.len(), u16::MAX as usize, "method name")?;
        if let Some(user_agent) = &self.user_agent {
            check_len(user_agent.len(), u16::MAX as usize, "user agent")?;
        }
        check_len(self.body.len(), u32::MAX as usize, "envelope body")?;

        let mut flags = 0u8;
        if self.timeout.is_some() {
            flags |= envelope_flags::HAS_TIMEOUT;
        }
        if self.trace_sampled {
            flags |= envelope_flags::TRACE_SAMPLED;
        }
        if self.trace_id.is_some() {
            flags |= envelope_flags::HAS_TRACE_ID;
        }
        if self.user_agent.is_some() {
            flags |= envelope_flags::HAS_USER_AGENT;
        }

        let mut buf = BytesMut::with_capacity(64 + self.body.len());
        buf.put_u16(self.service.len() as u16);
        buf.put_slice(self.service.as_bytes());
        buf.put_u16(self.method.len() as u16);
        buf.put_slice(self.method.as_bytes());
        buf.put_slice(&self.correlation_id.to_bytes());
        buf.put_u8(flags);
        if let Some(timeout) = self.timeout {
            buf.put_u64(timeout.as_millis() as u64);
        }
        if let Some(trace_id) = self.trace_id {
            buf.put_slice(&trace_id.to_bytes());
        }
        if let Some(user_agent) = &self.user_agent {
            buf.put_u16(user_agent.len() as u16);
            buf.put_slice(user_agent.as_bytes());
        }
        buf.put_u32(self.body.len() as u32);
        buf.put_slice(&self.body);
        Ok(buf.freeze())
    }

    /// Decode an envelope from its wire form.
    ///
    /// The whole envelope must be present; trailing bytes are an error.
    pub fn decode(data: &[u8]) -> Result<Envelope, WireError> {
        let mut buf = data;

        let service = read_string(&mut buf, "service name")?;
        let method = read_string(&mut buf, "method name")?;
        let correlation_id = read_guid(&mut buf, "correlation id")?;
        let flags = take_u8(&mut buf, "envelope flags")?;

        let timeout = if flags & envelope_flags::HAS_TIMEOUT != 0 {
            Some(Duration::from_millis(take_u64(&mut buf, "timeout")?))
        } else {
            None
        };
        let trace_id = if flags & envelope_flags::HAS_TRACE_ID != 0 {
            Some(read_guid(&mut buf, "trace id")?)
        } else {
            None
        };
        let user_agent = if flags & envelope_flags::HAS_USER_AGENT != 0 {
            Some(read_string(&mut buf, "user agent")?)
        } else {
            None
        };

        let body_len = take_u32(&mut buf, "body length")? as usize;
        let body = Bytes::copy_from_slice(take(&mut buf, body_len, "body")?);

        if !buf.is_empty() {
            return Err(WireError::Corrupt(format!(
                "{} trailing bytes after envelope body",
                buf.len()
            )));
        }
        if service.is_empty() || method.is_empty() {
            return Err(WireError::Corrupt(
                "envelope service and method must be non-empty".into(),
            ));
        }

        Ok(Envelope {
            service,
            method,
            correlation_id,
            timeout,
            trace_id,
            trace_sampled: flags & envelope_flags::TRACE_SAMPLED != 0,
            user_agent,
            body,
        })
    }
}

fn read_string(buf: &mut &[u8], what: &'static str) -> Result<String, WireError> {
    let len = take_u16(buf, what)? as usize;
    let bytes = take(buf, len, what)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8(what))
}

fn read_guid(buf: &mut &[u8], what: &'static str) -> Result<Guid, WireError> {
    let bytes = take(buf, Guid::WIRE_SIZE, what)?;
    let mut raw = [0u8; Guid::WIRE_SIZE];
    raw.copy_from_slice(bytes);
    Ok(Guid::from_bytes(raw))
}
