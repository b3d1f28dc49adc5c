//! Client-side protocol layer for the tablewire RPC protocol.
//!
//! This crate covers the path from "I want to call method M with body B"
//! to "typed rows are arriving": request construction ([`RequestBuilder`]),
//! the transport seam ([`Transport`]), ordered chunk delivery
//! ([`AttachmentChannel`]), streaming row decoding
//! ([`AttachmentDecoder`], [`RowsetDecoder`], [`PassthroughDecoder`]), and
//! pull/push consumption ([`RowStream`]). Wire formats live in
//! [`tablewire_core`].

mod channel;
mod client;
mod decoder;
mod error;
mod request;
mod streaming;
mod transport;

pub use channel::{
    attachment_channel, AttachmentChannel, AttachmentSender, CancelHandle,
    DEFAULT_CHANNEL_CAPACITY,
};
pub use client::TableClient;
pub use decoder::{AttachmentDecoder, PassthroughDecoder, RowsetDecoder};
pub use error::ClientError;
pub use request::{
    validate_operation_alias, OperationTarget, RequestBuilder, DEFAULT_USER_AGENT,
};
pub use streaming::{RowSink, RowStream, Rowset};
pub use transport::{ResponseHeader, Transport};
