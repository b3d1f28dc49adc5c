//! Wire-level types and framing for the tablewire protocol.
//!
//! This crate provides the shared pieces of the client protocol layer:
//!
//! - [`Envelope`]: the request envelope and its binary framing
//! - [`Chunk`]: response attachment chunk framing
//! - [`record_tag`] and record framing inside the attachment byte stream
//! - [`Row`], [`TableSchema`], [`DataStatistics`]: the typed row wire format
//! - [`WireError`]: wire-level decode failures
//!
//! Everything here is synchronous and allocation-light; the streaming
//! machinery lives in `tablewire-client`.

mod attachment;
mod envelope;
mod error;
mod guid;
mod record;
mod row;
mod schema;
mod statistics;

pub use attachment::*;
pub use envelope::*;
pub use error::*;
pub use guid::*;
pub use record::*;
pub use row::*;
pub use schema::*;
pub use statistics::*;
