//! Consumption adapters over one decoder and one attachment channel.
//!
//! [`RowStream`] exposes the decoded rows of one exchange in two
//! interchangeable modes:
//!
//! - **Pull**: `RowStream` implements [`futures::Stream`]; a lazy, finite,
//!   non-restartable sequence. Advancing may await the next chunk.
//! - **Push**: [`RowStream::deliver_to`] hands each row to a caller
//!   supplied [`RowSink`] synchronously, in arrival order, and only
//!   requests chunk N+1 after the sink has finished every row of chunk N.
//!   That single-flight discipline is the backpressure mechanism.
//!
//! Errors surface at the point consumption reaches them; rows already
//! delivered are never retracted.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tablewire_core::{Chunk, DataStatistics, TableSchema};

use crate::channel::{AttachmentChannel, CancelHandle};
use crate::decoder::AttachmentDecoder;
use crate::ClientError;

/// The materialized result of one fully consumed decode session: the rows
/// in order plus the final schema and statistics snapshots.
#[derive(Clone, Debug)]
pub struct Rowset<T> {
    pub rows: Vec<T>,
    pub schema: Option<TableSchema>,
    pub statistics: Option<DataStatistics>,
}

/// Push-style consumer of decoded rows.
///
/// Implemented for any `FnMut(T) -> Result<(), ClientError>` closure. An
/// error aborts the exchange; rows accepted earlier stay delivered.
pub trait RowSink<T> {
    fn accept(&mut self, row: T) -> Result<(), ClientError>;
}

impl<T, F> RowSink<T> for F
where
    F: FnMut(T) -> Result<(), ClientError>,
{
    fn accept(&mut self, row: T) -> Result<(), ClientError> {
        self(row)
    }
}

/// Decoded rows of one exchange.
///
/// Wraps one [`AttachmentChannel`] and one decoder instance; both live
/// exactly as long as the exchange.
pub struct RowStream<D: AttachmentDecoder> {
    channel: AttachmentChannel,
    decoder: D,
    buffered: VecDeque<D::Item>,
    finished: bool,
}

impl<D: AttachmentDecoder> std::fmt::Debug for RowStream<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("buffered", &self.buffered.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<D: AttachmentDecoder> RowStream<D> {
    pub fn new(channel: AttachmentChannel, decoder: D) -> Self {
        RowStream {
            channel,
            decoder,
            buffered: VecDeque::new(),
            finished: false,
        }
    }

    /// Access the decoder, e.g. for the current schema or statistics.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Handle for cancelling this exchange from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.channel.cancel_handle()
    }

    /// Whether the stream has reached end-of-stream or failed.
    pub fn is_finished(&self) -> bool {
        self.finished && self.buffered.is_empty()
    }

    fn feed(&mut self, chunk: Chunk) -> Result<(), ClientError> {
        match self.decoder.parse(chunk)? {
            Some(rows) => self.buffered.extend(rows),
            None => self.finished = true,
        }
        Ok(())
    }

    /// Push mode: deliver every row to `sink`, in order.
    ///
    /// All rows decoded from one chunk are handed to the sink before the
    /// next chunk is requested from the channel. Returns the decoder so the
    /// caller can read the final schema and statistics.
    pub async fn deliver_to<S: RowSink<D::Item>>(
        mut self,
        sink: &mut S,
    ) -> Result<D, ClientError> {
        loop {
            while let Some(row) = self.buffered.pop_front() {
                sink.accept(row)?;
            }
            if self.finished {
                return Ok(self.decoder);
            }
            let chunk = self.channel.next_chunk().await?;
            self.feed(chunk)?;
        }
    }
}

impl<D> RowStream<D>
where
    D: AttachmentDecoder + Unpin,
    Self: Unpin,
{
    /// Drain the whole stream into a [`Rowset`].
    pub async fn collect_rowset(mut self) -> Result<Rowset<D::Item>, ClientError> {
        use futures::StreamExt;
        let mut rows = Vec::new();
        while let Some(item) = self.next().await {
            rows.push(item?);
        }
        Ok(Rowset {
            rows,
            schema: self.decoder.current_read_schema().cloned(),
            statistics: self.decoder.data_statistics(),
        })
    }

    /// Consume and discard all remaining rows, returning how many were
    /// dropped. Errors terminate the drain silently.
    pub async fn drain(&mut self) -> usize {
        use futures::StreamExt;
        let mut count = 0;
        while let Some(item) = self.next().await {
            if item.is_ok() {
                count += 1;
            }
        }
        count
    }
}

impl<D> Stream for RowStream<D>
where
    D: AttachmentDecoder + Unpin,
    Self: Unpin,
{
    type Item = Result<D::Item, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(row) = this.buffered.pop_front() {
                return Poll::Ready(Some(Ok(row)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match this.channel.poll_next_chunk(cx) {
                Poll::Ready(Ok(chunk)) => {
                    if let Err(err) = this.feed(chunk) {
                        this.finished = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    // Loop: the chunk may have completed zero rows.
                }
                Poll::Ready(Err(err)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
