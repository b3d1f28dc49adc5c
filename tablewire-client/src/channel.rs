//! The attachment channel: ordered chunk delivery from the transport.
//!
//! An [`AttachmentChannel`] is the response half of one exchange: a strict
//! FIFO sequence of [`Chunk`]s ending with [`Chunk::EndOfStream`]. The
//! transport feeds it through an [`AttachmentSender`]; the decoder side
//! consumes it exactly once. The channel is bounded, so a slow consumer
//! backpressures the transport.
//!
//! Cancellation is cooperative: a [`CancelHandle`] flips the exchange into
//! the cancelled state, wakes any pending receive, and stops further chunk
//! requests. Chunks already delivered stay delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use tablewire_core::Chunk;
use tokio::sync::mpsc;

use crate::ClientError;

/// Default bound on in-flight chunks per exchange.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

struct Shared {
    cancelled: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

/// Create a linked sender/channel pair with the given chunk capacity.
pub fn attachment_channel(capacity: usize) -> (AttachmentSender, AttachmentChannel) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared {
        cancelled: AtomicBool::new(false),
        waker: Mutex::new(None),
    });
    (
        AttachmentSender { tx },
        AttachmentChannel {
            rx,
            shared,
            state: ChannelState::Open,
        },
    )
}

/// Transport-side handle feeding chunks into one exchange.
#[derive(Clone)]
pub struct AttachmentSender {
    tx: mpsc::Sender<Result<Chunk, ClientError>>,
}

impl AttachmentSender {
    /// Deliver the next chunk, awaiting channel capacity.
    ///
    /// Fails with [`ClientError::Cancelled`] when the consumer has gone
    /// away; the transport should stop producing for this exchange.
    pub async fn send(&self, chunk: Chunk) -> Result<(), ClientError> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| ClientError::Cancelled)
    }

    /// Deliver the end-of-stream marker and close the sender.
    pub async fn finish(self) -> Result<(), ClientError> {
        self.send(Chunk::EndOfStream).await
    }

    /// Fail the exchange with `err`. Best-effort: if the consumer is
    /// already gone there is nobody left to notify.
    pub async fn abort(self, err: ClientError) {
        let _ = self.tx.send(Err(err)).await;
    }
}

/// Handle for cancelling an exchange from outside the consumer.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Cancel the exchange. The consumer observes
    /// [`ClientError::Cancelled`] on its next receive; no further chunks
    /// are requested from the transport.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.shared.waker.lock() {
            if let Some(waker) = slot.take() {
                waker.wake();
            }
        }
    }
}

enum ChannelState {
    Open,
    /// End-of-stream observed; the channel keeps reporting it.
    Done,
    /// A terminal error; replayed on every further receive.
    Failed(ClientError),
}

/// Consumer side of one exchange's response stream.
///
/// Chunks arrive in strict FIFO order and are consumed exactly once. After
/// end-of-stream the channel keeps yielding [`Chunk::EndOfStream`]; after a
/// failure it keeps yielding the same error.
pub struct AttachmentChannel {
    rx: mpsc::Receiver<Result<Chunk, ClientError>>,
    shared: Arc<Shared>,
    state: ChannelState,
}

impl AttachmentChannel {
    /// Get a cancellation handle for this exchange.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Poll for the next chunk.
    pub fn poll_next_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Result<Chunk, ClientError>> {
        if self.shared.cancelled.load(Ordering::SeqCst)
            && !matches!(self.state, ChannelState::Failed(_))
        {
            // Stop the transport from queueing more chunks.
            self.rx.close();
            self.state = ChannelState::Failed(ClientError::Cancelled);
        }

        match &self.state {
            ChannelState::Done => return Poll::Ready(Ok(Chunk::EndOfStream)),
            ChannelState::Failed(err) => return Poll::Ready(Err(err.clone())),
            ChannelState::Open => {}
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if chunk.is_end_of_stream() {
                    self.state = ChannelState::Done;
                }
                Poll::Ready(Ok(chunk))
            }
            Poll::Ready(Some(Err(err))) => {
                self.state = ChannelState::Failed(err.clone());
                Poll::Ready(Err(err))
            }
            Poll::Ready(None) => {
                let err = ClientError::Transport(
                    "attachment channel closed before end-of-stream".into(),
                );
                self.state = ChannelState::Failed(err.clone());
                Poll::Ready(Err(err))
            }
            Poll::Pending => {
                if let Ok(mut slot) = self.shared.waker.lock() {
                    *slot = Some(cx.waker().clone());
                }
                // A cancel between the check at the top and the waker store
                // above finds an empty slot and wakes nobody; re-check so
                // that window cannot leave the consumer parked.
                if self.shared.cancelled.load(Ordering::SeqCst) {
                    self.rx.close();
                    self.state = ChannelState::Failed(ClientError::Cancelled);
                    return Poll::Ready(Err(ClientError::Cancelled));
                }
                Poll::Pending
            }
        }
    }

    /// Receive the next chunk, awaiting the transport if necessary.
    pub async fn next_chunk(&mut self) -> Result<Chunk, ClientError> {
        std::future::poll_fn(|cx| self.poll_next_chunk(cx)).await
    }
}
