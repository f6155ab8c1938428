//! Reply events, failures and cancellation for one request/response cycle.
use std::{
    fmt::Display,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Boxed event stream produced by a provider.
pub type ReplyStream<'s> = Pin<Box<dyn Stream<Item = ReplyEvent> + Send + 's>>;

/// One event of a streaming reply.
///
/// `Delta` always carries the **full** assistant text accumulated so far, so
/// a renderer can replace whatever it showed before. Exactly one terminal
/// event (`Completed` or `Failed`) closes the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Delta(String),
    Completed(String),
    Failed(Failure),
}

impl ReplyEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReplyEvent::Delta(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No API key; no request was attempted.
    Auth,
    /// The transcript cannot be sent as is; no request was attempted.
    InvalidRequest,
    /// Network failure or cancellation.
    Transport,
    /// Non-success response from the endpoint.
    Server,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Auth => write!(f, "auth error"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::Server => write!(f, "server error"),
        }
    }
}

/// Terminal failure of a reply, carrying whatever text arrived before it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub partial_text: String,
}

impl Failure {
    /// Message used for user-initiated cancellation.
    pub const ABORTED: &'static str = "aborted";

    pub fn new(kind: FailureKind, message: impl Into<String>, partial_text: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            partial_text: partial_text.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Auth, message, String::new())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidRequest, message, String::new())
    }

    pub fn transport(message: impl Into<String>, partial_text: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message, partial_text)
    }

    pub fn server(message: impl Into<String>, partial_text: impl Into<String>) -> Self {
        Self::new(FailureKind::Server, message, partial_text)
    }

    pub fn aborted(partial_text: impl Into<String>) -> Self {
        Self::transport(Self::ABORTED, partial_text)
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == FailureKind::Transport && self.message == Self::ABORTED
    }
}

/// Cloneable trigger that aborts a running reply.
///
/// Cancelling is idempotent. Once a cancellation is observed the reply emits
/// no further deltas and settles to `Failed(Transport, "aborted")`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`Self::cancel`] has been called.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// A running reply: a lazy, finite, non-restartable event stream plus the
/// means to cancel it.
///
/// The handle itself guarantees that nothing is yielded after the first
/// terminal event, whatever the underlying stream does.
pub struct ReplyHandle {
    events: ReplyStream<'static>,
    cancel: CancelHandle,
    settled: bool,
}

impl ReplyHandle {
    pub fn new(events: ReplyStream<'static>, cancel: CancelHandle) -> Self {
        Self {
            events,
            cancel,
            settled: false,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Whether the terminal event has already been yielded.
    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}

impl Stream for ReplyHandle {
    type Item = ReplyEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.settled {
            return Poll::Ready(None);
        }

        match self.events.as_mut().poll_next(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.settled = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.settled = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
