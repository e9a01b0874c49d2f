//! Pull-based stream of completion events.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::CompletionError;
use crate::types::CompletionEvent;

/// Events of one streamed completion, ending with [`CompletionEvent::Done`] or an error.
///
/// The request runs on a spawned task; dropping the stream aborts it, so an abandoned
/// stream never stores an assistant message.
pub struct CompletionStream {
    receiver: mpsc::Receiver<Result<CompletionEvent, CompletionError>>,
    task: JoinHandle<()>,
}

impl CompletionStream {
    pub(crate) fn new(
        receiver: mpsc::Receiver<Result<CompletionEvent, CompletionError>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self { receiver, task }
    }
}

impl Stream for CompletionStream {
    type Item = Result<CompletionEvent, CompletionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for CompletionStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
