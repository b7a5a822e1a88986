//! Operator tasks connected by bounded channels.

use crate::SortedStream;
use futures::{Stream, StreamExt};
use std::future::Future;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Number of items buffered between a stage and its consumer.
pub const STAGE_CAPACITY: usize = 64;

/// Signals that a stage must stop: it was cancelled or its consumer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Halt;

/// The output half of a stage.
#[derive(Debug)]
pub(crate) struct Emitter<T, E> {
    tx: mpsc::Sender<Result<T, E>>,
    cancel: CancellationToken,
}

impl<T, E> Emitter<T, E> {
    /// Hands an item downstream, waiting for room in the channel.
    pub(crate) async fn emit(&self, item: Result<T, E>) -> Result<(), Halt> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt),
            sent = self.tx.send(item) => sent.map_err(|_| Halt),
        }
    }

    /// Pulls the next item of an input.
    ///
    /// Gives up as soon as the stage is cancelled or its consumer drops the output, so a stage
    /// parked on a slow input never outlives its consumer.
    pub(crate) async fn pull<S>(&self, input: &mut S) -> Result<Option<S::Item>, Halt>
    where
        S: Stream + Unpin,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt),
            _ = self.tx.closed() => Err(Halt),
            next = input.next() => Ok(next),
        }
    }
}

/// Spawns `body` as a stage and returns its output.
///
/// Inputs moved into `body` are dropped when it returns, which in turn releases the stages
/// feeding them. The output ends when the stage finishes or `cancel` fires.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub(crate) fn spawn_stage<T, E, F, Fut>(cancel: CancellationToken, body: F) -> SortedStream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(Emitter<T, E>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);
    tokio::spawn(body(Emitter { tx, cancel: cancel.clone() }));
    ReceiverStream::new(rx).take_until(cancel.cancelled_owned()).boxed()
}
