use crate::{
    SortedError, SortedStream,
    stage::{Emitter, Halt, spawn_stage},
};
use futures::{Stream, StreamExt, stream::BoxStream};
use std::{cmp::Ordering, collections::BinaryHeap};
use tokio_util::sync::CancellationToken;

/// The current head of one merge input.
///
/// Ordered by `value` alone and reversed, so a [`BinaryHeap`] pops the smallest head first.
/// `source` only says which input to advance once the head is emitted.
#[derive(Debug)]
struct Head<T> {
    value: T,
    source: usize,
}

impl<T: Ord> Ord for Head<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.value.cmp(&self.value)
    }
}

impl<T: Ord> PartialOrd for Head<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> PartialEq for Head<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Ord> Eq for Head<T> {}

/// A merge input, `None` once exhausted.
type Input<T, E> = Option<BoxStream<'static, Result<T, E>>>;

/// Merges sorted `sources` into one sorted stream, keeping every duplicate.
///
/// A single source is handed back as is. The first error of any source is forwarded and ends
/// the output.
///
/// # Errors
///
/// Returns [`SortedError::NoSources`] if `sources` is empty.
pub fn merge<T, E, S>(
    sources: Vec<S>,
    cancel: CancellationToken,
) -> Result<SortedStream<T, E>, SortedError>
where
    T: Ord + Send + 'static,
    E: Send + 'static,
    S: Stream<Item = Result<T, E>> + Send + 'static,
{
    let mut sources: Vec<_> = sources.into_iter().map(StreamExt::boxed).collect();
    match sources.len() {
        0 => return Err(SortedError::NoSources),
        1 => return Ok(sources.swap_remove(0)),
        _ => {}
    }

    Ok(spawn_stage(cancel, move |out| async move {
        let mut heap = BinaryHeap::with_capacity(sources.len());
        let mut inputs: Vec<Input<T, E>> = sources.into_iter().map(Some).collect();

        let _: Result<(), Halt> = async {
            for source in 0..inputs.len() {
                advance(&out, &mut inputs, &mut heap, source).await?;
            }
            while let Some(Head { value, source }) = heap.pop() {
                out.emit(Ok(value)).await?;
                advance(&out, &mut inputs, &mut heap, source).await?;
            }
            Ok(())
        }
        .await;
    }))
}

/// Pulls the next value of input `source` onto the heap, dropping the input once exhausted.
async fn advance<T: Ord, E>(
    out: &Emitter<T, E>,
    inputs: &mut [Input<T, E>],
    heap: &mut BinaryHeap<Head<T>>,
    source: usize,
) -> Result<(), Halt> {
    let Some(input) = inputs[source].as_mut() else {
        return Ok(());
    };
    match out.pull(input).await? {
        Some(Ok(value)) => heap.push(Head { value, source }),
        Some(Err(err)) => {
            out.emit(Err(err)).await?;
            return Err(Halt);
        }
        None => inputs[source] = None,
    }
    Ok(())
}
