use crate::{
    SortedStream,
    stage::{Halt, spawn_stage},
};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Emits each distinct value of a sorted `source` once.
///
/// Duplicates of a sorted sequence are adjacent, so only the previously emitted value is kept.
/// The first error of `source` is forwarded and ends the output.
pub fn dedupe<T, E, S>(source: S, cancel: CancellationToken) -> SortedStream<T, E>
where
    T: PartialEq + Clone + Send + 'static,
    E: Send + 'static,
    S: Stream<Item = Result<T, E>> + Send + 'static,
{
    spawn_stage(cancel, move |out| async move {
        let mut source = source.boxed();
        let mut last: Option<T> = None;

        let _: Result<(), Halt> = async {
            while let Some(item) = out.pull(&mut source).await? {
                let value = match item {
                    Ok(value) => value,
                    Err(err) => return out.emit(Err(err)).await,
                };
                if last.as_ref() == Some(&value) {
                    continue;
                }
                last = Some(value.clone());
                out.emit(Ok(value)).await?;
            }
            Ok(())
        }
        .await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{TryStreamExt, stream};
    use proptest::prelude::*;
    use rstest::rstest;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    fn ok_stream<T: Send + 'static>(
        items: Vec<T>,
    ) -> impl Stream<Item = Result<T, &'static str>> + Send + 'static {
        stream::iter(items.into_iter().map(Ok))
    }

    #[rstest]
    #[case::adjacent_runs("aaabbbcde", "abcde")]
    #[case::already_distinct("abc", "abc")]
    #[case::single_run("zzzz", "z")]
    #[case::empty("", "")]
    #[tokio::test]
    async fn test_dedupe(#[case] input: &str, #[case] expected: &str) {
        let out: String = dedupe(ok_stream(input.chars().collect()), CancellationToken::new())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_dedupe_forwards_first_error() {
        let source = stream::iter(vec![Ok('a'), Ok('a'), Err("broken"), Ok('b')]);
        let out: Vec<_> = dedupe(source, CancellationToken::new()).collect().await;
        assert_eq!(out, vec![Ok('a'), Err("broken")]);
    }

    #[tokio::test]
    async fn test_dedupe_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let source = ok_stream(vec![1u32, 2]).chain(stream::pending());
        let mut out = dedupe(source, cancel.clone());

        assert_eq!(out.next().await, Some(Ok(1)));
        assert_eq!(out.next().await, Some(Ok(2)));

        cancel.cancel();
        let end = tokio::time::timeout(Duration::from_secs(1), out.next()).await;
        assert_eq!(end, Ok(None));
    }

    #[tokio::test]
    async fn test_dropping_output_releases_source() {
        let (tx, rx) = mpsc::channel::<Result<u32, &'static str>>(1);
        let out = dedupe(ReceiverStream::new(rx), CancellationToken::new());
        tx.send(Ok(7)).await.unwrap();

        drop(out);
        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .expect("source should be dropped with the stage");
    }

    proptest! {
        #[test]
        fn prop_dedupe_matches_vec_dedup(mut values in prop::collection::vec(0u8..16, 0..200)) {
            values.sort_unstable();
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let out: Vec<u8> = runtime
                .block_on(async {
                    dedupe(ok_stream(values.clone()), CancellationToken::new())
                        .try_collect::<Vec<_>>()
                        .await
                })
                .unwrap();

            values.dedup();
            prop_assert_eq!(out, values);
        }
    }
}
