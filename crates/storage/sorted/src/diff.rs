use crate::{
    SortedStream,
    stage::{Halt, spawn_stage},
};
use futures::{Stream, StreamExt};
use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Counts the containment violations a [`diff_with_report`] stage has skipped.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    anomalies: Arc<AtomicU64>,
}

impl DiffReport {
    /// Returns the number of `subset` entries that had no match in `all`.
    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    fn record_anomaly<T: Debug>(&self, entry: &T, next: Option<&T>) {
        warn!(
            target: "sorted",
            ?entry,
            ?next,
            "Subset entry missing from the full set, skipping"
        );
        self.anomalies.fetch_add(1, Ordering::Relaxed);
        tessera_macros::inc!(counter, crate::Metrics::DIFF_ANOMALIES_TOTAL);
    }
}

/// Emits every element of the sorted `all` that is not in the sorted `subset`.
///
/// See [`diff_with_report`].
pub fn diff<T, E, A, B>(all: A, subset: B, cancel: CancellationToken) -> SortedStream<T, E>
where
    T: Ord + Debug + Send + 'static,
    E: Send + 'static,
    A: Stream<Item = Result<T, E>> + Send + 'static,
    B: Stream<Item = Result<T, E>> + Send + 'static,
{
    diff_with_report(all, subset, cancel).0
}

/// Emits every element of the sorted `all` that is not in the sorted `subset`, in one forward
/// pass over both.
///
/// `subset` is expected to be contained in `all`. An entry of `subset` that sorts before the
/// current head of `all` has no match: it is logged, counted on the returned [`DiffReport`],
/// and skipped. Entries of `subset` left over once `all` is exhausted have no match either and
/// are drained and counted the same way. The first error of either input is forwarded and ends
/// the output.
pub fn diff_with_report<T, E, A, B>(
    all: A,
    subset: B,
    cancel: CancellationToken,
) -> (SortedStream<T, E>, DiffReport)
where
    T: Ord + Debug + Send + 'static,
    E: Send + 'static,
    A: Stream<Item = Result<T, E>> + Send + 'static,
    B: Stream<Item = Result<T, E>> + Send + 'static,
{
    let report = DiffReport::default();
    let stage_report = report.clone();

    let out = spawn_stage(cancel, move |out| async move {
        let mut all = all.boxed();
        let mut subset = Some(subset.boxed());
        // Head of `subset` not yet matched against `all`.
        let mut pending: Option<T> = None;

        let _: Result<(), Halt> = async {
            while let Some(item) = out.pull(&mut all).await? {
                let value = match item {
                    Ok(value) => value,
                    Err(err) => return out.emit(Err(err)).await,
                };

                loop {
                    if pending.is_none() {
                        let Some(source) = subset.as_mut() else { break };
                        match out.pull(source).await? {
                            Some(Ok(head)) => pending = Some(head),
                            Some(Err(err)) => return out.emit(Err(err)).await,
                            None => {
                                subset = None;
                                break;
                            }
                        }
                    }
                    match &pending {
                        Some(head) if *head < value => {
                            stage_report.record_anomaly(head, Some(&value));
                            pending = None;
                        }
                        _ => break,
                    }
                }

                if pending.as_ref() == Some(&value) {
                    pending = None;
                    continue;
                }
                out.emit(Ok(value)).await?;
            }

            if let Some(head) = pending.take() {
                stage_report.record_anomaly(&head, None);
            }
            let Some(source) = subset.as_mut() else { return Ok(()) };
            while let Some(item) = out.pull(source).await? {
                match item {
                    Ok(head) => stage_report.record_anomaly(&head, None),
                    Err(err) => return out.emit(Err(err)).await,
                }
            }
            Ok(())
        }
        .await;
    });

    (out, report)
}
