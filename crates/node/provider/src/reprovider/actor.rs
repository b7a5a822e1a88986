//! The reprovider: periodically announces every stored block that is not fresh.

use crate::{
    ProvideLedger, ProvideSource, ReproviderConfig, ReproviderError, RoutingClient, SweepSummary,
    reprovider::{
        summary::SweepCounters,
        worker::{AnnouncePolicy, WorkItem, Worker},
    },
};
use futures::{Future, StreamExt, TryStreamExt};
use std::{sync::Arc, time::Duration};
use tessera_blockstore::ContentId;
use tessera_sorted::{DiffReport, SortedStream, dedupe, diff_with_report, merge};
use tokio::{
    select,
    sync::{mpsc, watch},
    task::{JoinError, JoinSet},
    time::{Instant, MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keeps every stored block announced on the content-routing index.
///
/// On every tick of `reprovide_interval` the reprovider sweeps: it diffs the identifiers of
/// its sources against the ledger's fresh entries and queues the difference for a fixed pool
/// of workers. A worker announces an identifier, retrying transient failures, and marks it
/// fresh for `provide_ttl` on success. Announcements that keep failing are skipped until the
/// next sweep.
///
/// The run ends when the cancellation token fires, or with an error when a source or the
/// ledger fails. Nothing is written to the sources, so a failed run can simply be rebuilt and
/// started again.
#[derive(Debug)]
pub struct Reprovider<L, R> {
    /// Identifier sets to announce, the block store first.
    pub(crate) sources: Vec<Arc<dyn ProvideSource>>,
    pub(crate) ledger: Arc<L>,
    pub(crate) router: Arc<R>,
    pub(crate) config: ReproviderConfig,
    pub(crate) cancellation: CancellationToken,
    pub(crate) sweeps: watch::Sender<Option<SweepSummary>>,
}

/// How a sweep ended without an error.
#[derive(Debug)]
enum SweepOutcome {
    Completed(SweepSummary),
    Skipped,
    Cancelled,
}

impl<L, R> Reprovider<L, R>
where
    L: ProvideLedger + 'static,
    R: RoutingClient + 'static,
{
    /// Returns a receiver of the summary of the latest completed sweep.
    pub fn subscribe_sweeps(&self) -> watch::Receiver<Option<SweepSummary>> {
        self.sweeps.subscribe()
    }

    /// Returns the reprovider's configuration.
    pub const fn config(&self) -> &ReproviderConfig {
        &self.config
    }

    /// Runs the reprovider until its cancellation token fires.
    ///
    /// On shutdown the worker queue is closed and in-flight announcements get up to
    /// `provide_timeout` to finish before they are abandoned. Returns once every worker task
    /// has been joined.
    ///
    /// # Errors
    ///
    /// Fails if a source or the ledger fails, or if a worker task panics.
    pub async fn run(self) -> Result<(), ReproviderError> {
        let (queue_tx, queue_rx) = async_channel::bounded(self.config.queue_capacity);
        let mut pool = WorkerPool::spawn(&self.ledger, &self.router, &self.config, queue_rx);

        let mut ticker = interval(self.config.reprovide_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target: "reprovider",
            sources = self.sources.len(),
            workers = self.config.worker_count,
            interval = ?self.config.reprovide_interval,
            ttl = ?self.config.provide_ttl,
            "Starting reprovider"
        );

        let mut completed = 0u64;
        let result = loop {
            select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!(
                        target: "reprovider",
                        "Received shutdown signal. Exiting reprovider task."
                    );
                    break Ok(());
                }
                Some(joined) = pool.tasks.join_next() => break Err(worker_exit(joined)),
                _ = ticker.tick() => {
                    match self.sweep(&mut pool, &queue_tx, completed + 1).await {
                        Ok(SweepOutcome::Completed(summary)) => {
                            completed = summary.sweep;
                            self.sweeps.send_replace(Some(summary));
                        }
                        Ok(SweepOutcome::Skipped) => {}
                        Ok(SweepOutcome::Cancelled) => {
                            info!(
                                target: "reprovider",
                                "Sweep interrupted by shutdown. Exiting reprovider task."
                            );
                            break Ok(());
                        }
                        Err(err) => break Err(err),
                    }
                }
            }
        };

        queue_tx.close();
        pool.shutdown(self.config.provide_timeout).await;

        if let Err(err) = &result {
            error!(target: "reprovider", %err, "Reprovider stopped");
        }
        result
    }

    /// Queues every identifier due for announcement and waits for the workers to finish them.
    async fn sweep(
        &self,
        pool: &mut WorkerPool,
        queue: &async_channel::Sender<WorkItem>,
        number: u64,
    ) -> Result<SweepOutcome, ReproviderError> {
        let Some(ready) = pool.guard(&self.cancellation, self.router.is_ready()).await? else {
            return Ok(SweepOutcome::Cancelled);
        };
        if !ready {
            info!(target: "reprovider", sweep = number, "Routing not ready, skipping sweep");
            tessera_macros::inc!(counter, crate::Metrics::SWEEPS_SKIPPED_TOTAL);
            return Ok(SweepOutcome::Skipped);
        }

        debug!(target: "reprovider", sweep = number, "Starting sweep");
        let started = Instant::now();

        // Tears the pipeline stages down when the sweep ends, whichever way it ends.
        let pipeline = self.cancellation.child_token();
        let _pipeline_guard = pipeline.clone().drop_guard();
        let (mut candidates, report) = self.candidates(&pipeline)?;

        let counters = Arc::new(SweepCounters::default());
        let (drain_tx, mut drain_rx) = mpsc::channel::<()>(1);

        loop {
            let Some(next) = pool.guard(&self.cancellation, candidates.next()).await? else {
                return Ok(SweepOutcome::Cancelled);
            };
            let Some(id) = next.transpose()? else {
                break;
            };

            SweepCounters::bump(&counters.candidates);
            let item = WorkItem::new(*id.cid(), Arc::clone(&counters), drain_tx.clone());
            match pool.guard(&self.cancellation, queue.send(item)).await? {
                Some(Ok(())) => {}
                Some(Err(_)) => return Err(ReproviderError::WorkerExited),
                None => return Ok(SweepOutcome::Cancelled),
            }
        }

        drop(drain_tx);
        if pool.guard(&self.cancellation, drain_rx.recv()).await?.is_none() {
            return Ok(SweepOutcome::Cancelled);
        }

        let summary = counters.summarize(number, report.anomalies(), started.elapsed());
        info!(
            target: "reprovider",
            sweep = summary.sweep,
            candidates = summary.candidates,
            announced = summary.announced,
            failed = summary.failed,
            skipped_fresh = summary.skipped_fresh,
            anomalies = summary.anomalies,
            elapsed = ?summary.elapsed,
            "Sweep complete"
        );
        tessera_macros::inc!(counter, crate::Metrics::SWEEPS_TOTAL);
        tessera_macros::set!(gauge, crate::Metrics::SWEEP_CANDIDATES, summary.candidates as f64);
        tessera_macros::record!(
            histogram,
            crate::Metrics::SWEEP_DURATION_SECONDS,
            summary.elapsed.as_secs_f64()
        );
        Ok(SweepOutcome::Completed(summary))
    }

    /// Builds the sweep pipeline: the deduplicated union of every source, minus the ledger's
    /// fresh entries.
    fn candidates(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(SortedStream<ContentId, ReproviderError>, DiffReport), ReproviderError> {
        let sources: Vec<_> = self
            .sources
            .iter()
            .map(|source| dedupe(source.provide_keys(cancel.clone()), cancel.clone()))
            .collect();

        let multiple = sources.len() > 1;
        let mut held = merge(sources, cancel.clone())?;
        if multiple {
            held = dedupe(held, cancel.clone());
        }

        let fresh = dedupe(
            self.ledger.fresh_keys(cancel.clone()).map_err(ReproviderError::from),
            cancel.clone(),
        );
        Ok(diff_with_report(held, fresh, cancel.clone()))
    }
}

/// The announce workers and the signals that wind them down.
#[derive(Debug)]
struct WorkerPool {
    tasks: JoinSet<Result<(), ReproviderError>>,
    stop: CancellationToken,
    abort: CancellationToken,
}

impl WorkerPool {
    fn spawn<L, R>(
        ledger: &Arc<L>,
        router: &Arc<R>,
        config: &ReproviderConfig,
        queue: async_channel::Receiver<WorkItem>,
    ) -> Self
    where
        L: ProvideLedger + 'static,
        R: RoutingClient + 'static,
    {
        let (stop, abort) = (CancellationToken::new(), CancellationToken::new());
        let policy = AnnouncePolicy::from(config);

        let mut tasks = JoinSet::new();
        for id in 0..config.worker_count {
            let worker = Worker {
                id,
                ledger: Arc::clone(ledger),
                router: Arc::clone(router),
                policy,
                queue: queue.clone(),
                stop: stop.clone(),
                abort: abort.clone(),
            };
            tasks.spawn(worker.run());
        }
        Self { tasks, stop, abort }
    }

    /// Awaits `fut` unless `cancel` fires first or a worker exits.
    ///
    /// Workers only exit on their own when they fail, so an exit is reported as an error.
    async fn guard<F: Future>(
        &mut self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<Option<F::Output>, ReproviderError> {
        select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            Some(joined) = self.tasks.join_next() => Err(worker_exit(joined)),
            output = fut => Ok(Some(output)),
        }
    }

    /// Stops the workers, giving in-flight announcements `grace` to finish.
    async fn shutdown(mut self, grace: Duration) {
        self.stop.cancel();

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = self.tasks.join_next().await {
                log_shutdown_exit(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                target: "reprovider",
                remaining = self.tasks.len(),
                "Grace period elapsed, abandoning in-flight announcements"
            );
            self.abort.cancel();
            self.tasks.abort_all();
            while let Some(joined) = self.tasks.join_next().await {
                log_shutdown_exit(joined);
            }
        }
        debug!(target: "reprovider", "All workers stopped");
    }
}

fn worker_exit(joined: Result<Result<(), ReproviderError>, JoinError>) -> ReproviderError {
    match joined {
        Ok(Err(err)) => err,
        Ok(Ok(())) => ReproviderError::WorkerExited,
        Err(err) => ReproviderError::Worker(err),
    }
}

fn log_shutdown_exit(joined: Result<Result<(), ReproviderError>, JoinError>) {
    if matches!(&joined, Err(err) if err.is_cancelled()) {
        return;
    }
    if let Err(err) = joined.map_err(ReproviderError::from).and_then(|result| result) {
        warn!(target: "reprovider", %err, "Worker failed during shutdown");
    }
}
