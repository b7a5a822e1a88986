//! Announce workers.

use crate::{
    LedgerError, ProvideLedger, ReproviderConfig, ReproviderError, RoutingClient, RoutingError,
    reprovider::summary::SweepCounters,
};
use backon::{ExponentialBuilder, Retryable};
use cid::Cid;
use std::{sync::Arc, time::Duration};
use tokio::{select, sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// An identifier due for announcement.
#[derive(Debug)]
pub(crate) struct WorkItem {
    pub(crate) cid: Cid,
    pub(crate) counters: Arc<SweepCounters>,
    /// Dropped with the item. The sweep is drained once every clone is gone.
    _drain: mpsc::Sender<()>,
}

impl WorkItem {
    pub(crate) const fn new(
        cid: Cid,
        counters: Arc<SweepCounters>,
        drain: mpsc::Sender<()>,
    ) -> Self {
        Self { cid, counters, _drain: drain }
    }
}

/// How a worker announces a single identifier.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AnnouncePolicy {
    timeout: Duration,
    ttl: Duration,
    broadcast: bool,
    max_attempts: usize,
    backoff: ExponentialBuilder,
}

impl From<&ReproviderConfig> for AnnouncePolicy {
    fn from(config: &ReproviderConfig) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(config.retry_min_delay)
            .with_max_delay(config.retry_max_delay)
            .with_max_times(config.max_attempts.saturating_sub(1))
            .with_jitter();
        Self {
            timeout: config.provide_timeout,
            ttl: config.provide_ttl,
            broadcast: config.broadcast,
            max_attempts: config.max_attempts,
            backoff,
        }
    }
}

/// Pulls identifiers off the work queue and announces them.
#[derive(Debug)]
pub(crate) struct Worker<L, R> {
    pub(crate) id: usize,
    pub(crate) ledger: Arc<L>,
    pub(crate) router: Arc<R>,
    pub(crate) policy: AnnouncePolicy,
    pub(crate) queue: async_channel::Receiver<WorkItem>,
    /// Stops pulling new items.
    pub(crate) stop: CancellationToken,
    /// Abandons the announcement in flight.
    pub(crate) abort: CancellationToken,
}

impl<L, R> Worker<L, R>
where
    L: ProvideLedger + 'static,
    R: RoutingClient + 'static,
{
    /// Runs until stopped or until the queue closes.
    ///
    /// Only a ledger failure ends the worker with an error; failed announcements are logged and
    /// skipped.
    pub(crate) async fn run(self) -> Result<(), ReproviderError> {
        trace!(target: "reprovider", worker = self.id, "Worker started");
        loop {
            let item = select! {
                biased;
                _ = self.stop.cancelled() => break,
                item = self.queue.recv() => match item {
                    Ok(item) => item,
                    Err(_) => break,
                },
            };
            self.handle(item).await.inspect_err(|err| {
                warn!(target: "reprovider", worker = self.id, %err, "Worker failed");
            })?;
        }
        trace!(target: "reprovider", worker = self.id, "Worker stopped");
        Ok(())
    }

    async fn handle(&self, item: WorkItem) -> Result<(), ReproviderError> {
        let cid = item.cid;
        let Some(fresh) = self.ledger_call(move |ledger| ledger.is_fresh(&cid)).await? else {
            debug!(target: "reprovider", worker = self.id, %cid, "Abandoning freshness check");
            return Ok(());
        };
        if fresh {
            trace!(target: "reprovider", %cid, "Block became fresh while queued, skipping");
            SweepCounters::bump(&item.counters.skipped_fresh);
            tessera_macros::inc!(counter, crate::Metrics::PROVIDE_SKIPPED_FRESH_TOTAL);
            return Ok(());
        }

        let outcome = select! {
            biased;
            _ = self.abort.cancelled() => {
                debug!(target: "reprovider", worker = self.id, %cid, "Abandoning announcement");
                return Ok(());
            }
            outcome = self.announce(&cid) => outcome,
        };

        match outcome {
            Ok(()) => {
                let ttl = self.policy.ttl;
                if self.ledger_call(move |ledger| ledger.mark_fresh(&cid, ttl)).await?.is_none() {
                    debug!(
                        target: "reprovider",
                        worker = self.id,
                        %cid,
                        "Abandoning ledger update"
                    );
                    return Ok(());
                }
                SweepCounters::bump(&item.counters.announced);
                tessera_macros::inc!(counter, crate::Metrics::PROVIDE_SUCCESS_TOTAL);
                trace!(target: "reprovider", worker = self.id, %cid, "Announced block");
            }
            Err(err) => {
                SweepCounters::bump(&item.counters.failed);
                tessera_macros::inc!(counter, crate::Metrics::PROVIDE_FAILURE_TOTAL);
                warn!(
                    target: "reprovider",
                    worker = self.id,
                    %cid,
                    %err,
                    max_attempts = self.policy.max_attempts,
                    "Failed to announce block, retrying next sweep"
                );
            }
        }
        Ok(())
    }

    /// Runs `call` against the ledger on the blocking pool.
    ///
    /// Returns `None` if the worker is aborted first. The call itself is left to finish in the
    /// background.
    async fn ledger_call<T, F>(&self, call: F) -> Result<Option<T>, ReproviderError>
    where
        T: Send + 'static,
        F: FnOnce(&L) -> Result<T, LedgerError> + Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let task = tokio::task::spawn_blocking(move || call(&ledger));
        select! {
            biased;
            _ = self.abort.cancelled() => Ok(None),
            joined = task => Ok(Some(joined??)),
        }
    }

    /// Announces `cid`, retrying transient failures with jittered exponential backoff.
    async fn announce(&self, cid: &Cid) -> Result<(), RoutingError> {
        let attempt = || async move {
            let deadline = Instant::now() + self.policy.timeout;
            let provide = self.router.provide(cid, self.policy.broadcast, deadline);
            tokio::time::timeout_at(deadline, provide).await.unwrap_or(Err(RoutingError::Timeout))
        };

        attempt
            .retry(self.policy.backoff)
            .sleep(tokio::time::sleep)
            .when(RoutingError::is_transient)
            .notify(|err: &RoutingError, delay: Duration| {
                tessera_macros::inc!(counter, crate::Metrics::PROVIDE_RETRIES_TOTAL);
                debug!(
                    target: "reprovider",
                    worker = self.id,
                    %cid,
                    %err,
                    ?delay,
                    "Announcement failed, backing off"
                );
            })
            .await
    }
}
