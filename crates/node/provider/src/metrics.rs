//! Metrics for the reprovider.

/// Container for reprovider metric identifiers.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of completed sweeps.
    pub const SWEEPS_TOTAL: &'static str = "tessera_reprovider_sweeps_total";

    /// Identifier for the counter of sweeps skipped because routing was not ready.
    pub const SWEEPS_SKIPPED_TOTAL: &'static str = "tessera_reprovider_sweeps_skipped_total";

    /// Identifier for the histogram of sweep durations.
    pub const SWEEP_DURATION_SECONDS: &'static str = "tessera_reprovider_sweep_duration_seconds";

    /// Identifier for the gauge of candidates found by the latest sweep.
    pub const SWEEP_CANDIDATES: &'static str = "tessera_reprovider_sweep_candidates";

    /// Identifier for the counter of successful announcements.
    pub const PROVIDE_SUCCESS_TOTAL: &'static str = "tessera_reprovider_provide_success_total";

    /// Identifier for the counter of announcements that failed after every attempt.
    pub const PROVIDE_FAILURE_TOTAL: &'static str = "tessera_reprovider_provide_failure_total";

    /// Identifier for the counter of announcement retries.
    pub const PROVIDE_RETRIES_TOTAL: &'static str = "tessera_reprovider_provide_retries_total";

    /// Identifier for the counter of queued identifiers found fresh before announcement.
    pub const PROVIDE_SKIPPED_FRESH_TOTAL: &'static str =
        "tessera_reprovider_provide_skipped_fresh_total";

    /// Initializes metrics for the reprovider and the crates it drives.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    pub fn init() {
        tessera_blockstore::Metrics::init();
        tessera_sorted::Metrics::init();

        #[cfg(feature = "metrics")]
        {
            Self::describe();
            Self::zero();
        }
    }

    /// Describes metrics used in [`tessera_provider`][crate].
    #[cfg(feature = "metrics")]
    fn describe() {
        metrics::describe_counter!(
            Self::SWEEPS_TOTAL,
            metrics::Unit::Count,
            "Reprovide sweeps completed"
        );
        metrics::describe_counter!(
            Self::SWEEPS_SKIPPED_TOTAL,
            metrics::Unit::Count,
            "Reprovide sweeps skipped because content routing was not ready"
        );
        metrics::describe_histogram!(
            Self::SWEEP_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of a reprovide sweep, from start until its last announcement settled"
        );
        metrics::describe_gauge!(
            Self::SWEEP_CANDIDATES,
            "Identifiers the latest sweep found due for announcement"
        );
        metrics::describe_counter!(
            Self::PROVIDE_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Provider records announced"
        );
        metrics::describe_counter!(
            Self::PROVIDE_FAILURE_TOTAL,
            metrics::Unit::Count,
            "Provider records that could not be announced"
        );
        metrics::describe_counter!(
            Self::PROVIDE_RETRIES_TOTAL,
            metrics::Unit::Count,
            "Announcement attempts retried after a transient failure"
        );
        metrics::describe_counter!(
            Self::PROVIDE_SKIPPED_FRESH_TOTAL,
            metrics::Unit::Count,
            "Queued identifiers that were already fresh when a worker picked them up"
        );
    }

    /// Initializes metrics to `0` so they can be queried immediately by consumers of prometheus
    /// metrics.
    #[cfg(feature = "metrics")]
    fn zero() {
        metrics::counter!(Self::SWEEPS_TOTAL).absolute(0);
        metrics::counter!(Self::SWEEPS_SKIPPED_TOTAL).absolute(0);
        metrics::gauge!(Self::SWEEP_CANDIDATES).set(0.0);
        metrics::counter!(Self::PROVIDE_SUCCESS_TOTAL).absolute(0);
        metrics::counter!(Self::PROVIDE_FAILURE_TOTAL).absolute(0);
        metrics::counter!(Self::PROVIDE_RETRIES_TOTAL).absolute(0);
        metrics::counter!(Self::PROVIDE_SKIPPED_FRESH_TOTAL).absolute(0);
    }
}
