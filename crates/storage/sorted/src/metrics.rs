//! Metrics for the sorted-stream operators.

/// Container for sorted-stream metric identifiers.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of subset entries a diff found no match for.
    pub const DIFF_ANOMALIES_TOTAL: &'static str = "tessera_sorted_diff_anomalies_total";

    /// Initializes metrics for the sorted-stream operators.
    ///
    /// This does two things:
    /// * Describes the metrics.
    /// * Initializes the counters to zero.
    pub fn init() {
        #[cfg(feature = "metrics")]
        {
            metrics::describe_counter!(
                Self::DIFF_ANOMALIES_TOTAL,
                metrics::Unit::Count,
                "Subset entries skipped by a diff because the full set lacked them"
            );
            metrics::counter!(Self::DIFF_ANOMALIES_TOTAL).absolute(0);
        }
    }
}
