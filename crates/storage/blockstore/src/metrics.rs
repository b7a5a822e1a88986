//! Metrics for the block store.

/// Container for block store metric identifiers.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of newly written blocks.
    pub const BLOCKS_WRITTEN_TOTAL: &'static str = "tessera_blockstore_blocks_written_total";

    /// Identifier for the counter of original payload bytes written.
    pub const BYTES_WRITTEN_TOTAL: &'static str = "tessera_blockstore_bytes_written_total";

    /// Identifier for the counter of blocks deleted.
    pub const BLOCKS_DELETED_TOTAL: &'static str = "tessera_blockstore_blocks_deleted_total";

    /// Identifier for the counter of point lookups that found nothing.
    pub const LOOKUP_MISSES_TOTAL: &'static str = "tessera_blockstore_lookup_misses_total";

    /// Initializes metrics for the block store.
    ///
    /// This does two things:
    /// * Describes the metrics so observers such as Prometheus can render help text.
    /// * Initializes the counters to zero so they are exported before the first event.
    pub fn init() {
        #[cfg(feature = "metrics")]
        {
            Self::describe();
            Self::zero();
        }
    }

    #[cfg(feature = "metrics")]
    fn describe() {
        metrics::describe_counter!(
            Self::BLOCKS_WRITTEN_TOTAL,
            metrics::Unit::Count,
            "Blocks newly written to the block store"
        );
        metrics::describe_counter!(
            Self::BYTES_WRITTEN_TOTAL,
            metrics::Unit::Bytes,
            "Uncompressed payload bytes written to the block store"
        );
        metrics::describe_counter!(
            Self::BLOCKS_DELETED_TOTAL,
            metrics::Unit::Count,
            "Blocks deleted from the block store"
        );
        metrics::describe_counter!(
            Self::LOOKUP_MISSES_TOTAL,
            metrics::Unit::Count,
            "Block lookups for identifiers that are not stored"
        );
    }

    #[cfg(feature = "metrics")]
    fn zero() {
        metrics::counter!(Self::BLOCKS_WRITTEN_TOTAL).absolute(0);
        metrics::counter!(Self::BYTES_WRITTEN_TOTAL).absolute(0);
        metrics::counter!(Self::BLOCKS_DELETED_TOTAL).absolute(0);
        metrics::counter!(Self::LOOKUP_MISSES_TOTAL).absolute(0);
    }
}
