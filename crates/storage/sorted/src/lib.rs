#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tessera-sync/tessera/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use futures::stream::BoxStream;

/// An ascending stream produced by one of the operators.
pub type SortedStream<T, E> = BoxStream<'static, Result<T, E>>;

mod error;
pub use error::SortedError;

mod stage;
pub use stage::STAGE_CAPACITY;

mod dedupe;
pub use dedupe::dedupe;

mod merge;
pub use merge::merge;

mod diff;
pub use diff::{DiffReport, diff, diff_with_report};

/// Metrics for the sorted-stream operators.
mod metrics;
pub use metrics::Metrics;
