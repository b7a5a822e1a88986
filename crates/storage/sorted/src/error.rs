use thiserror::Error;

/// Errors returned when building a sorted-stream operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SortedError {
    /// A merge was requested over no sources at all.
    #[error("Merge requires at least one source")]
    NoSources,
}
