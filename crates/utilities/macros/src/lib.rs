#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tessera-sync/tessera/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![no_std]

/// Sets a metric value, optionally with a specified label.
///
/// Expands to nothing unless the calling crate enables its `metrics` feature.
#[macro_export]
macro_rules! set {
    ($instrument:ident, $metric:path, $key:expr, $value:expr, $amount:expr) => {
        #[cfg(feature = "metrics")]
        metrics::$instrument!($metric, $key => $value).set($amount);
    };
    ($instrument:ident, $metric:path, $amount:expr) => {
        #[cfg(feature = "metrics")]
        metrics::$instrument!($metric).set($amount);
    };
}

/// Increments a metric value by one, optionally with a specified label.
#[macro_export]
macro_rules! inc {
    ($instrument:ident, $metric:path, $key:expr, $value:expr) => {
        #[cfg(feature = "metrics")]
        metrics::$instrument!($metric, $key => $value).increment(1);
    };
    ($instrument:ident, $metric:path) => {
        #[cfg(feature = "metrics")]
        metrics::$instrument!($metric).increment(1);
    };
}

/// Records a value, optionally with a specified label.
#[macro_export]
macro_rules! record {
    ($instrument:ident, $metric:path, $key:expr, $value:expr, $amount:expr) => {
        #[cfg(feature = "metrics")]
        metrics::$instrument!($metric, $key => $value).record($amount);
    };
    ($instrument:ident, $metric:path, $amount:expr) => {
        #[cfg(feature = "metrics")]
        metrics::$instrument!($metric).record($amount);
    };
}
