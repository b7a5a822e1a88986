//! The reprovider and its configuration.

mod config;
pub use config::{
    ConfigError, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROVIDE_TIMEOUT, DEFAULT_PROVIDE_TTL,
    DEFAULT_REPROVIDE_INTERVAL, DEFAULT_WORKER_COUNT, ReproviderConfig,
};

mod error;
pub use error::ReproviderError;

mod summary;
pub use summary::SweepSummary;

mod source;
pub use source::ProvideSource;

mod worker;

mod builder;
pub use builder::ReproviderBuilder;

mod actor;
pub use actor::Reprovider;
