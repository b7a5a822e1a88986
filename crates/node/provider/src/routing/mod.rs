//! The content-routing client the reprovider announces through.

use async_trait::async_trait;
use cid::Cid;
use std::fmt::Debug;
use thiserror::Error;
use tokio::time::Instant;

mod queued;
pub use queued::{ProvideRequest, QueuedRoutingClient, record_key};

/// Errors returned by a [`RoutingClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The announcement did not complete before its deadline.
    #[error("Provide timed out")]
    Timeout,

    /// The routing layer refused or failed the announcement.
    #[error("Provide rejected: {0}")]
    Rejected(String),

    /// The component driving the routing layer is gone.
    #[error("Routing channel closed")]
    ChannelClosed,

    /// The routing layer is not connected to enough peers yet.
    #[error("Routing not ready")]
    NotReady,
}

impl RoutingError {
    /// Returns whether retrying the same announcement may succeed.
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::ChannelClosed)
    }
}

/// Client used to announce identifiers on the content-routing index (the DHT).
///
/// Announcing is idempotent: repeating an announcement only costs network effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingClient: Debug + Send + Sync {
    /// Announces that this node provides `cid`.
    ///
    /// Implementations should give up once `deadline` passes; the caller stops waiting then
    /// regardless.
    async fn provide(
        &self,
        cid: &Cid,
        broadcast: bool,
        deadline: Instant,
    ) -> Result<(), RoutingError>;

    /// Returns whether the routing layer can currently accept announcements.
    ///
    /// A sweep is skipped while this is `false`.
    async fn is_ready(&self) -> bool {
        true
    }
}
