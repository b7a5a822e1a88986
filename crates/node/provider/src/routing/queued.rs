use crate::{RoutingClient, RoutingError};
use async_trait::async_trait;
use cid::Cid;
use derive_more::Constructor;
use libp2p::kad::RecordKey;
use tessera_blockstore::storage_key;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::Instant,
};

/// Returns the Kademlia record key under which `cid` is provided: its encoded multihash.
pub fn record_key(cid: &Cid) -> RecordKey {
    RecordKey::new(&storage_key(cid))
}

/// A request to start providing a record, answered once the routing layer is done with it.
#[derive(Debug)]
pub struct ProvideRequest {
    /// The record key to provide.
    pub key: RecordKey,
    /// Whether to push the provider record to the closest peers right away.
    pub broadcast: bool,
    /// The caller stops waiting for `reply` at this instant.
    pub deadline: Instant,
    /// Channel for the outcome.
    pub reply: oneshot::Sender<Result<(), RoutingError>>,
}

/// Queue-based implementation of the [`RoutingClient`] trait.
///
/// Requests go to whichever task owns the libp2p swarm; readiness is read from a watch
/// channel that task keeps up to date.
#[derive(Constructor, Debug, Clone)]
pub struct QueuedRoutingClient {
    /// A channel to send [`ProvideRequest`]s to the swarm owner.
    pub provide_request_tx: mpsc::Sender<ProvideRequest>,
    /// Whether the swarm can currently accept announcements.
    pub ready_rx: watch::Receiver<bool>,
}

#[async_trait]
impl RoutingClient for QueuedRoutingClient {
    async fn provide(
        &self,
        cid: &Cid,
        broadcast: bool,
        deadline: Instant,
    ) -> Result<(), RoutingError> {
        let (reply, reply_rx) = oneshot::channel();
        let request = ProvideRequest { key: record_key(cid), broadcast, deadline, reply };

        tokio::time::timeout_at(deadline, self.provide_request_tx.send(request))
            .await
            .map_err(|_| RoutingError::Timeout)?
            .map_err(|_| RoutingError::ChannelClosed)?;

        tokio::time::timeout_at(deadline, reply_rx)
            .await
            .map_err(|_| RoutingError::Timeout)?
            .map_err(|_| RoutingError::ChannelClosed)?
    }

    async fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tessera_blockstore::{Block, RAW_CODEC};

    fn client() -> (QueuedRoutingClient, mpsc::Receiver<ProvideRequest>, watch::Sender<bool>) {
        let (request_tx, request_rx) = mpsc::channel(4);
        let (ready_tx, ready_rx) = watch::channel(false);
        (QueuedRoutingClient::new(request_tx, ready_rx), request_rx, ready_tx)
    }

    #[tokio::test]
    async fn test_provide_round_trip() {
        let (client, mut requests, _ready) = client();
        let cid = *Block::new(RAW_CODEC, b"announced".to_vec()).cid();

        let responder = tokio::spawn(async move {
            let request = requests.recv().await.expect("request");
            assert_eq!(request.key, record_key(&cid));
            assert!(request.broadcast);
            request.reply.send(Err(RoutingError::Rejected("quorum failed".into()))).unwrap();
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = client.provide(&cid, true, deadline).await;
        assert_eq!(outcome, Err(RoutingError::Rejected("quorum failed".into())));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_reply_means_closed() {
        let (client, mut requests, _ready) = client();
        let cid = *Block::new(RAW_CODEC, b"dropped".to_vec()).cid();

        tokio::spawn(async move { drop(requests.recv().await) });

        let outcome = client.provide(&cid, false, Instant::now() + Duration::from_secs(5)).await;
        assert_eq!(outcome, Err(RoutingError::ChannelClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out() {
        let (client, _requests, _ready) = client();
        let cid = *Block::new(RAW_CODEC, b"ignored".to_vec()).cid();

        let outcome = client.provide(&cid, false, Instant::now() + Duration::from_secs(60)).await;
        assert_eq!(outcome, Err(RoutingError::Timeout));
    }

    #[tokio::test]
    async fn test_readiness_follows_watch() {
        let (client, _requests, ready) = client();
        assert!(!client.is_ready().await);

        ready.send(true).unwrap();
        assert!(client.is_ready().await);
    }

    #[test]
    fn test_record_key_is_the_multihash() {
        let cid = *Block::new(RAW_CODEC, b"key".to_vec()).cid();
        assert_eq!(record_key(&cid).as_ref(), cid.hash().to_bytes().as_slice());
    }
}
