//! Cancellable, ordered enumeration of a RocksDB column family.

use crate::{ContentId, KeyStream};
use futures::StreamExt;
use rocksdb::{DB, IteratorMode};
use std::sync::Arc;
use thiserror::Error;
use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A column family expected by the database schema does not exist.
#[derive(Debug, Error)]
#[error("Missing column family: {0}")]
pub struct MissingColumnFamily(pub &'static str);

/// Streams the rows of `cf_name` in key order, decoding each into a [`ContentId`].
///
/// The RocksDB iterator runs on the blocking pool and hands rows over a channel holding at
/// most `capacity` items, so a slow consumer throttles the scan. `decode` may return
/// `Ok(None)` to skip a row. The scan ends after the last row, after the first error (which
/// is yielded), when `cancel` fires, or when the returned stream is dropped; in every case the
/// iterator and its implicit snapshot are released. Writers are never blocked by a scan.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn scan_column_family<E, F>(
    db: Arc<DB>,
    cf_name: &'static str,
    capacity: usize,
    cancel: CancellationToken,
    mut decode: F,
) -> KeyStream<E>
where
    E: From<rocksdb::Error> + From<MissingColumnFamily> + Send + 'static,
    F: FnMut(&[u8], &[u8]) -> Result<Option<ContentId>, E> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = Handle::current();
    let producer_cancel = cancel.clone();

    handle.spawn_blocking({
        let handle = handle.clone();
        move || {
            // Hands one item to the consumer, parking the blocking thread until there is room.
            // Returns `false` once the scan must stop.
            let send = |item: Result<ContentId, E>| {
                handle.block_on(async {
                    tokio::select! {
                        biased;
                        _ = producer_cancel.cancelled() => false,
                        sent = tx.send(item) => sent.is_ok(),
                    }
                })
            };

            let Some(cf) = db.cf_handle(cf_name) else {
                send(Err(MissingColumnFamily(cf_name).into()));
                return;
            };

            let mut rows = 0usize;
            for entry in db.iterator_cf(cf, IteratorMode::Start) {
                if producer_cancel.is_cancelled() || tx.is_closed() {
                    debug!(target: "blockstore", cf = cf_name, rows, "Scan cancelled");
                    return;
                }

                let item = match entry {
                    Ok((key, value)) => match decode(&key[..], &value[..]) {
                        Ok(Some(id)) => Ok(id),
                        Ok(None) => continue,
                        Err(err) => Err(err),
                    },
                    Err(err) => Err(err.into()),
                };

                let terminal = item.is_err();
                if !send(item) || terminal {
                    debug!(
                        target: "blockstore",
                        cf = cf_name,
                        rows,
                        terminal,
                        "Scan stopped early"
                    );
                    return;
                }
                rows += 1;
            }

            trace!(target: "blockstore", cf = cf_name, rows, "Scan complete");
        }
    });

    ReceiverStream::new(rx).take_until(cancel.cancelled_owned()).boxed()
}
