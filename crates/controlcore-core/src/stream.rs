// ── Reactive reading stream ──
//
// Subscription type for consuming store changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Reading;

type Snapshot = Arc<Vec<Arc<Reading>>>;

/// A subscription to the [`ReadingStore`](crate::ReadingStore).
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct ReadingStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl ReadingStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot as of creation or the last `changed()`.
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` yielding the current snapshot, then one per change.
    pub fn into_stream(self) -> ReadingWatchStream {
        ReadingWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct ReadingWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for ReadingWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use crate::model::fixtures::reading;
    use crate::store::ReadingStore;

    #[tokio::test]
    async fn into_stream_yields_current_then_updates() {
        let store = ReadingStore::new();
        store.upsert(reading("a", "S1", "C1", "temp"));

        let mut stream = store.subscribe().into_stream();
        assert_eq!(stream.next().await.unwrap().len(), 1);

        store.upsert(reading("b", "S1", "C1", "temp"));
        assert_eq!(stream.next().await.unwrap().len(), 2);
    }

    #[test]
    fn latest_tracks_store_without_waiting() {
        let store = ReadingStore::new();
        let stream = store.subscribe();
        store.upsert(reading("a", "S1", "C1", "temp"));

        assert!(stream.current().is_empty());
        assert_eq!(stream.latest().len(), 1);
    }
}
