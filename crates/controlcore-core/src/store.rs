// ── Latest-value reading store ──
//
// Concurrent map of the most recent reading per sensor id, with
// push-based change notification via `watch` channels. Every mutation
// rebuilds the ordered snapshot that subscribers receive.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::freshness;
use crate::model::Reading;
use crate::stream::ReadingStream;

/// One entry per `sensor_id`; a newer message replaces the older one.
///
/// Snapshots are ordered by capture time, newest first, with ties broken
/// by sensor id so the order is total.
pub struct ReadingStore {
    by_id: DashMap<String, Arc<Reading>>,
    snapshot: watch::Sender<Arc<Vec<Arc<Reading>>>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (last_update, _) = watch::channel(None);

        Self {
            by_id: DashMap::new(),
            snapshot,
            last_update,
        }
    }

    /// Insert or replace the reading for its sensor id. Returns `true` if
    /// the id was new.
    pub fn upsert(&self, reading: Reading) -> bool {
        let is_new = self
            .by_id
            .insert(reading.sensor_id.clone(), Arc::new(reading))
            .is_none();
        self.rebuild_snapshot();
        is_new
    }

    pub fn get(&self, sensor_id: &str) -> Option<Arc<Reading>> {
        self.by_id.get(sensor_id).map(|r| Arc::clone(r.value()))
    }

    pub fn remove(&self, sensor_id: &str) -> Option<Arc<Reading>> {
        let removed = self.by_id.remove(sensor_id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    /// Current ordered snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<Reading>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> ReadingStream {
        ReadingStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Drop every reading older than `max_age_minutes` at `now`. Returns
    /// how many were removed.
    pub fn prune_stale(&self, now: DateTime<Utc>, max_age_minutes: f64) -> usize {
        let before = self.by_id.len();
        self.by_id
            .retain(|_, r| freshness::is_fresh_at(r.captured_at, now, max_age_minutes));
        let removed = before.saturating_sub(self.by_id.len());
        if removed > 0 {
            tracing::debug!(removed, max_age_minutes, "Pruned stale readings");
            self.rebuild_snapshot();
        }
        removed
    }

    pub fn clear(&self) {
        self.by_id.clear();
        self.rebuild_snapshot();
    }

    /// Wall-clock time of the last mutation, `None` before the first.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        // Collect under the watch write lock: the last writer to publish
        // must have observed every mutation that completed before it.
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| {
            let mut values: Vec<Arc<Reading>> =
                self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
            values.sort_by(|a, b| newest_first(a, b));
            *snap = Arc::new(values);
        });
        self.last_update.send_modify(|t| *t = Some(Utc::now()));
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingStore")
            .field("len", &self.by_id.len())
            .finish_non_exhaustive()
    }
}

fn newest_first(a: &Reading, b: &Reading) -> Ordering {
    b.captured_at
        .cmp(&a.captured_at)
        .then_with(|| a.sensor_id.cmp(&b.sensor_id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::fixtures::{reading, reading_at};

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000 + secs, 0).unwrap()
    }

    fn ids(store: &ReadingStore) -> Vec<String> {
        store.snapshot().iter().map(|r| r.sensor_id.clone()).collect()
    }

    #[test]
    fn upsert_replaces_by_sensor_id() {
        let store = ReadingStore::new();
        assert!(store.upsert(reading_at("a", "S1", "C1", "temp", t(0))));
        assert!(store.upsert(reading_at("b", "S1", "C1", "temp", t(1))));

        let mut newer = reading_at("a", "S1", "C1", "temp", t(5));
        newer.value = 99.0;
        assert!(!store.upsert(newer));

        assert_eq!(store.len(), 2);
        assert!((store.get("a").unwrap().value - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn latest_message_wins_even_if_older() {
        let store = ReadingStore::new();
        store.upsert(reading_at("a", "S1", "C1", "temp", t(10)));
        store.upsert(reading_at("a", "S2", "C1", "temp", t(0)));

        let kept = store.get("a").unwrap();
        assert_eq!(kept.station, "S2");
        assert_eq!(kept.captured_at, t(0));
    }

    #[test]
    fn snapshot_is_newest_first_with_id_tiebreak() {
        let store = ReadingStore::new();
        store.upsert(reading_at("old", "S1", "C1", "temp", t(0)));
        store.upsert(reading_at("zeta", "S1", "C1", "temp", t(10)));
        store.upsert(reading_at("alpha", "S1", "C1", "temp", t(10)));

        assert_eq!(ids(&store), vec!["alpha", "zeta", "old"]);
    }

    #[test]
    fn prune_stale_removes_only_old_readings() {
        let store = ReadingStore::new();
        let now = t(3600);
        store.upsert(reading_at("fresh", "S1", "C1", "temp", now - Duration::minutes(4)));
        store.upsert(reading_at("edge", "S1", "C1", "temp", now - Duration::minutes(5)));
        store.upsert(reading_at("stale", "S1", "C1", "temp", now - Duration::minutes(6)));

        assert_eq!(store.prune_stale(now, 5.0), 1);
        assert_eq!(ids(&store), vec!["fresh", "edge"]);
        assert_eq!(store.prune_stale(now, 5.0), 0);
    }

    #[test]
    fn remove_and_clear() {
        let store = ReadingStore::new();
        assert!(store.last_update().is_none());
        store.upsert(reading("a", "S1", "C1", "temp"));
        store.upsert(reading("b", "S1", "C1", "temp"));
        assert!(store.last_update().is_some());

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn snapshot_matches_map_after_concurrent_writers() {
        for _ in 0..100 {
            let store = Arc::new(ReadingStore::new());
            let writers: Vec<_> = (0..4)
                .map(|w| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        for i in 0..50 {
                            let id = format!("w{w}_s{i}");
                            store.upsert(reading(&id, "S1", "C1", "temp"));
                            if i % 3 == 0 {
                                store.remove(&id);
                            }
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            assert_eq!(store.snapshot().len(), store.len());
            let mut expected: Vec<String> =
                store.by_id.iter().map(|r| r.key().clone()).collect();
            let mut actual = ids(&store);
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected);
        }
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = ReadingStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.upsert(reading("a", "S1", "C1", "temp"));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().len(), 1);
    }
}
