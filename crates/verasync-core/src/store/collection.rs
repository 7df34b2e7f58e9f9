// ── Generic reactive entity collection ──
//
// Concurrent storage keyed by hub id, with push-based change
// notification via `watch` channels.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection for a single entity type.
///
/// Uses `DashMap` for O(1) concurrent lookups and a `watch` channel for
/// push-based change notification. Every mutation rebuilds the snapshot
/// that subscribers receive; snapshots are ordered by id.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_id: DashMap<u32, Arc<T>>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, id: u32, entity: T) -> bool {
        let is_new = self.by_id.insert(id, Arc::new(entity)).is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Remove an entity by id. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, id: u32) -> Option<Arc<T>> {
        let removed = self.by_id.remove(&id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get(&self, id: u32) -> Option<Arc<T>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    /// Remove all entities.
    pub(crate) fn clear(&self) {
        self.by_id.clear();
        self.rebuild_snapshot();
    }

    /// Run several mutations against the raw map and publish a single
    /// snapshot afterwards.
    ///
    /// The closure must not hold a `DashMap` guard across an `insert`.
    pub(crate) fn batch<R>(&self, f: impl FnOnce(&DashMap<u32, Arc<T>>) -> R) -> R {
        let result = f(&self.by_id);
        self.rebuild_snapshot();
        result
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values into a snapshot vec and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let mut values: Vec<(u32, Arc<T>)> = self
            .by_id
            .iter()
            .map(|r| (*r.key(), Arc::clone(r.value())))
            .collect();
        values.sort_unstable_by_key(|(id, _)| *id);
        let values = values.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_ids() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.upsert(1, "hello".into()));
        assert!(!col.upsert(1, "world".into()));
        assert_eq!(*col.get(1).unwrap(), "world");
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert(1, "a".into());
        col.upsert(2, "b".into());

        assert_eq!(*col.remove(1).unwrap(), "a");
        assert!(col.remove(1).is_none());
        assert_eq!(col.snapshot().len(), 1);

        col.clear();
        assert!(col.is_empty());
        assert!(col.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert(30, "c".into());
        col.upsert(10, "a".into());
        col.upsert(20, "b".into());

        let snap = col.snapshot();
        let names: Vec<&str> = snap.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn batch_publishes_once() {
        let col: EntityCollection<String> = EntityCollection::new();
        let mut rx = col.subscribe();
        rx.borrow_and_update();

        col.batch(|map| {
            map.insert(1, Arc::new("a".into()));
            map.insert(2, Arc::new("b".into()));
        });

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
        assert!(!rx.has_changed().unwrap());
    }
}
