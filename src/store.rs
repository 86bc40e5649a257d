/// Multi-version store with per-key causal reconciliation.
///
/// Each key maps to the set of causally maximal versions written so far.
/// Writes are reconciled against the existing versions: an ancestor (or an
/// exact duplicate) is ignored, superseded versions are removed, and
/// concurrent versions accumulate as siblings. Reads return a snapshot of
/// the current frontier.
///
/// # Locking
///
/// Two tiers. The `DashMap` is the map tier: it is touched only to look up
/// or lazily insert a key's slot, and its guard is always dropped before
/// any `.await`. Each slot holds its own `RwLock` around the entry list, so
/// writes to the same key serialize while distinct keys proceed in
/// parallel. Slots live for the process lifetime once created.
use crate::clock::{Context, VectorClock};
use crate::types::ObjectEntry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of reconciling one incoming version against a key's entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The version was appended (possibly superseding older entries).
    Applied,
    /// The version was an ancestor of, or equal to, a stored entry; the
    /// store was left unchanged. Reported as success at the RPC level.
    Obsolete,
}

/// Per-key multi-version storage shared by the coordinator and RPC surface.
#[derive(Debug, Default)]
pub struct VersionedStore {
    entries: DashMap<String, Arc<RwLock<Vec<ObjectEntry>>>>,
}

impl VersionedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key's slot, creating it lazily.
    ///
    /// The map-tier guard is confined to this function so it can never be
    /// held across an await point.
    fn slot(&self, key: &str) -> Arc<RwLock<Vec<ObjectEntry>>> {
        if let Some(slot) = self.entries.get(key) {
            return Arc::clone(&slot);
        }
        Arc::clone(&self.entries.entry(key.to_string()).or_default())
    }

    /// Reconcile one version into the entry list for `key`.
    ///
    /// Holds the per-key write lock for the duration of the scan:
    ///
    /// - if the incoming clock is an ancestor of, or equal to, any stored
    ///   entry's clock, nothing changes ([`WriteOutcome::Obsolete`]);
    /// - otherwise every entry strictly dominated by the incoming clock is
    ///   removed and the new version appended ([`WriteOutcome::Applied`]).
    ///
    /// Concurrent versions accumulate as siblings; equal-clock duplicates
    /// are never added.
    pub async fn put_raw(&self, key: &str, clock: VectorClock, value: Vec<u8>) -> WriteOutcome {
        let slot = self.slot(key);
        let mut list = slot.write().await;

        for entry in list.iter() {
            if clock.less_than(&entry.context.clock) || clock == entry.context.clock {
                return WriteOutcome::Obsolete;
            }
        }

        list.retain(|entry| !entry.context.clock.less_than(&clock));
        list.push(ObjectEntry::new(Context::new(clock), value));

        WriteOutcome::Applied
    }

    /// Snapshot the current entries for `key` under the per-key read lock.
    ///
    /// An absent key yields an empty list without creating a slot.
    pub async fn get_raw(&self, key: &str) -> Vec<ObjectEntry> {
        let slot = match self.entries.get(key) {
            Some(slot) => Arc::clone(&slot),
            None => return Vec::new(),
        };

        let snapshot = slot.read().await.clone();
        snapshot
    }

    /// Snapshot the current key set.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of keys with a slot (including keys whose list is empty).
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(entries: &[(&str, u64)]) -> VectorClock {
        entries.iter().map(|&(id, c)| (id, c)).collect()
    }

    #[tokio::test]
    async fn first_write_is_applied() {
        let store = VersionedStore::new();

        let outcome = store.put_raw("k", clock(&[("n0", 1)]), b"v0".to_vec()).await;
        assert_eq!(outcome, WriteOutcome::Applied);

        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"v0");
        assert_eq!(entries[0].context.clock, clock(&[("n0", 1)]));
    }

    #[tokio::test]
    async fn ancestor_write_leaves_store_unchanged() {
        let store = VersionedStore::new();
        store.put_raw("k", clock(&[("n0", 2)]), b"v1".to_vec()).await;

        let outcome = store.put_raw("k", clock(&[("n0", 1)]), b"v0".to_vec()).await;
        assert_eq!(outcome, WriteOutcome::Obsolete);

        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"v1");
    }

    #[tokio::test]
    async fn equal_clock_write_is_rejected() {
        let store = VersionedStore::new();
        store.put_raw("k", clock(&[("n0", 1)]), b"v0".to_vec()).await;

        // Same clock, different payload: the first write wins.
        let outcome = store.put_raw("k", clock(&[("n0", 1)]), b"other".to_vec()).await;
        assert_eq!(outcome, WriteOutcome::Obsolete);

        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"v0");
    }

    #[tokio::test]
    async fn dominating_write_supersedes() {
        let store = VersionedStore::new();
        store.put_raw("k", clock(&[("n0", 1)]), b"v0".to_vec()).await;

        let outcome = store
            .put_raw("k", clock(&[("n0", 2), ("n1", 1)]), b"v1".to_vec())
            .await;
        assert_eq!(outcome, WriteOutcome::Applied);

        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"v1");
    }

    #[tokio::test]
    async fn concurrent_writes_become_siblings() {
        let store = VersionedStore::new();
        store.put_raw("k", clock(&[("n0", 1)]), b"a".to_vec()).await;
        store.put_raw("k", clock(&[("n1", 1)]), b"b".to_vec()).await;

        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 2);

        // No stored pair may be causally ordered.
        for (i, x) in entries.iter().enumerate() {
            for y in entries.iter().skip(i + 1) {
                assert!(x.context.clock.concurrent(&y.context.clock));
            }
        }
    }

    #[tokio::test]
    async fn combined_write_collapses_siblings() {
        let store = VersionedStore::new();
        store.put_raw("k", clock(&[("n0", 1)]), b"a".to_vec()).await;
        store.put_raw("k", clock(&[("n1", 1)]), b"b".to_vec()).await;

        let mut merged = VectorClock::new();
        merged.combine([&clock(&[("n0", 1)]), &clock(&[("n1", 1)])]);
        merged.increment("n0");

        let outcome = store.put_raw("k", merged, b"c".to_vec()).await;
        assert_eq!(outcome, WriteOutcome::Applied);

        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"c");
    }

    #[tokio::test]
    async fn absent_key_reads_empty() {
        let store = VersionedStore::new();
        assert!(store.get_raw("missing").await.is_empty());
        // Reading must not materialize a slot.
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn get_raw_returns_a_snapshot() {
        let store = VersionedStore::new();
        store.put_raw("k", clock(&[("n0", 1)]), b"v0".to_vec()).await;

        let snapshot = store.get_raw("k").await;
        store.put_raw("k", clock(&[("n0", 2)]), b"v1".to_vec()).await;

        // The earlier snapshot is unaffected by the later write.
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].value, b"v0");
    }

    #[tokio::test]
    async fn keys_snapshot_lists_written_keys() {
        let store = VersionedStore::new();
        store.put_raw("a", clock(&[("n0", 1)]), b"1".to_vec()).await;
        store.put_raw("b", clock(&[("n0", 1)]), b"2".to_vec()).await;

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn same_key_writes_serialize_across_tasks() {
        let store = Arc::new(VersionedStore::new());

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let c = clock(&[("n0", i + 1)]);
                store.put_raw("k", c, vec![i as u8]).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whatever the interleaving, only the maximal version survives.
        let entries = store.get_raw("k").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].context.clock, clock(&[("n0", 8)]));
    }
}
