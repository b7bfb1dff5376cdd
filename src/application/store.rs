//! In-memory artifact store with time-based retention.
//!
//! Entries live in a sharded [`DashMap`], so lookups and inserts on
//! different keys proceed in parallel and the sweep only ever locks one
//! shard at a time. Artifacts are handed out as `Arc`s and never mutated,
//! so a reader racing an eviction either gets the whole entry or nothing.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, gauge};
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::artifact::{Artifact, ArtifactDraft, ArtifactKey};

pub(crate) const METRIC_ARTIFACTS_LIVE: &str = "mdconvert_artifacts_live";
pub(crate) const METRIC_ARTIFACTS_EVICTED: &str = "mdconvert_artifacts_evicted_total";

/// Default maximum age of an artifact.
pub const DEFAULT_RETENTION: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Snapshot returned by [`ArtifactStore::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub count: usize,
    /// Live keys in lexical order.
    pub keys: Vec<String>,
}

#[derive(Debug)]
pub struct ArtifactStore {
    entries: DashMap<String, Arc<Artifact>>,
    retention: time::Duration,
}

impl ArtifactStore {
    pub fn new(retention: std::time::Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention: time::Duration::try_from(retention).unwrap_or(time::Duration::MAX),
        }
    }

    pub fn retention(&self) -> time::Duration {
        self.retention
    }

    /// Insert or replace the artifact stored under `key`.
    pub fn put(&self, key: ArtifactKey, draft: ArtifactDraft) -> Arc<Artifact> {
        let artifact = Arc::new(Artifact::from_draft(
            key.clone(),
            draft,
            OffsetDateTime::now_utc(),
        ));
        self.entries
            .insert(key.as_str().to_string(), Arc::clone(&artifact));
        gauge!(METRIC_ARTIFACTS_LIVE).set(self.entries.len() as f64);
        artifact
    }

    pub fn get(&self, key: &str) -> Option<Arc<Artifact>> {
        self.get_at(key, OffsetDateTime::now_utc())
    }

    /// Look up `key` as seen at `now`; an expired entry is removed and
    /// reported as absent.
    pub fn get_at(&self, key: &str, now: OffsetDateTime) -> Option<Arc<Artifact>> {
        let artifact = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;
        if artifact.is_expired(now, self.retention) {
            let removed = self
                .entries
                .remove_if(key, |_, current| current.is_expired(now, self.retention))
                .is_some();
            if removed {
                counter!(METRIC_ARTIFACTS_EVICTED, "reason" => "lookup").increment(1);
                gauge!(METRIC_ARTIFACTS_LIVE).set(self.entries.len() as f64);
            }
            return None;
        }
        Some(artifact)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key`, returning whether an entry existed.
    pub fn delete(&self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            gauge!(METRIC_ARTIFACTS_LIVE).set(self.entries.len() as f64);
        }
        existed
    }

    pub fn stats(&self) -> StoreStats {
        let mut keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        keys.sort_unstable();
        StoreStats {
            count: keys.len(),
            keys,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict everything older than the retention window. Returns the number
    /// of artifacts removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(OffsetDateTime::now_utc())
    }

    pub fn sweep_at(&self, now: OffsetDateTime) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, artifact| !artifact.is_expired(now, self.retention));
        let after = self.entries.len();
        let evicted = before.saturating_sub(after);

        if evicted > 0 {
            counter!(METRIC_ARTIFACTS_EVICTED, "reason" => "sweep").increment(evicted as u64);
        }
        gauge!(METRIC_ARTIFACTS_LIVE).set(after as f64);
        debug!(
            target = "mdconvert::store",
            evicted,
            remaining = after,
            "artifact sweep finished"
        );
        evicted
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn key(raw: &str) -> ArtifactKey {
        ArtifactKey::parse(raw).expect("valid key")
    }

    #[test]
    fn put_then_get_returns_the_same_artifact() {
        let store = ArtifactStore::default();
        let stored = store.put(key("a_notes.md"), ArtifactDraft::new("notes.md", "# Notes"));

        let fetched = store.get("a_notes.md").expect("present");
        assert!(Arc::ptr_eq(&stored, &fetched));
        assert_eq!(fetched.content, "# Notes");
        assert!(store.has("a_notes.md"));
        assert!(!store.has("b_notes.md"));
    }

    #[test]
    fn put_overwrites_existing_key() {
        let store = ArtifactStore::default();
        store.put(key("a_notes.md"), ArtifactDraft::new("notes.md", "old"));
        store.put(key("a_notes.md"), ArtifactDraft::new("notes.md", "new"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a_notes.md").expect("present").content, "new");
    }

    #[test]
    fn delete_reports_whether_entry_existed() {
        let store = ArtifactStore::default();
        store.put(key("a_notes.md"), ArtifactDraft::new("notes.md", ""));

        assert!(store.delete("a_notes.md"));
        assert!(!store.delete("a_notes.md"));
        assert!(store.is_empty());
    }

    #[test]
    fn stats_lists_sorted_keys() {
        let store = ArtifactStore::default();
        store.put(key("b_two.md"), ArtifactDraft::new("two.md", ""));
        store.put(key("a_one.md"), ArtifactDraft::new("one.md", ""));

        let stats = store.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.keys, vec!["a_one.md".to_string(), "b_two.md".to_string()]);
    }

    #[test]
    fn sweep_removes_only_expired_artifacts() {
        let store = ArtifactStore::new(std::time::Duration::from_secs(3600));
        let t0 = datetime!(2025-03-01 08:00 UTC);
        store.put(
            key("old_a.md"),
            ArtifactDraft::new("a.md", "").uploaded_at(t0),
        );
        store.put(
            key("new_b.md"),
            ArtifactDraft::new("b.md", "").uploaded_at(t0 + time::Duration::minutes(30)),
        );

        assert_eq!(store.sweep_at(t0 + time::Duration::hours(1)), 0);
        assert_eq!(
            store.sweep_at(t0 + time::Duration::hours(1) + time::Duration::seconds(1)),
            1
        );
        assert_eq!(store.stats().keys, vec!["new_b.md".to_string()]);
    }

    #[test]
    fn lookup_hides_expired_artifacts_before_any_sweep() {
        let store = ArtifactStore::new(std::time::Duration::from_secs(60));
        let t0 = datetime!(2025-03-01 08:00 UTC);
        store.put(key("k_a.md"), ArtifactDraft::new("a.md", "x").uploaded_at(t0));

        assert!(store.get_at("k_a.md", t0 + time::Duration::seconds(59)).is_some());
        assert!(store.get_at("k_a.md", t0 + time::Duration::seconds(60)).is_some());
        assert!(store.get_at("k_a.md", t0 + time::Duration::seconds(61)).is_none());
        assert!(store.is_empty());
    }
}
