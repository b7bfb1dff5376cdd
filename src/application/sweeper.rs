//! Periodic eviction of expired artifacts.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::store::ArtifactStore;

/// Running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
        debug!(target = "mdconvert::sweeper", "artifact sweeper stopped");
    }
}

/// Spawn a task that sweeps `store` every `interval`.
pub fn spawn_sweeper(store: Arc<ArtifactStore>, interval: Duration) -> SweeperHandle {
    info!(
        target = "mdconvert::sweeper",
        interval_seconds = interval.as_secs(),
        retention_seconds = store.retention().whole_seconds(),
        "starting artifact sweeper"
    );

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.sweep();
            debug!(
                target = "mdconvert::sweeper",
                evicted,
                remaining = store.len(),
                "sweep finished"
            );
        }
    });

    SweeperHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::{ArtifactDraft, ArtifactKey};
    use time::OffsetDateTime;

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_expired_artifacts() {
        let store = Arc::new(ArtifactStore::new(Duration::from_secs(60)));
        let stale = OffsetDateTime::now_utc() - time::Duration::hours(2);
        store.put(
            ArtifactKey::generate("old.md"),
            ArtifactDraft::new("old.md", "old").uploaded_at(stale),
        );
        let fresh = ArtifactKey::generate("new.md");
        store.put(fresh.clone(), ArtifactDraft::new("new.md", "new"));

        let handle = spawn_sweeper(Arc::clone(&store), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.len(), 1);
        assert!(store.has(fresh.as_str()));

        handle.shutdown().await;
    }
}
