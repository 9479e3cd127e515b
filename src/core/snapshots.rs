//! Named, saved sets of open tabs that can be reopened later

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::browser::{TabSnapshot, WindowId};
use crate::data::{Storage, StoreError};
use crate::util::Clock;

/// Storage key of the snapshot list
pub const SNAPSHOTS_KEY: &str = "snapshots";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub window_id: WindowId,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub time: i64,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// URLs worth reopening, in capture order
    pub fn urls(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.url.is_empty())
            .map(|e| e.url.clone())
            .collect()
    }
}

/// Persisted snapshot list, newest first
#[derive(Clone)]
pub struct SnapshotStore {
    storage: Storage,
    clock: Arc<dyn Clock>,
}

impl SnapshotStore {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn list(&self) -> Result<Vec<Snapshot>, StoreError> {
        Ok(self
            .storage
            .get::<Vec<Snapshot>>(SNAPSHOTS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.list().await?.into_iter().find(|s| s.id == id))
    }

    /// Capture `tabs` under `name` and store it at the front of the list.
    /// A blank name becomes `Snapshot <time>`.
    pub async fn save(&self, name: &str, tabs: &[TabSnapshot]) -> Result<Snapshot, StoreError> {
        let time = self.clock.now_ms();
        let name = match name.trim() {
            "" => format!("Snapshot {}", time),
            trimmed => trimmed.to_string(),
        };
        let snapshot = Snapshot {
            id: format!("s_{}", Uuid::new_v4().simple()),
            name,
            time,
            entries: tabs
                .iter()
                .map(|t| SnapshotEntry {
                    url: t.url.clone(),
                    title: t.title.clone(),
                    window_id: t.window_id,
                    index: t.index,
                })
                .collect(),
        };
        let mut snapshots = self.list().await?;
        snapshots.insert(0, snapshot.clone());
        self.storage.set(SNAPSHOTS_KEY, &snapshots).await?;
        Ok(snapshot)
    }

    /// Returns whether a snapshot with `id` existed
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut snapshots = self.list().await?;
        let before = snapshots.len();
        snapshots.retain(|s| s.id != id);
        if snapshots.len() == before {
            return Ok(false);
        }
        self.storage.set(SNAPSHOTS_KEY, &snapshots).await?;
        Ok(true)
    }
}
