//! Last-active timestamps per tab

use std::collections::HashMap;
use std::sync::Arc;

use crate::browser::TabId;
use crate::data::{Storage, StoreError};
use crate::util::Clock;

/// Namespace for activity keys in the shared store
pub const ACTIVITY_KEY_PREFIX: &str = "activity:";

fn activity_key(tab_id: TabId) -> String {
    format!("{}{}", ACTIVITY_KEY_PREFIX, tab_id.0)
}

/// Records when each tab was last the active tab in its window
#[derive(Clone)]
pub struct ActivityTracker {
    storage: Storage,
    clock: Arc<dyn Clock>,
}

impl ActivityTracker {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Stamp `tab_id` as active now. Best effort: a failed write is logged and dropped.
    pub async fn record_active(&self, tab_id: TabId) -> Option<i64> {
        let now = self.clock.now_ms();
        match self.storage.set(&activity_key(tab_id), &now).await {
            Ok(()) => Some(now),
            Err(e) => {
                tracing::warn!(tab_id = %tab_id, error = %e, "Failed to record tab activity");
                None
            }
        }
    }

    pub async fn last_active(&self, tab_id: TabId) -> Result<Option<i64>, StoreError> {
        self.storage.get(&activity_key(tab_id)).await
    }

    /// Read the records for a set of live tabs at once. Untracked tabs are absent.
    pub async fn snapshot(&self, tab_ids: &[TabId]) -> Result<HashMap<TabId, i64>, StoreError> {
        let mut records = HashMap::new();
        for &tab_id in tab_ids {
            if let Some(ts) = self.last_active(tab_id).await? {
                records.insert(tab_id, ts);
            }
        }
        Ok(records)
    }

    /// Drop the record of a closed tab
    pub async fn forget(&self, tab_id: TabId) -> Result<(), StoreError> {
        self.storage.remove(&activity_key(tab_id)).await
    }

    /// Ids of every tab with a stored record
    pub async fn tracked(&self) -> Result<Vec<TabId>, StoreError> {
        let keys = self.storage.keys_with_prefix(ACTIVITY_KEY_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|k| k.strip_prefix(ACTIVITY_KEY_PREFIX)?.parse().ok())
            .map(TabId)
            .collect())
    }
}
