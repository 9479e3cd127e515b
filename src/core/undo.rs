//! Bounded stack of reversible tab-closure batches

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::browser::{TabId, TabSnapshot, WindowId};
use crate::config::DEFAULT_UNDO_CAPACITY;
use crate::data::{Storage, StoreError};
use crate::util::Clock;

/// Storage key of the undo stack
pub const UNDO_KEY: &str = "undoStack";

/// Pre-removal attributes of a closed tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedTabEntry {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub window_id: Option<WindowId>,
    /// Epoch milliseconds at removal
    pub time: i64,
}

impl RemovedTabEntry {
    pub fn capture(tab: &TabSnapshot, time: i64) -> Self {
        Self {
            id: tab.id,
            url: tab.url.clone(),
            title: tab.title.clone(),
            index: Some(tab.index),
            window_id: Some(tab.window_id),
            time,
        }
    }
}

/// Tabs closed together by one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoBatch {
    pub time: i64,
    pub entries: Vec<RemovedTabEntry>,
}

/// Persistent LIFO of [`UndoBatch`]es, oldest first in storage
#[derive(Clone)]
pub struct UndoLog {
    storage: Storage,
    clock: Arc<dyn Clock>,
    capacity: usize,
}

impl UndoLog {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            capacity: DEFAULT_UNDO_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All batches, oldest first
    pub async fn batches(&self) -> Result<Vec<UndoBatch>, StoreError> {
        Ok(self
            .storage
            .get::<Vec<UndoBatch>>(UNDO_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.batches().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Record a batch, evicting the oldest beyond capacity. Durable on `Ok`.
    pub async fn push(&self, entries: Vec<RemovedTabEntry>) -> Result<(), StoreError> {
        let mut stack = self.batches().await?;
        stack.push(UndoBatch {
            time: self.clock.now_ms(),
            entries,
        });
        if stack.len() > self.capacity {
            let overflow = stack.len() - self.capacity;
            stack.drain(..overflow);
        }
        self.storage.set(UNDO_KEY, &stack).await
    }

    /// Remove and return the newest batch.
    ///
    /// The shortened stack is written before the batch is handed out, so a
    /// failed write never yields a batch that could be applied twice.
    pub async fn pop(&self) -> Result<Option<UndoBatch>, StoreError> {
        let mut stack = self.batches().await?;
        let Some(batch) = stack.pop() else {
            return Ok(None);
        };
        self.storage.set(UNDO_KEY, &stack).await?;
        Ok(Some(batch))
    }
}
