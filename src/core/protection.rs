//! Durable set of tabs exempt from automatic closure

use std::collections::HashSet;

use crate::browser::TabId;
use crate::data::{Storage, StoreError};

/// Storage key of the protected set
pub const PROTECTED_KEY: &str = "protectedTabs";

/// Protected ("bookmarked") tabs.
///
/// Persisted as an ordered list with set semantics. Every mutation is a
/// read-modify-write of the whole list; callers must not interleave two
/// mutations (the dispatcher guarantees this).
#[derive(Clone)]
pub struct ProtectionRegistry {
    storage: Storage,
}

impl ProtectionRegistry {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Protected ids in the order they were protected
    pub async fn list(&self) -> Result<Vec<TabId>, StoreError> {
        Ok(self
            .storage
            .get::<Vec<TabId>>(PROTECTED_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn get_all(&self) -> Result<HashSet<TabId>, StoreError> {
        Ok(self.list().await?.into_iter().collect())
    }

    pub async fn is_protected(&self, tab_id: TabId) -> Result<bool, StoreError> {
        Ok(self.list().await?.contains(&tab_id))
    }

    /// Flip membership and return the new state (`true` = now protected)
    pub async fn toggle(&self, tab_id: TabId) -> Result<bool, StoreError> {
        let mut ids = self.list().await?;
        let added = match ids.iter().position(|id| *id == tab_id) {
            Some(pos) => {
                ids.remove(pos);
                false
            }
            None => {
                ids.push(tab_id);
                true
            }
        };
        self.storage.set(PROTECTED_KEY, &ids).await?;
        Ok(added)
    }

    /// Protect `tab_id`; returns false if it already was
    pub async fn add(&self, tab_id: TabId) -> Result<bool, StoreError> {
        let mut ids = self.list().await?;
        if ids.contains(&tab_id) {
            return Ok(false);
        }
        ids.push(tab_id);
        self.storage.set(PROTECTED_KEY, &ids).await?;
        Ok(true)
    }

    /// Unprotect `tab_id`; returns false (and writes nothing) if it was not protected
    pub async fn remove(&self, tab_id: TabId) -> Result<bool, StoreError> {
        let mut ids = self.list().await?;
        let Some(pos) = ids.iter().position(|id| *id == tab_id) else {
            return Ok(false);
        };
        ids.remove(pos);
        self.storage.set(PROTECTED_KEY, &ids).await?;
        Ok(true)
    }
}
