//! App state data access object (key-value store)

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

use super::store::{KeyValueStore, StoreError};

/// Data access object for the `app_state` key-value table
#[derive(Clone)]
pub struct AppStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl AppStateStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Set a value (insert or update)
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO app_state (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get a value by key
    pub fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM app_state WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;

        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// Delete a key
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM app_state WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// All keys starting with `prefix`, sorted
    pub fn keys_starting_with(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM app_state WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    /// Clear all state
    pub fn clear_all(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM app_state", [])?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for AppStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get_value(&key)).await?
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.set_value(&key, &value)).await?
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.delete(&key)).await?
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let store = self.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || store.keys_starting_with(&prefix)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;
    use tempfile::tempdir;

    fn setup_db() -> (tempfile::TempDir, Database, AppStateStore) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();
        let dao = AppStateStore::new(db.connection());
        (dir, db, dao)
    }

    #[test]
    fn test_set_and_get() {
        let (_dir, _db, dao) = setup_db();

        dao.set_value("protectedTabs", "[1,2]").unwrap();
        let value = dao.get_value("protectedTabs").unwrap();
        assert_eq!(value, Some("[1,2]".to_string()));
    }

    #[test]
    fn test_update() {
        let (_dir, _db, dao) = setup_db();

        dao.set_value("undoStack", "[]").unwrap();
        dao.set_value("undoStack", "[{}]").unwrap();

        assert_eq!(dao.get_value("undoStack").unwrap(), Some("[{}]".to_string()));
    }

    #[test]
    fn test_get_nonexistent() {
        let (_dir, _db, dao) = setup_db();
        assert_eq!(dao.get_value("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let (_dir, _db, dao) = setup_db();

        dao.set_value("to_delete", "value").unwrap();
        dao.delete("to_delete").unwrap();
        dao.delete("to_delete").unwrap();

        assert_eq!(dao.get_value("to_delete").unwrap(), None);
    }

    #[test]
    fn test_keys_starting_with() {
        let (_dir, _db, dao) = setup_db();

        dao.set_value("activity:10", "1").unwrap();
        dao.set_value("activity:2", "2").unwrap();
        dao.set_value("activityx", "3").unwrap();
        dao.set_value("snapshots", "[]").unwrap();

        let keys = dao.keys_starting_with("activity:").unwrap();
        assert_eq!(keys, vec!["activity:10".to_string(), "activity:2".to_string()]);
    }

    #[test]
    fn test_clear_all() {
        let (_dir, _db, dao) = setup_db();

        dao.set_value("key1", "value1").unwrap();
        dao.set_value("key2", "value2").unwrap();
        dao.clear_all().unwrap();

        assert_eq!(dao.get_value("key1").unwrap(), None);
        assert_eq!(dao.get_value("key2").unwrap(), None);
    }

    #[tokio::test]
    async fn test_async_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let db = Database::open(path.clone()).unwrap();
            let store = AppStateStore::new(db.connection());
            KeyValueStore::set(&store, "protectedTabs", "[7]".into())
                .await
                .unwrap();
        }

        let db = Database::open(path).unwrap();
        let store = AppStateStore::new(db.connection());
        let value = KeyValueStore::get(&store, "protectedTabs").await.unwrap();
        assert_eq!(value, Some("[7]".to_string()));
    }
}
