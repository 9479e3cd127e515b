//! Data persistence layer
//!
//! SQLite-backed key-value storage plus the async store abstraction the
//! lifecycle components persist through.

mod app_state;
mod database;
mod migrations;
mod store;

pub use app_state::AppStateStore;
pub use database::{Database, DatabaseError};
pub use store::{KeyValueStore, MemoryStore, Storage, StoreError};
