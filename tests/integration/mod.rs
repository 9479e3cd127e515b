//! Integration tests for tabwarden
//!
//! These tests drive the lifecycle controller and dispatcher against the
//! in-memory browser and a real SQLite database.

#[path = "../common/mod.rs"]
pub mod common;

pub mod dispatcher_flow;
pub mod lifecycle_flow;
