//! Shared test utilities for tabwarden
//!
//! - Deterministic clock and browser fixtures
//! - On-disk database setup in temporary directories

pub mod fixtures;
