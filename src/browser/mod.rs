//! Host browser boundary
//!
//! The tab, window, group and session APIs are external collaborators. This
//! module defines the [`TabService`] trait the lifecycle core calls, the data
//! it exchanges, and an in-memory implementation.

mod error;
pub mod memory;
mod models;
mod service;

pub use error::BrowserError;
pub use memory::{BrowserCall, BrowserState, FailurePlan, MemoryBrowser, TabGroup};
pub use models::{
    ClosedSession, CreateTabRequest, GroupColor, GroupId, TabId, TabSnapshot, WindowId,
};
pub use service::TabService;
