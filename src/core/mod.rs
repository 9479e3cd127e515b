//! Tab lifecycle core
//!
//! - Activity tracking, protection and the undo log over persistent storage
//! - Pure grouping and dedup functions
//! - The [`LifecycleController`] operations and the [`Dispatcher`] that
//!   serialises them

mod activity;
mod controller;
mod dispatcher;
pub mod grouping;
mod protection;
pub mod report;
mod snapshots;
mod undo;

pub use activity::{ActivityTracker, ACTIVITY_KEY_PREFIX};
pub use controller::{BookmarkStatus, LifecycleController};
pub use dispatcher::{
    BrowserEvent, Command, DispatchError, Dispatcher, DispatcherHandle, Response,
};
pub use protection::{ProtectionRegistry, PROTECTED_KEY};
pub use report::{ItemOutcome, ItemResult, ItemTarget, Operation, OperationReport, UndoSource};
pub use snapshots::{Snapshot, SnapshotEntry, SnapshotStore, SNAPSHOTS_KEY};
pub use undo::{RemovedTabEntry, UndoBatch, UndoLog, UNDO_KEY};
