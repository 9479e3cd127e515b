//! Structured outcome of one lifecycle operation
//!
//! Partial failure is never fatal; instead every attempted item gets a
//! result here so callers and tests can count what went wrong.

use serde::{Deserialize, Serialize};

use crate::browser::TabId;

use super::undo::RemovedTabEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Deduplicate,
    CloseInactive,
    GroupByHost,
    UngroupAll,
    Undo,
    OpenSnapshot,
}

/// What an item result refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ItemTarget {
    Tab(TabId),
    /// A host-group key
    Host(String),
    /// A recently-closed session id
    Session(String),
    /// A tab to be (re)created from its URL
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "camelCase")]
pub enum ItemOutcome {
    Done,
    /// The main step succeeded but a follow-up step failed
    Partial(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub target: ItemTarget,
    pub outcome: ItemOutcome,
}

/// Where an undo request found something to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UndoSource {
    UndoLog,
    RecentlyClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    pub operation: Operation,
    pub items: Vec<ItemResult>,
    /// Tabs actually closed, with their pre-removal attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<RemovedTabEntry>,
    /// Whether `removed` was durably pushed to the undo log
    #[serde(default)]
    pub undo_recorded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_source: Option<UndoSource>,
    /// Why the operation did nothing, when a precondition was missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl OperationReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            items: Vec::new(),
            removed: Vec::new(),
            undo_recorded: false,
            undo_source: None,
            skipped: None,
        }
    }

    pub fn skipped(operation: Operation, reason: impl Into<String>) -> Self {
        let mut report = Self::new(operation);
        report.skipped = Some(reason.into());
        report
    }

    pub fn done(&mut self, target: ItemTarget) {
        self.items.push(ItemResult {
            target,
            outcome: ItemOutcome::Done,
        });
    }

    pub fn partial(&mut self, target: ItemTarget, error: impl ToString) {
        self.items.push(ItemResult {
            target,
            outcome: ItemOutcome::Partial(error.to_string()),
        });
    }

    pub fn failed(&mut self, target: ItemTarget, error: impl ToString) {
        self.items.push(ItemResult {
            target,
            outcome: ItemOutcome::Failed(error.to_string()),
        });
    }

    /// Items whose main step succeeded (including partial successes)
    pub fn succeeded_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| !matches!(i.outcome, ItemOutcome::Failed(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Failed(_)))
            .count()
    }

    pub fn removed_ids(&self) -> Vec<TabId> {
        self.removed.iter().map(|e| e.id).collect()
    }

    pub fn is_noop(&self) -> bool {
        self.items.is_empty()
    }
}
