//! Lifecycle controller: the operations behind every tab command
//!
//! Each operation reads a fresh tab snapshot and fresh persisted state, then
//! issues a sequence of browser calls. The snapshot may be stale by the time
//! any later call runs, so every mutating call is individually fallible and
//! recorded in the [`OperationReport`]; nothing is propagated to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::browser::{BrowserError, CreateTabRequest, TabId, TabService, TabSnapshot};
use crate::config::Config;
use crate::data::Storage;
use crate::util::Clock;

use super::activity::ActivityTracker;
use super::grouping::{
    group_by_hostname, group_by_normalized_url, groupable_hosts, resolve_duplicates,
};
use super::protection::ProtectionRegistry;
use super::report::{ItemTarget, Operation, OperationReport, UndoSource};
use super::snapshots::{Snapshot, SnapshotStore};
use super::undo::{RemovedTabEntry, UndoBatch, UndoLog};

/// Protection state of the active tab plus the whole protected set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookmarkStatus {
    pub added: bool,
    pub protected: Vec<TabId>,
}

/// Owns the activity, protection, undo and snapshot state and applies
/// commands and browser events to it.
#[derive(Clone)]
pub struct LifecycleController {
    tabs: Arc<dyn TabService>,
    activity: ActivityTracker,
    protection: ProtectionRegistry,
    undo: UndoLog,
    snapshots: SnapshotStore,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl LifecycleController {
    pub fn new(
        tabs: Arc<dyn TabService>,
        storage: Storage,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        Self {
            activity: ActivityTracker::new(storage.clone(), clock.clone()),
            protection: ProtectionRegistry::new(storage.clone()),
            undo: UndoLog::new(storage.clone(), clock.clone()).with_capacity(config.undo_capacity),
            snapshots: SnapshotStore::new(storage, clock.clone()),
            tabs,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn protection(&self) -> &ProtectionRegistry {
        &self.protection
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    async fn query_tabs(&self, operation: Operation) -> Result<Vec<TabSnapshot>, OperationReport> {
        self.tabs.query_tabs().await.map_err(|e| {
            tracing::warn!(?operation, error = %e, "Failed to query tabs");
            OperationReport::skipped(operation, format!("tab query failed: {}", e))
        })
    }

    /// Close `targets` one by one; only successful removals are captured.
    async fn remove_tabs(&self, targets: Vec<TabSnapshot>, report: &mut OperationReport) {
        for tab in targets {
            // Attributes are captured before the call; the tab is gone after it.
            let entry = RemovedTabEntry::capture(&tab, self.clock.now_ms());
            match self.tabs.remove_tab(tab.id).await {
                Ok(()) => {
                    tracing::debug!(tab_id = %tab.id, url = %tab.url, "Closed tab");
                    report.removed.push(entry);
                    report.done(ItemTarget::Tab(tab.id));
                    self.on_tab_removed(tab.id).await;
                }
                Err(e) => {
                    tracing::warn!(tab_id = %tab.id, error = %e, "Failed to close tab");
                    report.failed(ItemTarget::Tab(tab.id), e);
                }
            }
        }
    }

    /// Push the removed tabs as one undo batch. Best effort.
    async fn record_undo(&self, report: &mut OperationReport) {
        if report.removed.is_empty() {
            return;
        }
        match self.undo.push(report.removed.clone()).await {
            Ok(()) => report.undo_recorded = true,
            Err(e) => {
                tracing::warn!(
                    count = report.removed.len(),
                    error = %e,
                    "Failed to record undo batch; closed tabs are not undoable"
                );
            }
        }
    }

    /// Close duplicate tabs, keeping protected ones or else the first of each URL.
    pub async fn deduplicate(&self) -> OperationReport {
        let op = Operation::Deduplicate;
        let tabs = match self.query_tabs(op).await {
            Ok(tabs) => tabs,
            Err(report) => return report,
        };
        let protected = match self.protection.get_all().await {
            Ok(set) => set,
            Err(e) => {
                // Without the protected set a dedup pass could close protected tabs.
                tracing::warn!(error = %e, "Failed to read protected tabs; skipping dedup");
                return OperationReport::skipped(op, format!("protected set unavailable: {}", e));
            }
        };

        let groups = group_by_normalized_url(&tabs);
        for group in groups.iter().filter(|g| g.len() > 1) {
            tracing::debug!(url = %group.key, count = group.len(), tab_ids = ?group.tab_ids(), "Duplicate group");
        }
        let doomed = resolve_duplicates(&groups, &protected);
        tracing::info!(
            total = tabs.len(),
            protected = protected.len(),
            closing = doomed.len(),
            "Closing duplicate tabs"
        );

        let mut report = OperationReport::new(op);
        self.remove_tabs(doomed, &mut report).await;
        self.record_undo(&mut report).await;
        report
    }

    /// Close tabs idle for strictly longer than `limit_ms`.
    ///
    /// Protected tabs, the active tab and tabs with no recorded activity are
    /// never closed.
    pub async fn close_inactive(&self, limit_ms: i64) -> OperationReport {
        let op = Operation::CloseInactive;
        if limit_ms <= 0 {
            tracing::warn!(limit_ms, "Ignoring close-inactive with non-positive limit");
            return OperationReport::skipped(op, format!("invalid limit {}", limit_ms));
        }

        let now = self.clock.now_ms();
        let tabs = match self.query_tabs(op).await {
            Ok(tabs) => tabs,
            Err(report) => return report,
        };
        let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
        let records = match self.activity.snapshot(&ids).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read activity records");
                return OperationReport::skipped(op, format!("activity unavailable: {}", e));
            }
        };
        let protected = match self.protection.get_all().await {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read protected tabs");
                return OperationReport::skipped(op, format!("protected set unavailable: {}", e));
            }
        };
        let active_id = match self.tabs.active_tab().await {
            Ok(active) => active.map(|t| t.id),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve active tab");
                None
            }
        };

        let doomed: Vec<TabSnapshot> = tabs
            .into_iter()
            .filter(|t| !protected.contains(&t.id))
            .filter(|t| Some(t.id) != active_id)
            .filter(|t| match records.get(&t.id) {
                Some(last_active) => now.saturating_sub(*last_active) > limit_ms,
                None => false,
            })
            .collect();
        tracing::info!(limit_ms, closing = doomed.len(), "Closing inactive tabs");

        let mut report = OperationReport::new(op);
        self.remove_tabs(doomed, &mut report).await;
        self.record_undo(&mut report).await;
        report
    }

    /// Put every host with more than one tab into its own titled group.
    pub async fn group_by_host(&self) -> OperationReport {
        let op = Operation::GroupByHost;
        let tabs = match self.query_tabs(op).await {
            Ok(tabs) => tabs,
            Err(report) => return report,
        };

        let mut report = OperationReport::new(op);
        let groups = group_by_hostname(&tabs);
        for group in groupable_hosts(&groups) {
            let target = ItemTarget::Host(group.key.clone());
            let group_id = match self.tabs.group_tabs(&group.tab_ids()).await {
                Ok(group_id) => group_id,
                Err(e) => {
                    tracing::warn!(host = %group.key, error = %e, "Failed to group tabs for host");
                    report.failed(target, e);
                    continue;
                }
            };

            let title = Some(group.key.clone()).filter(|k| !k.is_empty());
            match self
                .tabs
                .update_group(group_id, title, self.config.group_color)
                .await
            {
                Ok(()) => report.done(target),
                Err(e) => {
                    tracing::warn!(host = %group.key, group_id = %group_id, error = %e, "Failed to label tab group");
                    report.partial(target, e);
                }
            }
        }
        report
    }

    /// Remove every tab from its group; falls back to one-by-one on bulk failure.
    pub async fn ungroup_all(&self) -> OperationReport {
        let op = Operation::UngroupAll;
        let tabs = match self.query_tabs(op).await {
            Ok(tabs) => tabs,
            Err(report) => return report,
        };
        let grouped: Vec<TabId> = tabs.iter().filter(|t| t.is_grouped()).map(|t| t.id).collect();

        let mut report = OperationReport::new(op);
        if grouped.is_empty() {
            return report;
        }

        match self.tabs.ungroup(&grouped).await {
            Ok(()) => {
                for id in grouped {
                    report.done(ItemTarget::Tab(id));
                }
            }
            Err(e) => {
                tracing::warn!(count = grouped.len(), error = %e, "Bulk ungroup failed; ungrouping one at a time");
                for id in grouped {
                    match self.tabs.ungroup(&[id]).await {
                        Ok(()) => report.done(ItemTarget::Tab(id)),
                        Err(e) => {
                            tracing::debug!(tab_id = %id, error = %e, "Failed to ungroup tab");
                            report.failed(ItemTarget::Tab(id), e);
                        }
                    }
                }
            }
        }
        report
    }

    async fn status_for(&self, added: bool) -> BookmarkStatus {
        let protected = self.protection.list().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read protected tabs");
            Vec::new()
        });
        BookmarkStatus { added, protected }
    }

    async fn active_tab_id(&self) -> Option<TabId> {
        match self.tabs.active_tab().await {
            Ok(Some(tab)) => Some(tab.id),
            Ok(None) => {
                tracing::debug!("No active tab");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve active tab");
                None
            }
        }
    }

    /// Flip protection of the active tab
    pub async fn toggle_protection(&self) -> BookmarkStatus {
        let Some(tab_id) = self.active_tab_id().await else {
            return self.status_for(false).await;
        };
        let added = match self.protection.toggle(tab_id).await {
            Ok(added) => {
                tracing::info!(tab_id = %tab_id, protected = added, "Toggled tab protection");
                added
            }
            Err(e) => {
                tracing::warn!(tab_id = %tab_id, error = %e, "Failed to toggle protection");
                self.protection.is_protected(tab_id).await.unwrap_or(false)
            }
        };
        self.status_for(added).await
    }

    /// Whether the active tab is protected, plus the protected set
    pub async fn bookmark_status(&self) -> BookmarkStatus {
        let added = match self.active_tab_id().await {
            Some(tab_id) => self
                .protection
                .is_protected(tab_id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(tab_id = %tab_id, error = %e, "Failed to read protection");
                    false
                }),
            None => false,
        };
        self.status_for(added).await
    }

    /// Reopen the newest undo batch, or fall back to the browser's
    /// recently-closed list when the undo log is empty.
    pub async fn undo(&self) -> OperationReport {
        let op = Operation::Undo;
        match self.undo.pop().await {
            Ok(Some(batch)) => self.restore_batch(batch).await,
            Ok(None) => self.restore_recently_closed().await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to pop undo batch");
                OperationReport::skipped(op, format!("undo log unavailable: {}", e))
            }
        }
    }

    async fn restore_batch(&self, batch: UndoBatch) -> OperationReport {
        let mut report = OperationReport::new(Operation::Undo);
        report.undo_source = Some(UndoSource::UndoLog);

        for entry in batch.entries {
            let target = ItemTarget::Url(entry.url.clone());
            if entry.url.is_empty() {
                report.failed(target, "entry has no url");
                continue;
            }

            let request = CreateTabRequest::new(entry.url.clone())
                .in_window(entry.window_id)
                .at_index(entry.index)
                .inactive();
            match self.tabs.create_tab(request).await {
                Ok(_) => report.done(target),
                Err(BrowserError::WindowNotFound(window_id)) => {
                    tracing::debug!(window_id = %window_id, url = %entry.url, "Original window gone; reopening in current window");
                    match self
                        .tabs
                        .create_tab(CreateTabRequest::new(entry.url.clone()).inactive())
                        .await
                    {
                        Ok(_) => report.done(target),
                        Err(e) => {
                            tracing::warn!(url = %entry.url, error = %e, "Failed to recreate tab");
                            report.failed(target, e);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %entry.url, error = %e, "Failed to recreate tab");
                    report.failed(target, e);
                }
            }
        }
        report
    }

    async fn restore_recently_closed(&self) -> OperationReport {
        let op = Operation::Undo;
        let sessions = match self.tabs.recently_closed().await {
            Ok(sessions) => sessions,
            Err(BrowserError::Unsupported(api)) => {
                tracing::warn!(api, "No undo history and recently-closed API unavailable");
                return OperationReport::skipped(op, "recently-closed API unavailable");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list recently closed sessions");
                return OperationReport::skipped(op, format!("recently-closed query failed: {}", e));
            }
        };

        let Some(newest) = sessions.first() else {
            tracing::info!("No recently closed sessions available");
            return OperationReport::skipped(op, "nothing to undo");
        };
        let newest_time = if newest.last_modified > 0 {
            newest.last_modified
        } else {
            self.clock.now_ms()
        };
        let cutoff = newest_time - self.config.restore_window_ms;
        let recent: Vec<_> = sessions
            .iter()
            .take_while(|s| s.last_modified >= cutoff)
            .collect();

        if recent.is_empty() {
            tracing::info!("No recently closed sessions within the restore window");
            return OperationReport::skipped(op, "nothing closed recently enough");
        }

        let mut report = OperationReport::new(op);
        report.undo_source = Some(UndoSource::RecentlyClosed);
        // Oldest first so the newest closure ends up restored last.
        for session in recent.into_iter().rev() {
            let Some(session_id) = session.session_id.as_deref() else {
                continue;
            };
            let target = ItemTarget::Session(session_id.to_string());
            match self.tabs.restore_session(session_id).await {
                Ok(()) => {
                    tracing::debug!(session_id, "Restored session");
                    report.done(target);
                }
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "Failed to restore session");
                    report.failed(target, e);
                }
            }
        }
        report
    }

    /// Browser event: a tab became active in its window
    pub async fn on_tab_activated(&self, tab_id: TabId) {
        match self.tabs.get_tab(tab_id).await {
            Ok(Some(_)) => {
                self.activity.record_active(tab_id).await;
            }
            Ok(None) => tracing::debug!(tab_id = %tab_id, "Ignoring activation of unknown tab"),
            Err(e) => {
                tracing::warn!(tab_id = %tab_id, error = %e, "Failed to resolve activated tab")
            }
        }
    }

    /// Browser event: a tab closed; prune its protection and activity state
    pub async fn on_tab_removed(&self, tab_id: TabId) {
        if let Err(e) = self.protection.remove(tab_id).await {
            tracing::warn!(tab_id = %tab_id, error = %e, "Failed to prune protected tab");
        }
        if let Err(e) = self.activity.forget(tab_id).await {
            tracing::warn!(tab_id = %tab_id, error = %e, "Failed to prune activity record");
        }
    }

    pub async fn save_snapshot(&self, name: &str) -> Option<Snapshot> {
        let tabs = match self.tabs.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query tabs for snapshot");
                return None;
            }
        };
        match self.snapshots.save(name, &tabs).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(name, error = %e, "Failed to save snapshot");
                None
            }
        }
    }

    pub async fn list_snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.list().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list snapshots");
            Vec::new()
        })
    }

    /// Open every URL of a snapshot in one new window
    pub async fn open_snapshot(&self, id: &str) -> OperationReport {
        let op = Operation::OpenSnapshot;
        let snapshot = match self.snapshots.get(id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return OperationReport::skipped(op, format!("no snapshot {}", id)),
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to read snapshots");
                return OperationReport::skipped(op, format!("snapshots unavailable: {}", e));
            }
        };
        let urls = snapshot.urls();
        if urls.is_empty() {
            return OperationReport::skipped(op, "snapshot has no urls");
        }

        let mut report = OperationReport::new(op);
        match self.tabs.create_window(urls.clone()).await {
            Ok(window_id) => {
                tracing::info!(name = %snapshot.name, window_id = %window_id, "Opened snapshot");
                for url in urls {
                    report.done(ItemTarget::Url(url));
                }
            }
            Err(e) => {
                tracing::warn!(name = %snapshot.name, error = %e, "Failed to open snapshot");
                for url in urls {
                    report.failed(ItemTarget::Url(url), &e);
                }
            }
        }
        report
    }

    pub async fn delete_snapshot(&self, id: &str) -> bool {
        self.snapshots.delete(id).await.unwrap_or_else(|e| {
            tracing::warn!(id, error = %e, "Failed to delete snapshot");
            false
        })
    }

    /// Tabs currently protected, as a set
    pub async fn protected_set(&self) -> HashSet<TabId> {
        self.protection.get_all().await.unwrap_or_default()
    }
}
