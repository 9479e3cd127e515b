//! In-memory browser for deterministic testing and the CLI
//!
//! Implements [`TabService`] over a plain [`BrowserState`] that can be loaded
//! from and saved to JSON. Every mutating call is captured for later
//! verification, and individual calls can be configured to fail so tests can
//! reproduce a user closing tabs out from under an operation.
//!
//! # Example
//! ```ignore
//! use tabwarden::browser::{MemoryBrowser, TabService, TabSnapshot};
//!
//! #[tokio::test]
//! async fn test_flow() {
//!     let browser = MemoryBrowser::with_tabs(vec![
//!         TabSnapshot::new(1, "https://a.com", 1, 0),
//!         TabSnapshot::new(2, "https://a.com", 1, 1),
//!     ]);
//!     assert_eq!(browser.query_tabs().await.unwrap().len(), 2);
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::BrowserError;
use super::models::{
    ClosedSession, CreateTabRequest, GroupColor, GroupId, TabId, TabSnapshot, WindowId,
};
use super::service::TabService;
use crate::util::{Clock, SystemClock};

/// A UI tab group as the browser tracks it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: GroupId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: GroupColor,
}

/// Serializable browser contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserState {
    /// Tabs in query order (window, then index)
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
    #[serde(default)]
    pub windows: Vec<WindowId>,
    #[serde(default)]
    pub groups: Vec<TabGroup>,
    /// Active tab of the current window
    #[serde(default)]
    pub active_tab: Option<TabId>,
    /// Recently closed entries, newest first
    #[serde(default)]
    pub recently_closed: Vec<ClosedSession>,
    #[serde(default = "default_true")]
    pub sessions_supported: bool,
    #[serde(default = "default_next_id")]
    pub next_tab_id: i64,
    #[serde(default = "default_next_id")]
    pub next_window_id: i64,
    #[serde(default = "default_next_id")]
    pub next_group_id: i64,
    #[serde(default)]
    pub next_session_id: i64,
}

fn default_true() -> bool {
    true
}

fn default_next_id() -> i64 {
    1
}

impl Default for BrowserState {
    fn default() -> Self {
        Self {
            tabs: Vec::new(),
            windows: Vec::new(),
            groups: Vec::new(),
            active_tab: None,
            recently_closed: Vec::new(),
            sessions_supported: true,
            next_tab_id: 1,
            next_window_id: 1,
            next_group_id: 1,
            next_session_id: 0,
        }
    }
}

impl BrowserState {
    /// Make id counters and the window list consistent with the tabs present.
    fn normalize(&mut self) {
        for tab in &self.tabs {
            if !self.windows.contains(&tab.window_id) {
                self.windows.push(tab.window_id);
            }
        }
        let max_tab = self.tabs.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.next_tab_id = self.next_tab_id.max(max_tab + 1);
        let max_window = self.windows.iter().map(|w| w.0).max().unwrap_or(0);
        self.next_window_id = self.next_window_id.max(max_window + 1);
        let max_group = self.groups.iter().map(|g| g.id.0).max().unwrap_or(0);
        self.next_group_id = self.next_group_id.max(max_group + 1);
        self.reindex();
    }

    /// Keep tabs ordered by window and renumber per-window indices.
    fn reindex(&mut self) {
        let order = self.windows.clone();
        self.tabs.sort_by_key(|t| {
            order
                .iter()
                .position(|w| *w == t.window_id)
                .unwrap_or(usize::MAX)
        });
        let mut current: Option<WindowId> = None;
        let mut next_index = 0;
        for tab in &mut self.tabs {
            if current != Some(tab.window_id) {
                current = Some(tab.window_id);
                next_index = 0;
            }
            tab.index = next_index;
            next_index += 1;
        }
    }

    fn position(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    fn insert_tab(&mut self, tab: TabSnapshot, index: Option<usize>) {
        let window_positions: Vec<usize> = self
            .tabs
            .iter()
            .enumerate()
            .filter(|(_, t)| t.window_id == tab.window_id)
            .map(|(i, _)| i)
            .collect();
        let at = match (index, window_positions.last()) {
            (Some(i), _) if i < window_positions.len() => window_positions[i],
            (_, Some(last)) => last + 1,
            (_, None) => self.tabs.len(),
        };
        self.tabs.insert(at, tab);
        self.reindex();
    }

    fn drop_empty_groups(&mut self) {
        let used: HashSet<GroupId> = self.tabs.iter().filter_map(|t| t.group_id).collect();
        self.groups.retain(|g| used.contains(&g.id));
    }
}

/// A mutating call observed by [`MemoryBrowser`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
    Remove(TabId),
    Create(CreateTabRequest),
    CreateWindow(Vec<String>),
    Group(Vec<TabId>),
    UpdateGroup {
        group_id: GroupId,
        title: Option<String>,
        color: GroupColor,
    },
    Ungroup(Vec<TabId>),
    RestoreSession(String),
}

/// Calls that should fail regardless of browser state
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    pub remove: HashSet<TabId>,
    /// Any group request containing one of these tabs fails
    pub group: HashSet<TabId>,
    pub update_group: bool,
    /// Ungroup requests naming more than one tab fail
    pub bulk_ungroup: bool,
    pub ungroup: HashSet<TabId>,
    pub restore: HashSet<String>,
}

impl FailurePlan {
    pub fn failing_remove(mut self, tab_id: i64) -> Self {
        self.remove.insert(TabId(tab_id));
        self
    }

    pub fn failing_group(mut self, tab_id: i64) -> Self {
        self.group.insert(TabId(tab_id));
        self
    }

    pub fn failing_update_group(mut self) -> Self {
        self.update_group = true;
        self
    }

    pub fn failing_bulk_ungroup(mut self) -> Self {
        self.bulk_ungroup = true;
        self
    }

    pub fn failing_ungroup(mut self, tab_id: i64) -> Self {
        self.ungroup.insert(TabId(tab_id));
        self
    }

    pub fn failing_restore(mut self, session_id: impl Into<String>) -> Self {
        self.restore.insert(session_id.into());
        self
    }
}

/// In-memory [`TabService`]
#[derive(Clone)]
pub struct MemoryBrowser {
    state: Arc<Mutex<BrowserState>>,
    failures: Arc<Mutex<FailurePlan>>,
    calls: Arc<Mutex<Vec<BrowserCall>>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self::from_state(BrowserState::default())
    }
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(mut state: BrowserState) -> Self {
        state.normalize();
        Self {
            state: Arc::new(Mutex::new(state)),
            failures: Arc::new(Mutex::new(FailurePlan::default())),
            calls: Arc::new(Mutex::new(Vec::new())),
            clock: Arc::new(SystemClock),
        }
    }

    /// Browser with the given tabs; the first tab is active
    pub fn with_tabs(tabs: Vec<TabSnapshot>) -> Self {
        let active_tab = tabs.first().map(|t| t.id);
        Self::from_state(BrowserState {
            tabs,
            active_tab,
            ..Default::default()
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_failures(self, plan: FailurePlan) -> Self {
        *self.failures.lock() = plan;
        self
    }

    pub fn set_failures(&self, plan: FailurePlan) {
        *self.failures.lock() = plan;
    }

    /// Current contents, e.g. for saving back to disk
    pub fn state(&self) -> BrowserState {
        self.state.lock().clone()
    }

    pub fn tabs(&self) -> Vec<TabSnapshot> {
        self.state.lock().tabs.clone()
    }

    pub fn groups(&self) -> Vec<TabGroup> {
        self.state.lock().groups.clone()
    }

    pub fn set_active(&self, tab_id: Option<TabId>) {
        self.state.lock().active_tab = tab_id;
    }

    /// Make `tab_id` the active tab, as the user switching to it would.
    /// Returns false for an unknown tab.
    pub fn activate(&self, tab_id: TabId) -> bool {
        let mut state = self.state.lock();
        if state.position(tab_id).is_none() {
            return false;
        }
        state.active_tab = Some(tab_id);
        true
    }

    pub fn set_sessions_supported(&self, supported: bool) {
        self.state.lock().sessions_supported = supported;
    }

    /// Insert an externally closed entry at the front of the recently-closed list
    pub fn push_closed_session(&self, session: ClosedSession) {
        self.state.lock().recently_closed.insert(0, session);
    }

    /// All mutating calls seen so far
    pub fn calls(&self) -> Vec<BrowserCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: BrowserCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl TabService for MemoryBrowser {
    async fn query_tabs(&self) -> Result<Vec<TabSnapshot>, BrowserError> {
        Ok(self.tabs())
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>, BrowserError> {
        let state = self.state.lock();
        Ok(state.position(tab_id).map(|pos| state.tabs[pos].clone()))
    }

    async fn active_tab(&self) -> Result<Option<TabSnapshot>, BrowserError> {
        let state = self.state.lock();
        Ok(state
            .active_tab
            .and_then(|id| state.tabs.iter().find(|t| t.id == id).cloned()))
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        self.record(BrowserCall::Remove(tab_id));
        if self.failures.lock().remove.contains(&tab_id) {
            return Err(BrowserError::TabNotFound(tab_id));
        }

        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let pos = state
            .position(tab_id)
            .ok_or(BrowserError::TabNotFound(tab_id))?;
        let tab = state.tabs.remove(pos);
        if state.active_tab == Some(tab_id) {
            state.active_tab = None;
        }
        state.next_session_id += 1;
        let session_id = format!("session-{}", state.next_session_id);
        state.recently_closed.insert(
            0,
            ClosedSession {
                session_id: Some(session_id),
                last_modified: now,
                url: Some(tab.url),
            },
        );
        state.drop_empty_groups();
        state.reindex();
        Ok(())
    }

    async fn create_tab(&self, request: CreateTabRequest) -> Result<TabSnapshot, BrowserError> {
        self.record(BrowserCall::Create(request.clone()));
        let mut state = self.state.lock();
        let window_id = match request.window_id {
            Some(window_id) if state.windows.contains(&window_id) => window_id,
            Some(window_id) => return Err(BrowserError::WindowNotFound(window_id)),
            None => match state.windows.first() {
                Some(window_id) => *window_id,
                None => {
                    let window_id = WindowId(state.next_window_id);
                    state.next_window_id += 1;
                    state.windows.push(window_id);
                    window_id
                }
            },
        };

        let id = TabId(state.next_tab_id);
        state.next_tab_id += 1;
        let tab = TabSnapshot {
            id,
            url: request.url,
            title: String::new(),
            index: 0,
            window_id,
            group_id: None,
        };
        state.insert_tab(tab, request.index);
        if request.active {
            state.active_tab = Some(id);
        }

        let pos = state.position(id).ok_or(BrowserError::TabNotFound(id))?;
        Ok(state.tabs[pos].clone())
    }

    async fn create_window(&self, urls: Vec<String>) -> Result<WindowId, BrowserError> {
        self.record(BrowserCall::CreateWindow(urls.clone()));
        let mut state = self.state.lock();
        let window_id = WindowId(state.next_window_id);
        state.next_window_id += 1;
        state.windows.push(window_id);
        for url in urls {
            let id = TabId(state.next_tab_id);
            state.next_tab_id += 1;
            state.insert_tab(
                TabSnapshot {
                    id,
                    url,
                    title: String::new(),
                    index: 0,
                    window_id,
                    group_id: None,
                },
                None,
            );
        }
        Ok(window_id)
    }

    async fn group_tabs(&self, tab_ids: &[TabId]) -> Result<GroupId, BrowserError> {
        self.record(BrowserCall::Group(tab_ids.to_vec()));
        let rejected = {
            let failures = self.failures.lock();
            tab_ids.iter().find(|id| failures.group.contains(id)).copied()
        };
        if let Some(id) = rejected {
            return Err(BrowserError::Rejected(format!("cannot group tab {}", id)));
        }

        let mut state = self.state.lock();
        if let Some(missing) = tab_ids.iter().find(|id| state.position(**id).is_none()) {
            return Err(BrowserError::TabNotFound(*missing));
        }
        let group_id = GroupId(state.next_group_id);
        state.next_group_id += 1;
        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.group_id = Some(group_id);
        }
        state.groups.push(TabGroup {
            id: group_id,
            title: None,
            color: GroupColor::Grey,
        });
        state.drop_empty_groups();
        Ok(group_id)
    }

    async fn update_group(
        &self,
        group_id: GroupId,
        title: Option<String>,
        color: GroupColor,
    ) -> Result<(), BrowserError> {
        self.record(BrowserCall::UpdateGroup {
            group_id,
            title: title.clone(),
            color,
        });
        if self.failures.lock().update_group {
            return Err(BrowserError::Rejected("tab group update refused".into()));
        }
        let mut state = self.state.lock();
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(BrowserError::GroupNotFound(group_id))?;
        group.title = title;
        group.color = color;
        Ok(())
    }

    async fn ungroup(&self, tab_ids: &[TabId]) -> Result<(), BrowserError> {
        self.record(BrowserCall::Ungroup(tab_ids.to_vec()));
        {
            let failures = self.failures.lock();
            if failures.bulk_ungroup && tab_ids.len() > 1 {
                return Err(BrowserError::Rejected("bulk ungroup refused".into()));
            }
            if let Some(id) = tab_ids.iter().find(|id| failures.ungroup.contains(id)) {
                return Err(BrowserError::TabNotFound(*id));
            }
        }

        let mut state = self.state.lock();
        if let Some(missing) = tab_ids.iter().find(|id| state.position(**id).is_none()) {
            return Err(BrowserError::TabNotFound(*missing));
        }
        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.group_id = None;
        }
        state.drop_empty_groups();
        Ok(())
    }

    async fn recently_closed(&self) -> Result<Vec<ClosedSession>, BrowserError> {
        let state = self.state.lock();
        if !state.sessions_supported {
            return Err(BrowserError::Unsupported("sessions"));
        }
        Ok(state.recently_closed.clone())
    }

    async fn restore_session(&self, session_id: &str) -> Result<(), BrowserError> {
        self.record(BrowserCall::RestoreSession(session_id.to_string()));
        if self.failures.lock().restore.contains(session_id) {
            return Err(BrowserError::Rejected(format!(
                "session {} could not be restored",
                session_id
            )));
        }

        let session = {
            let mut state = self.state.lock();
            let pos = state
                .recently_closed
                .iter()
                .position(|s| s.session_id.as_deref() == Some(session_id))
                .ok_or_else(|| BrowserError::Rejected(format!("unknown session {}", session_id)))?;
            state.recently_closed.remove(pos)
        };

        let mut state = self.state.lock();
        let window_id = match state.windows.first() {
            Some(window_id) => *window_id,
            None => {
                let window_id = WindowId(state.next_window_id);
                state.next_window_id += 1;
                state.windows.push(window_id);
                window_id
            }
        };
        let id = TabId(state.next_tab_id);
        state.next_tab_id += 1;
        state.insert_tab(
            TabSnapshot {
                id,
                url: session.url.unwrap_or_default(),
                title: String::new(),
                index: 0,
                window_id,
                group_id: None,
            },
            None,
        );
        state.active_tab = Some(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ManualClock;

    fn browser() -> MemoryBrowser {
        MemoryBrowser::with_tabs(vec![
            TabSnapshot::new(1, "https://a.com", 1, 0),
            TabSnapshot::new(2, "https://b.com", 1, 1),
            TabSnapshot::new(3, "https://c.com", 2, 0),
        ])
    }

    #[tokio::test]
    async fn test_remove_reindexes_and_records_session() {
        let clock = Arc::new(ManualClock::new(5_000));
        let browser = browser().with_clock(clock);

        browser.remove_tab(TabId(1)).await.unwrap();

        let tabs = browser.query_tabs().await.unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].id, TabId(2));
        assert_eq!(tabs[0].index, 0);

        let closed = browser.recently_closed().await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].last_modified, 5_000);
        assert_eq!(closed[0].url.as_deref(), Some("https://a.com"));
        // Active tab was closed
        assert!(browser.active_tab().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_tab_fails() {
        let browser = browser();
        let err = browser.remove_tab(TabId(42)).await.unwrap_err();
        assert_eq!(err, BrowserError::TabNotFound(TabId(42)));
    }

    #[tokio::test]
    async fn test_create_tab_at_index_in_window() {
        let browser = browser();
        let tab = browser
            .create_tab(
                CreateTabRequest::new("https://z.com")
                    .in_window(Some(WindowId(1)))
                    .at_index(Some(1))
                    .inactive(),
            )
            .await
            .unwrap();

        assert_eq!(tab.index, 1);
        assert_eq!(tab.window_id, WindowId(1));
        let urls: Vec<String> = browser.tabs().into_iter().map(|t| t.url).collect();
        assert_eq!(
            urls,
            vec!["https://a.com", "https://z.com", "https://b.com", "https://c.com"]
        );
        assert_eq!(browser.active_tab().await.unwrap().unwrap().id, TabId(1));
    }

    #[tokio::test]
    async fn test_create_tab_in_missing_window_fails() {
        let browser = browser();
        let err = browser
            .create_tab(CreateTabRequest::new("https://z.com").in_window(Some(WindowId(99))))
            .await
            .unwrap_err();
        assert_eq!(err, BrowserError::WindowNotFound(WindowId(99)));
    }

    #[tokio::test]
    async fn test_group_and_ungroup() {
        let browser = browser();
        let group = browser.group_tabs(&[TabId(1), TabId(2)]).await.unwrap();
        browser
            .update_group(group, Some("a.com".into()), GroupColor::Blue)
            .await
            .unwrap();

        let groups = browser.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title.as_deref(), Some("a.com"));

        browser.ungroup(&[TabId(1), TabId(2)]).await.unwrap();
        assert!(browser.tabs().iter().all(|t| t.group_id.is_none()));
        assert!(browser.groups().is_empty());
    }

    #[tokio::test]
    async fn test_failure_plan_and_call_capture() {
        let browser = browser().with_failures(FailurePlan::default().failing_bulk_ungroup());
        assert!(browser.ungroup(&[TabId(1), TabId(2)]).await.is_err());
        assert!(browser.ungroup(&[TabId(1)]).await.is_ok());
        assert_eq!(
            browser.calls(),
            vec![
                BrowserCall::Ungroup(vec![TabId(1), TabId(2)]),
                BrowserCall::Ungroup(vec![TabId(1)]),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_tab_and_activate() {
        let browser = browser();
        assert_eq!(browser.get_tab(TabId(3)).await.unwrap().unwrap().url, "https://c.com");
        assert!(browser.get_tab(TabId(9)).await.unwrap().is_none());

        assert!(browser.activate(TabId(2)));
        assert!(!browser.activate(TabId(9)));
        assert_eq!(browser.active_tab().await.unwrap().unwrap().id, TabId(2));
    }

    #[tokio::test]
    async fn test_sessions_unsupported() {
        let browser = browser();
        browser.set_sessions_supported(false);
        assert_eq!(
            browser.recently_closed().await.unwrap_err(),
            BrowserError::Unsupported("sessions")
        );
    }

    #[tokio::test]
    async fn test_restore_session_reopens_tab() {
        let browser = browser();
        browser.remove_tab(TabId(2)).await.unwrap();
        let closed = browser.recently_closed().await.unwrap();
        let sid = closed[0].session_id.clone().unwrap();

        browser.restore_session(&sid).await.unwrap();

        assert!(browser.recently_closed().await.unwrap().is_empty());
        assert!(browser.tabs().iter().any(|t| t.url == "https://b.com"));
    }

    #[test]
    fn test_state_json_round_trip_normalizes_counters() {
        let json = r#"{"tabs":[{"id":10,"url":"https://a.com","index":0,"windowId":3}]}"#;
        let state: BrowserState = serde_json::from_str(json).unwrap();
        let browser = MemoryBrowser::from_state(state);
        let state = browser.state();
        assert_eq!(state.windows, vec![WindowId(3)]);
        assert_eq!(state.next_tab_id, 11);
        assert_eq!(state.next_window_id, 4);
        assert!(state.sessions_supported);
    }
}
