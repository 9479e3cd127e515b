use async_trait::async_trait;

use super::error::BrowserError;
use super::models::{ClosedSession, CreateTabRequest, GroupColor, GroupId, TabId, TabSnapshot, WindowId};

/// The host browser's tab, window, group and session APIs.
///
/// Every call is a suspend point at which the user may have changed the tab
/// list, so callers treat each mutating call as individually fallible.
#[async_trait]
pub trait TabService: Send + Sync {
    /// All tabs across all windows, in browser query order
    async fn query_tabs(&self) -> Result<Vec<TabSnapshot>, BrowserError>;

    /// A single tab by id; `None` once it has closed
    async fn get_tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>, BrowserError>;

    /// The active tab of the current window, if any
    async fn active_tab(&self) -> Result<Option<TabSnapshot>, BrowserError>;

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError>;

    async fn create_tab(&self, request: CreateTabRequest) -> Result<TabSnapshot, BrowserError>;

    /// Open a new window containing the given URLs in order
    async fn create_window(&self, urls: Vec<String>) -> Result<WindowId, BrowserError>;

    /// Put the tabs into one new UI group
    async fn group_tabs(&self, tab_ids: &[TabId]) -> Result<GroupId, BrowserError>;

    async fn update_group(
        &self,
        group_id: GroupId,
        title: Option<String>,
        color: GroupColor,
    ) -> Result<(), BrowserError>;

    async fn ungroup(&self, tab_ids: &[TabId]) -> Result<(), BrowserError>;

    /// Recently closed tabs/windows, newest first.
    ///
    /// Returns [`BrowserError::Unsupported`] when the session API is unavailable.
    async fn recently_closed(&self) -> Result<Vec<ClosedSession>, BrowserError>;

    async fn restore_session(&self, session_id: &str) -> Result<(), BrowserError>;
}
