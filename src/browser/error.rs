use thiserror::Error;

use super::models::{GroupId, TabId, WindowId};

/// Failures reported by the host browser's tab APIs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("No tab with id {0}")]
    TabNotFound(TabId),

    #[error("No window with id {0}")]
    WindowNotFound(WindowId),

    #[error("No tab group with id {0}")]
    GroupNotFound(GroupId),

    #[error("Browser API not available: {0}")]
    Unsupported(&'static str),

    #[error("Browser rejected the request: {0}")]
    Rejected(String),
}
