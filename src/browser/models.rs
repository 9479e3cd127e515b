//! Data models for live browser tabs, groups and closed sessions

use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier. Ephemeral; only valid while the tab lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

/// Browser window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

/// UI tab-group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of a live tab at query time.
///
/// Never cached across operations: the browser may close, open or navigate
/// tabs between any two calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub index: usize,
    pub window_id: WindowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
}

impl TabSnapshot {
    pub fn new(id: i64, url: impl Into<String>, window_id: i64, index: usize) -> Self {
        Self {
            id: TabId(id),
            url: url.into(),
            title: String::new(),
            index,
            window_id: WindowId(window_id),
            group_id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id.is_some()
    }
}

/// Tab-group colours understood by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Grey,
    #[default]
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }

    /// Parse from string, falling back to blue for unknown names
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "grey" | "gray" => GroupColor::Grey,
            "red" => GroupColor::Red,
            "yellow" => GroupColor::Yellow,
            "green" => GroupColor::Green,
            "pink" => GroupColor::Pink,
            "purple" => GroupColor::Purple,
            "cyan" => GroupColor::Cyan,
            "orange" => GroupColor::Orange,
            _ => GroupColor::Blue,
        }
    }
}

/// Parameters for opening a tab
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateTabRequest {
    pub url: String,
    pub window_id: Option<WindowId>,
    pub index: Option<usize>,
    pub active: bool,
}

impl CreateTabRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn in_window(mut self, window_id: Option<WindowId>) -> Self {
        self.window_id = window_id;
        self
    }

    pub fn at_index(mut self, index: Option<usize>) -> Self {
        self.index = index;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// An entry in the browser's recently-closed list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedSession {
    /// Restorable session id; entries without one cannot be restored
    #[serde(default)]
    pub session_id: Option<String>,
    /// Epoch milliseconds when the tab/window was closed
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_color_parse() {
        assert_eq!(GroupColor::parse("Gray"), GroupColor::Grey);
        assert_eq!(GroupColor::parse("purple"), GroupColor::Purple);
        assert_eq!(GroupColor::parse("ultraviolet"), GroupColor::Blue);
        assert_eq!(GroupColor::Orange.as_str(), "orange");
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let tab = TabSnapshot::new(7, "https://a.com", 1, 3).with_group(GroupId(9));
        let json = serde_json::to_value(&tab).unwrap();
        assert_eq!(json["windowId"], 1);
        assert_eq!(json["groupId"], 9);

        let ungrouped = TabSnapshot::new(8, "https://b.com", 1, 4);
        let json = serde_json::to_value(&ungrouped).unwrap();
        assert!(json.get("groupId").is_none());
    }
}
