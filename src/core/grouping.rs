//! Pure grouping functions over a tab snapshot
//!
//! Groups keep browser query order: groups appear in order of their first
//! member, members in query order. Every input tab lands in exactly one group.

use std::collections::{HashMap, HashSet};

use url::Url;

use crate::browser::{TabId, TabSnapshot};

/// Tabs sharing one grouping key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedGroup {
    pub key: String,
    pub tabs: Vec<TabSnapshot>,
}

impl KeyedGroup {
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }
}

/// Group tabs by an arbitrary key, preserving query order
pub fn group_by<F>(tabs: &[TabSnapshot], key_of: F) -> Vec<KeyedGroup>
where
    F: Fn(&TabSnapshot) -> String,
{
    let mut groups: Vec<KeyedGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for tab in tabs {
        let key = key_of(tab);
        match index.get(&key) {
            Some(&i) => groups[i].tabs.push(tab.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(KeyedGroup {
                    key,
                    tabs: vec![tab.clone()],
                });
            }
        }
    }
    groups
}

/// Duplicate-detection key: drop fragment, then query, then trailing
/// slashes, then surrounding whitespace.
pub fn normalize_url(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    without_query.trim_end_matches('/').trim().to_string()
}

/// Host-grouping key: hostname without a leading `www.`.
///
/// Anything that does not parse as a web URL with a host (`chrome://`,
/// `about:blank`, `file://`, garbage) is keyed by its raw string, so
/// internal pages of one kind still group together.
pub fn host_key(raw: &str) -> String {
    let host = Url::parse(raw).ok().and_then(|url| {
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss" | "ftp") {
            return None;
        }
        url.host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
    });
    host.unwrap_or_else(|| raw.to_string())
}

pub fn group_by_normalized_url(tabs: &[TabSnapshot]) -> Vec<KeyedGroup> {
    group_by(tabs, |t| normalize_url(&t.url))
}

pub fn group_by_hostname(tabs: &[TabSnapshot]) -> Vec<KeyedGroup> {
    group_by(tabs, |t| host_key(&t.url))
}

/// Tabs a dedup pass closes, in group order.
///
/// In a group with any protected member every unprotected member goes and
/// all protected ones stay. Otherwise the first tab in query order stays.
pub fn resolve_duplicates(groups: &[KeyedGroup], protected: &HashSet<TabId>) -> Vec<TabSnapshot> {
    let mut doomed = Vec::new();
    for group in groups.iter().filter(|g| g.len() > 1) {
        let has_protected = group.tabs.iter().any(|t| protected.contains(&t.id));
        if has_protected {
            doomed.extend(
                group
                    .tabs
                    .iter()
                    .filter(|t| !protected.contains(&t.id))
                    .cloned(),
            );
        } else {
            doomed.extend(group.tabs.iter().skip(1).cloned());
        }
    }
    doomed
}

/// Host groups worth turning into a UI group (more than one tab)
pub fn groupable_hosts(groups: &[KeyedGroup]) -> impl Iterator<Item = &KeyedGroup> {
    groups.iter().filter(|g| g.len() > 1)
}
