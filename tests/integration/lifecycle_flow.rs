//! Integration tests for the tab lifecycle operations
//!
//! Each test runs the controller against a SQLite-backed store so state
//! survives a simulated restart.

use super::common::fixtures::{window_of, TestEnv};
use tabwarden::browser::{GroupColor, TabId, TabService};
use tabwarden::core::UndoSource;
use tabwarden::Config;

/// Dedup then undo restores the closed tab and the tab count
#[tokio::test]
async fn test_dedup_undo_round_trip() {
    let env = TestEnv::new(window_of(&[
        "https://news.com/a",
        "https://docs.rs",
        "https://news.com/a?utm_source=x",
        "https://news.com/a#comments",
    ]));
    let before = env.browser.tabs().len();

    let report = env.controller.deduplicate().await;
    assert_eq!(report.removed_ids(), vec![TabId(3), TabId(4)]);
    assert_eq!(env.urls(), vec!["https://news.com/a", "https://docs.rs"]);

    // Undo state is read back from the database by a fresh controller
    let controller = env.restart();
    let report = controller.undo().await;

    assert_eq!(report.undo_source, Some(UndoSource::UndoLog));
    assert_eq!(report.succeeded_count(), 2);
    assert_eq!(env.browser.tabs().len(), before);
    assert_eq!(
        env.urls(),
        vec![
            "https://news.com/a",
            "https://docs.rs",
            "https://news.com/a?utm_source=x",
            "https://news.com/a#comments",
        ]
    );
}

#[tokio::test]
async fn test_dedup_twice_closes_nothing_more() {
    let env = TestEnv::new(window_of(&[
        "https://a.com",
        "https://a.com/",
        "https://b.com",
        "https://b.com",
    ]));

    env.controller.deduplicate().await;
    let after_first = env.tab_ids();
    let second = env.controller.deduplicate().await;

    assert!(second.is_noop());
    assert_eq!(env.tab_ids(), after_first);
    assert_eq!(env.controller.undo_log().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_protection_survives_restart() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://a.com"]));
    env.browser.set_active(Some(TabId(2)));

    let status = env.controller.toggle_protection().await;
    assert!(status.added);

    let controller = env.restart();
    controller.deduplicate().await;

    // The protected duplicate stays; the first tab goes
    assert_eq!(env.tab_ids(), vec![2]);
}

#[tokio::test]
async fn test_toggle_twice_restores_protected_set() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://b.com"]));
    env.controller.protection().add(TabId(2)).await.unwrap();
    let before = env.controller.protected_set().await;

    env.controller.toggle_protection().await;
    env.controller.toggle_protection().await;

    assert_eq!(env.controller.protected_set().await, before);
}

/// Idle exactly at the limit is kept; one millisecond past it is closed
#[tokio::test]
async fn test_inactivity_boundary() {
    let env = TestEnv::new(window_of(&[
        "https://active.com",
        "https://at-limit.com",
        "https://past-limit.com",
    ]));
    let c = &env.controller;
    c.on_tab_activated(TabId(1)).await;
    c.on_tab_activated(TabId(3)).await;
    env.clock.advance(1);
    c.on_tab_activated(TabId(2)).await;
    env.clock.advance(60_000);

    let report = c.close_inactive(60_000).await;

    assert_eq!(report.removed_ids(), vec![TabId(3)]);
    assert_eq!(env.tab_ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_active_tab_never_closed_for_inactivity() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://b.com"]));
    env.controller.on_tab_activated(TabId(1)).await;
    env.controller.on_tab_activated(TabId(2)).await;
    env.clock.advance(10 * 60_000);

    env.controller.close_inactive(1_000).await;

    assert_eq!(env.tab_ids(), vec![1]);
}

#[tokio::test]
async fn test_group_by_host_with_internal_pages() {
    let env = TestEnv::with_config(
        window_of(&[
            "chrome://extensions",
            "https://www.github.com/a",
            "chrome://extensions",
            "https://github.com/b",
            "about:blank",
        ]),
        Config::default().with_group_color(GroupColor::Green),
    );

    let report = env.controller.group_by_host().await;

    assert_eq!(report.succeeded_count(), 2);
    let mut titles: Vec<String> = env
        .browser
        .groups()
        .into_iter()
        .filter_map(|g| g.title)
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["chrome://extensions", "github.com"]);
    assert!(env.browser.groups().iter().all(|g| g.color == GroupColor::Green));

    let ungrouped: Vec<String> = env
        .browser
        .tabs()
        .into_iter()
        .filter(|t| !t.is_grouped())
        .map(|t| t.url)
        .collect();
    assert_eq!(ungrouped, vec!["about:blank"]);

    env.controller.ungroup_all().await;
    assert!(env.browser.groups().is_empty());
}

#[tokio::test]
async fn test_undo_falls_back_to_browser_history() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://b.com", "https://c.com"]));
    // Closed by the user, not by an operation: nothing on the undo log
    env.browser.remove_tab(TabId(2)).await.unwrap();
    env.clock.advance(1_000);
    env.browser.remove_tab(TabId(3)).await.unwrap();

    let report = env.controller.undo().await;

    assert_eq!(report.undo_source, Some(UndoSource::RecentlyClosed));
    assert_eq!(report.succeeded_count(), 2);
    assert_eq!(env.browser.tabs().len(), 3);
}

#[tokio::test]
async fn test_undo_bound_keeps_thirty_batches() {
    let env = TestEnv::with_config(window_of(&[]), Config::default().with_undo_capacity(30));

    for i in 0..35 {
        env.browser
            .create_tab(tabwarden::browser::CreateTabRequest::new("https://dup.com"))
            .await
            .unwrap();
        env.browser
            .create_tab(tabwarden::browser::CreateTabRequest::new("https://dup.com"))
            .await
            .unwrap();
        env.clock.set(i);
        env.controller.deduplicate().await;
    }

    let batches = env.controller.undo_log().batches().await.unwrap();
    assert_eq!(batches.len(), 30);
    assert_eq!(batches[0].time, 5);
    assert_eq!(batches[29].time, 34);
}

#[tokio::test]
async fn test_snapshot_persists_and_reopens() {
    let env = TestEnv::new(window_of(&["https://a.com", "", "https://b.com"]));
    let saved = env.controller.save_snapshot("reading").await.unwrap();

    let controller = env.restart();
    let listed = controller.list_snapshots().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);

    let report = controller.open_snapshot(&saved.id).await;

    assert_eq!(report.succeeded_count(), 2);
    let windows: std::collections::HashSet<_> =
        env.browser.tabs().iter().map(|t| t.window_id).collect();
    assert_eq!(windows.len(), 2);
}
