//! Integration tests for commands and events through the dispatcher

use super::common::fixtures::{window_of, TestEnv};
use tabwarden::browser::TabId;
use tabwarden::core::ItemOutcome;
use tabwarden::{BrowserEvent, Command, Dispatcher, Response};

#[tokio::test]
async fn test_json_commands_round_trip_through_dispatcher() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://a.com", "https://b.com"]));
    let handle = Dispatcher::spawn(env.controller.clone());

    let command: Command = serde_json::from_str(r#"{"action":"closeDuplicates"}"#).unwrap();
    let response = handle.send(command).await.unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["action"], "report");
    assert_eq!(json["result"]["operation"], "deduplicate");
    assert_eq!(json["result"]["undoRecorded"], true);
    assert_eq!(env.tab_ids(), vec![1, 3]);

    let undo: Command = serde_json::from_str(r#"{"action":"control-z"}"#).unwrap();
    handle.send(undo).await.unwrap();
    assert_eq!(env.browser.tabs().len(), 3);
}

#[tokio::test]
async fn test_activity_events_drive_close_inactive() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://b.com", "https://c.com"]));
    let handle = Dispatcher::spawn(env.controller.clone());

    for id in 1..=3 {
        handle.notify(BrowserEvent::TabActivated(TabId(id)));
    }
    handle.flush().await.unwrap();
    env.clock.advance(120_000);
    handle.notify(BrowserEvent::TabActivated(TabId(3)));

    let report = handle
        .send(Command::CloseInactive { limit: 60_000 })
        .await
        .unwrap()
        .into_report()
        .unwrap();

    // Tab 1 is the active tab; tab 3 was just used
    assert_eq!(report.removed_ids(), vec![TabId(2)]);

    handle.notify(BrowserEvent::TabRemoved(TabId(2)));
    handle.flush().await.unwrap();
    assert!(!env
        .controller
        .activity()
        .tracked()
        .await
        .unwrap()
        .contains(&TabId(2)));
}

#[tokio::test]
async fn test_closed_tabs_leave_no_activity_behind() {
    let env = TestEnv::new(window_of(&[
        "https://a.com",
        "https://b.com",
        "https://c.com",
        "https://c.com",
    ]));
    let handle = Dispatcher::spawn(env.controller.clone());

    for id in 1..=4 {
        handle.notify(BrowserEvent::TabActivated(TabId(id)));
    }
    handle.send(Command::CloseDuplicates).await.unwrap();
    env.clock.advance(120_000);
    handle.notify(BrowserEvent::TabActivated(TabId(1)));
    handle
        .send(Command::CloseInactive { limit: 60_000 })
        .await
        .unwrap();

    // The browser reports removals of tabs the dispatcher closed itself
    handle.notify(BrowserEvent::TabRemoved(TabId(2)));
    handle.flush().await.unwrap();

    assert_eq!(env.tab_ids(), vec![1]);
    assert_eq!(env.controller.activity().tracked().await.unwrap(), vec![TabId(1)]);
}

#[tokio::test]
async fn test_activation_requires_a_live_tab() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://b.com"]));
    let handle = Dispatcher::spawn(env.controller.clone());

    assert!(env.browser.activate(TabId(2)));
    handle.notify(BrowserEvent::TabActivated(TabId(999)));
    handle.notify(BrowserEvent::TabActivated(TabId(2)));
    handle.flush().await.unwrap();

    assert_eq!(env.controller.activity().tracked().await.unwrap(), vec![TabId(2)]);

    let status = handle
        .send(Command::ToggleBookmark)
        .await
        .unwrap()
        .into_status()
        .unwrap();
    assert!(status.added);
    assert_eq!(status.protected, vec![TabId(2)]);
}

#[tokio::test]
async fn test_bookmark_toggle_notifies_subscribers() {
    let env = TestEnv::new(window_of(&["https://a.com"]));
    let handle = Dispatcher::spawn(env.controller.clone());
    let mut popup = handle.subscribe();

    let response = handle.send(Command::ToggleBookmark).await.unwrap();
    let broadcast = popup.recv().await.unwrap();

    assert_eq!(response, Response::BookmarkStatus(broadcast.clone()));
    assert!(broadcast.added);
    assert_eq!(broadcast.protected, vec![TabId(1)]);

    let status = handle
        .send(Command::GetBookmarkStatus)
        .await
        .unwrap()
        .into_status()
        .unwrap();
    assert_eq!(status, broadcast);
}

#[tokio::test]
async fn test_group_then_ungroup_reports_every_item() {
    let env = TestEnv::new(window_of(&[
        "https://a.com/1",
        "https://a.com/2",
        "https://b.com/1",
        "https://b.com/2",
    ]));
    let handle = Dispatcher::spawn(env.controller.clone());

    let grouped = handle
        .send(Command::Group)
        .await
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(grouped.items.len(), 2);
    assert!(grouped.items.iter().all(|i| i.outcome == ItemOutcome::Done));

    let ungrouped = handle
        .send(Command::Ungroup)
        .await
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(ungrouped.succeeded_count(), 4);
    assert!(env.browser.tabs().iter().all(|t| !t.is_grouped()));
}

#[tokio::test]
async fn test_snapshot_commands() {
    let env = TestEnv::new(window_of(&["https://a.com", "https://b.com"]));
    let handle = Dispatcher::spawn(env.controller.clone());

    let Response::SnapshotSaved(Some(saved)) = handle
        .send(Command::SaveSnapshot {
            name: "morning".into(),
        })
        .await
        .unwrap()
    else {
        panic!("expected a saved snapshot");
    };

    let Response::Snapshots(list) = handle.send(Command::ListSnapshots).await.unwrap() else {
        panic!("expected a snapshot list");
    };
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "morning");

    let opened = handle
        .send(Command::OpenSnapshot {
            id: saved.id.clone(),
        })
        .await
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(opened.succeeded_count(), 2);
    assert_eq!(env.browser.tabs().len(), 4);

    let deleted = handle
        .send(Command::DeleteSnapshot { id: saved.id })
        .await
        .unwrap();
    assert_eq!(deleted, Response::SnapshotDeleted(true));
}
