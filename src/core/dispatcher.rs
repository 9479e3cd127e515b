//! Single-consumer mailbox in front of the lifecycle controller
//!
//! Commands and browser events are queued on one channel and handled strictly
//! one at a time, so no two operations ever interleave their
//! read-modify-write cycles on shared state.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::browser::TabId;

use super::controller::{BookmarkStatus, LifecycleController};
use super::report::OperationReport;
use super::snapshots::Snapshot;

/// Bookmark-status subscribers that fall this far behind lose old updates
const STATUS_CHANNEL_CAPACITY: usize = 16;

/// User-initiated commands, in their wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    #[serde(rename = "closeDuplicates")]
    CloseDuplicates,
    /// `limit` is the idle threshold in milliseconds
    #[serde(rename = "closeInactive")]
    CloseInactive { limit: i64 },
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "ungroup")]
    Ungroup,
    #[serde(rename = "control-z")]
    Undo,
    #[serde(rename = "bookmark")]
    ToggleBookmark,
    #[serde(rename = "getBookmarkStatus")]
    GetBookmarkStatus,
    #[serde(rename = "saveSnapshot")]
    SaveSnapshot { name: String },
    #[serde(rename = "listSnapshots")]
    ListSnapshots,
    #[serde(rename = "openSnapshot")]
    OpenSnapshot { id: String },
    #[serde(rename = "deleteSnapshot")]
    DeleteSnapshot { id: String },
}

/// Tab events delivered by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "tabId", rename_all = "camelCase")]
pub enum BrowserEvent {
    TabActivated(TabId),
    TabRemoved(TabId),
}

/// One reply per [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "result", rename_all = "camelCase")]
pub enum Response {
    Report(OperationReport),
    BookmarkStatus(BookmarkStatus),
    /// `None` when the tab query or the write failed
    SnapshotSaved(Option<Snapshot>),
    Snapshots(Vec<Snapshot>),
    SnapshotDeleted(bool),
}

impl Response {
    pub fn into_report(self) -> Option<OperationReport> {
        match self {
            Response::Report(report) => Some(report),
            _ => None,
        }
    }

    pub fn into_status(self) -> Option<BookmarkStatus> {
        match self {
            Response::BookmarkStatus(status) => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatcher has shut down")]
    Closed,
    #[error("Dispatcher dropped the reply for {0:?}")]
    NoReply(Command),
}

enum Message {
    Command {
        command: Command,
        reply: oneshot::Sender<Response>,
    },
    Event(BrowserEvent),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Handle for queuing work on the dispatcher
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Message>,
    status_tx: broadcast::Sender<BookmarkStatus>,
}

impl DispatcherHandle {
    /// Queue a command and wait for its response
    pub async fn send(&self, command: Command) -> Result<Response, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Command {
                command: command.clone(),
                reply,
            })
            .map_err(|_| DispatchError::Closed)?;
        rx.await.map_err(|_| DispatchError::NoReply(command))
    }

    /// Queue a browser event. Fire-and-forget.
    pub fn notify(&self, event: BrowserEvent) {
        if self.tx.send(Message::Event(event)).is_err() {
            tracing::debug!(?event, "Dropping browser event; dispatcher stopped");
        }
    }

    /// Wait until everything queued before this call has been handled
    pub async fn flush(&self) -> Result<(), DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Flush(reply))
            .map_err(|_| DispatchError::Closed)?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Receive every bookmark status published by a protection toggle
    pub fn subscribe(&self) -> broadcast::Receiver<BookmarkStatus> {
        self.status_tx.subscribe()
    }

    /// Stop after the messages already queued
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// Background task owning the controller
pub struct Dispatcher {
    controller: LifecycleController,
    rx: mpsc::UnboundedReceiver<Message>,
    status_tx: broadcast::Sender<BookmarkStatus>,
}

impl Dispatcher {
    /// Spawn the dispatcher and return a handle to it
    pub fn spawn(controller: LifecycleController) -> DispatcherHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);

        let dispatcher = Self {
            controller,
            rx,
            status_tx: status_tx.clone(),
        };
        tokio::spawn(dispatcher.run());

        DispatcherHandle { tx, status_tx }
    }

    async fn run(mut self) {
        tracing::debug!("Dispatcher started");
        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Shutdown => break,
                Message::Event(event) => self.handle_event(event).await,
                Message::Flush(reply) => {
                    let _ = reply.send(());
                }
                Message::Command { command, reply } => {
                    let response = self.handle_command(command).await;
                    // Caller may have stopped waiting
                    let _ = reply.send(response);
                }
            }
        }
        tracing::debug!("Dispatcher stopped");
    }

    async fn handle_event(&self, event: BrowserEvent) {
        match event {
            BrowserEvent::TabActivated(tab_id) => self.controller.on_tab_activated(tab_id).await,
            BrowserEvent::TabRemoved(tab_id) => self.controller.on_tab_removed(tab_id).await,
        }
    }

    async fn handle_command(&self, command: Command) -> Response {
        tracing::debug!(?command, "Handling command");
        let c = &self.controller;
        match command {
            Command::CloseDuplicates => Response::Report(c.deduplicate().await),
            Command::CloseInactive { limit } => Response::Report(c.close_inactive(limit).await),
            Command::Group => Response::Report(c.group_by_host().await),
            Command::Ungroup => Response::Report(c.ungroup_all().await),
            Command::Undo => Response::Report(c.undo().await),
            Command::ToggleBookmark => {
                let status = c.toggle_protection().await;
                // No subscribers is fine
                let _ = self.status_tx.send(status.clone());
                Response::BookmarkStatus(status)
            }
            Command::GetBookmarkStatus => Response::BookmarkStatus(c.bookmark_status().await),
            Command::SaveSnapshot { name } => Response::SnapshotSaved(c.save_snapshot(&name).await),
            Command::ListSnapshots => Response::Snapshots(c.list_snapshots().await),
            Command::OpenSnapshot { id } => Response::Report(c.open_snapshot(&id).await),
            Command::DeleteSnapshot { id } => Response::SnapshotDeleted(c.delete_snapshot(&id).await),
        }
    }
}
