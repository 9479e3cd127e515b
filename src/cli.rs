//! Command-line interface for tabwarden
//!
//! Each invocation loads a browser-state file, runs one command or event
//! through the dispatcher and writes the state back.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::browser::{MemoryBrowser, TabId};
use crate::core::{BrowserEvent, Command};

/// tabwarden - keep browser tabs under control
#[derive(Parser, Debug)]
#[command(name = "tabwarden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Browser state file (default: ~/.tabwarden/browser.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub browser: Option<PathBuf>,

    /// Data directory (default: ~/.tabwarden)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Close duplicate tabs
    Dedupe,
    /// Close tabs idle longer than a limit
    CloseInactive(InactiveArgs),
    /// Group tabs by host
    Group,
    /// Ungroup every tab
    Ungroup,
    /// Reopen the most recently closed batch
    Undo,
    /// Toggle protection of the active tab
    Bookmark,
    /// Show protection status of the active tab
    Status,
    /// Record that a tab became active
    Activate { tab_id: i64 },
    /// Record that a tab was closed
    Removed { tab_id: i64 },
    /// Manage saved tab snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommands),
    /// Send a raw JSON command, e.g. '{"action":"closeDuplicates"}'
    Send { json: String },
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct InactiveArgs {
    /// Idle limit in minutes (default from config)
    #[arg(long)]
    pub minutes: Option<u64>,
    /// Idle limit in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    pub limit_ms: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Save all open tabs under a name
    Save { name: String },
    List,
    /// Open a snapshot's tabs in a new window
    Open { id: String },
    Delete { id: String },
}

/// What a parsed invocation asks the dispatcher to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Command(Command),
    Event(BrowserEvent),
}

impl Request {
    /// Mirror the browser-side effect of an event on the simulated browser.
    ///
    /// A real browser switches tabs before it reports the activation; the
    /// state file has to be updated the same way.
    pub fn apply_to(&self, browser: &MemoryBrowser) {
        if let Request::Event(BrowserEvent::TabActivated(tab_id)) = self {
            if !browser.activate(*tab_id) {
                tracing::warn!(tab_id = %tab_id, "Cannot activate unknown tab");
            }
        }
    }
}

impl Commands {
    /// Resolve into a dispatcher request. `default_limit_ms` applies when
    /// close-inactive is given no explicit limit.
    pub fn into_request(self, default_limit_ms: i64) -> Result<Request, serde_json::Error> {
        let command = match self {
            Commands::Dedupe => Command::CloseDuplicates,
            Commands::CloseInactive(args) => {
                let limit = match (args.limit_ms, args.minutes) {
                    (Some(ms), _) => ms,
                    (None, Some(minutes)) => {
                        i64::try_from(minutes.saturating_mul(60_000)).unwrap_or(i64::MAX)
                    }
                    (None, None) => default_limit_ms,
                };
                Command::CloseInactive { limit }
            }
            Commands::Group => Command::Group,
            Commands::Ungroup => Command::Ungroup,
            Commands::Undo => Command::Undo,
            Commands::Bookmark => Command::ToggleBookmark,
            Commands::Status => Command::GetBookmarkStatus,
            Commands::Activate { tab_id } => {
                return Ok(Request::Event(BrowserEvent::TabActivated(TabId(tab_id))))
            }
            Commands::Removed { tab_id } => {
                return Ok(Request::Event(BrowserEvent::TabRemoved(TabId(tab_id))))
            }
            Commands::Snapshot(SnapshotCommands::Save { name }) => Command::SaveSnapshot { name },
            Commands::Snapshot(SnapshotCommands::List) => Command::ListSnapshots,
            Commands::Snapshot(SnapshotCommands::Open { id }) => Command::OpenSnapshot { id },
            Commands::Snapshot(SnapshotCommands::Delete { id }) => Command::DeleteSnapshot { id },
            Commands::Send { json } => serde_json::from_str(&json)?,
        };
        Ok(Request::Command(command))
    }
}
