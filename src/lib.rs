pub mod browser;
pub mod cli;
pub mod config;
pub mod core;
pub mod data;
pub mod util;

pub use browser::{MemoryBrowser, TabId, TabService, TabSnapshot};
pub use config::Config;
pub use crate::core::{
    BookmarkStatus, BrowserEvent, Command, Dispatcher, DispatcherHandle, LifecycleController,
    OperationReport, Response,
};
pub use data::{AppStateStore, Database, Storage};
