//! Browser, storage and controller fixtures

use std::sync::Arc;

use tabwarden::browser::{MemoryBrowser, TabSnapshot};
use tabwarden::util::ManualClock;
use tabwarden::{AppStateStore, Config, Database, LifecycleController, Storage};
use tempfile::TempDir;

/// Fixed start time for tests (2024-01-01 00:00:00 UTC)
pub const TEST_EPOCH_MS: i64 = 1_704_067_200_000;

/// A controller wired to an in-memory browser and an on-disk database
pub struct TestEnv {
    pub browser: MemoryBrowser,
    pub clock: Arc<ManualClock>,
    pub controller: LifecycleController,
    pub db: Database,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new(tabs: Vec<TabSnapshot>) -> Self {
        Self::with_config(tabs, Config::default())
    }

    pub fn with_config(tabs: Vec<TabSnapshot>, config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(dir.path().join("test.db")).expect("Failed to open database");
        let clock = Arc::new(ManualClock::new(TEST_EPOCH_MS));
        let browser = MemoryBrowser::with_tabs(tabs).with_clock(clock.clone());
        let controller = LifecycleController::new(
            Arc::new(browser.clone()),
            storage_for(&db),
            clock.clone(),
            config,
        );
        Self {
            browser,
            clock,
            controller,
            db,
            _dir: dir,
        }
    }

    /// A second controller over the same database and browser, as after a restart
    pub fn restart(&self) -> LifecycleController {
        LifecycleController::new(
            Arc::new(self.browser.clone()),
            storage_for(&self.db),
            self.clock.clone(),
            self.controller.config().clone(),
        )
    }

    pub fn urls(&self) -> Vec<String> {
        self.browser.tabs().into_iter().map(|t| t.url).collect()
    }

    pub fn tab_ids(&self) -> Vec<i64> {
        self.browser.tabs().iter().map(|t| t.id.0).collect()
    }
}

pub fn storage_for(db: &Database) -> Storage {
    Storage::new(Arc::new(AppStateStore::new(db.connection())))
}

/// Tabs in window 1 with the given URLs, ids starting at 1
pub fn window_of(urls: &[&str]) -> Vec<TabSnapshot> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| TabSnapshot::new(i as i64 + 1, *url, 1, i))
        .collect()
}
