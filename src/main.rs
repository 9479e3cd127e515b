use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tabwarden::browser::{BrowserState, MemoryBrowser};
use tabwarden::cli::{Cli, Request};
use tabwarden::util::{self, SystemClock};
use tabwarden::{AppStateStore, Config, Database, Dispatcher, LifecycleController, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir.clone());

    // Initialize logging to file (~/.tabwarden/logs/tabwarden.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();

    let config = Config::load();
    let default_limit_ms = i64::try_from(config.default_inactive_limit.as_millis())
        .unwrap_or(i64::MAX);
    let request = cli
        .command
        .into_request(default_limit_ms)
        .context("Invalid command JSON")?;

    let db = Database::open_default().context("Failed to open database")?;
    let storage = Storage::new(Arc::new(AppStateStore::new(db.connection())));

    let browser_path = cli.browser.unwrap_or_else(util::browser_state_path);
    let browser = MemoryBrowser::from_state(load_browser_state(&browser_path)?);

    let controller = LifecycleController::new(
        Arc::new(browser.clone()),
        storage,
        Arc::new(SystemClock),
        config,
    );
    let handle = Dispatcher::spawn(controller);
    request.apply_to(&browser);

    match request {
        Request::Command(command) => {
            let response = handle.send(command).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Request::Event(event) => {
            handle.notify(event);
        }
    }

    // Drain queued events before persisting
    handle.flush().await?;
    handle.shutdown();

    save_browser_state(&browser_path, &browser.state())
}

fn load_browser_state(path: &Path) -> Result<BrowserState> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No browser state file; starting empty");
        return Ok(BrowserState::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid browser state in {}", path.display()))
}

fn save_browser_state(path: &Path, state: &BrowserState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(state)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}
