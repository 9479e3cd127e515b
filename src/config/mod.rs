mod settings;

pub use settings::{
    Config, ConfigError, DEFAULT_RESTORE_WINDOW_MS, DEFAULT_UNDO_CAPACITY, EXAMPLE_CONFIG,
};
