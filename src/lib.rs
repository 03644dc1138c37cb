//! Leetcode Timer
//!
//! Times how long a problem file stays open before it is saved with a
//! completion marker, and reports the solve to a chat channel:
//! - Persist open problems and solved problems in a single JSON document
//! - React to editor "opened" / "saved" events under a tracked folder
//! - Send a chat message with the elapsed time when a problem is done

pub mod config;
pub mod notifier;
pub mod store;
pub mod tracker;
pub mod watcher;

pub use notifier::{Notifier, TelegramNotifier};
pub use store::{Document, Problem, ProblemStore, Solution};
pub use tracker::{OpenOutcome, SaveOutcome, TextDocument, Tracker};

use std::path::PathBuf;

/// Marker that flags a problem file as done when it ends the saved text.
pub const DEFAULT_MARKER: &str = "// done";

/// Default destination chat for solve notifications.
pub const DEFAULT_CHAT_ID: &str = "-1001317411526";

/// Base URL of the Telegram bot API.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Resolved configuration for Leetcode Timer
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Folder prefix; only files below it are tracked
    pub problem_dir: PathBuf,

    /// Path to the JSON document holding problems and solutions
    pub data_file: PathBuf,

    /// Bot token; notifications are skipped without one
    pub bot_token: Option<String>,

    /// Destination chat for solve notifications
    pub chat_id: String,

    /// Base URL of the bot API
    pub api_base: String,

    /// Trailing comment that marks a problem as solved
    pub marker: String,

    /// Glob patterns (matched on file names) the watcher skips
    pub ignore: Vec<String>,
}

impl TimerConfig {
    pub fn new(problem_dir: PathBuf, data_file: PathBuf) -> Self {
        Self {
            problem_dir,
            data_file,
            bot_token: None,
            chat_id: DEFAULT_CHAT_ID.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            marker: DEFAULT_MARKER.to_string(),
            ignore: config::default_ignore(),
        }
    }

    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = chat_id.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }
}

/// Result type for Leetcode Timer operations
pub type Result<T> = std::result::Result<T, TimerError>;

/// Errors that can occur in Leetcode Timer
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
