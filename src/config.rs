//! Configuration loading
//!
//! Settings resolve in this order (later wins):
//!   1. `<config_dir>/leetcode-timer/config.toml`
//!   2. `LEETCODE_TIMER_DIR`, `LEETCODE_TIMER_BOT_TOKEN`, `LEETCODE_TIMER_DATA`
//!   3. command-line overrides
//!
//! Only the problem folder is required.

use crate::{Result, TimerConfig, TimerError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "leetcode-timer";

pub const ENV_PROBLEM_DIR: &str = "LEETCODE_TIMER_DIR";
pub const ENV_BOT_TOKEN: &str = "LEETCODE_TIMER_BOT_TOKEN";
pub const ENV_DATA_FILE: &str = "LEETCODE_TIMER_DATA";

/// `config.toml` as written by the user. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub problem_dir: Option<String>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: Option<String>,
    pub marker: Option<String>,
    pub data_file: Option<String>,
    pub ignore: Option<Vec<String>>,
}

impl ConfigFile {
    /// Read a config file. A missing file is an empty config; a malformed
    /// one is an error.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub problem_dir: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub marker: Option<String>,
}

/// Merge file, environment and command line into a [`TimerConfig`].
///
/// `env` is the environment lookup, injected so resolution can be tested
/// without touching the process environment.
pub fn resolve<F>(file: ConfigFile, env: F, overrides: Overrides) -> Result<TimerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let problem_dir = overrides
        .problem_dir
        .or_else(|| env(ENV_PROBLEM_DIR).map(|p| expand_home(&p)))
        .or_else(|| file.problem_dir.as_deref().map(expand_home))
        .ok_or_else(|| {
            TimerError::Config(format!(
                "problem_dir is not set (config.toml, {ENV_PROBLEM_DIR} or --dir)"
            ))
        })?;

    let data_file = match overrides
        .data_file
        .or_else(|| env(ENV_DATA_FILE).map(|p| expand_home(&p)))
        .or_else(|| file.data_file.as_deref().map(expand_home))
    {
        Some(path) => path,
        None => default_data_file()?,
    };

    let mut config = TimerConfig::new(problem_dir, data_file);

    if let Some(token) = env(ENV_BOT_TOKEN).or(file.bot_token) {
        if !token.trim().is_empty() {
            config = config.with_bot_token(token.trim());
        }
    }
    if let Some(chat_id) = file.chat_id {
        config = config.with_chat_id(chat_id);
    }
    if let Some(api_base) = file.api_base {
        config = config.with_api_base(api_base.trim_end_matches('/'));
    }
    if let Some(marker) = overrides.marker.or(file.marker) {
        if marker.trim().is_empty() {
            return Err(TimerError::Config("marker must not be empty".to_string()));
        }
        config = config.with_marker(marker.trim());
    }
    if let Some(ignore) = file.ignore {
        config = config.with_ignore(ignore);
    }

    Ok(config)
}

/// Default location of `config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| TimerError::Config("Could not find config directory".to_string()))?;
    Ok(dir.join(APP_DIR).join("config.toml"))
}

/// Default location of the problem/solution document.
pub fn default_data_file() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| TimerError::Config("Could not find data directory".to_string()))?;
    Ok(dir.join(APP_DIR).join("data.json"))
}

/// Editor swap/backup files and dotfiles.
pub fn default_ignore() -> Vec<String> {
    vec![".*".to_string(), "*~".to_string(), "*.swp".to_string(), "*.tmp".to_string()]
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
