//! The on-disk JSON document

use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// A problem file that has been opened but not yet solved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub title: String,
    /// Unix seconds when the file was first opened
    pub time: f64,
}

/// A solved problem file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub title: String,
    /// Number of times the file was marked done
    #[serde(deserialize_with = "floor_count")]
    pub completeness: u32,
}

/// Older data files stored the elapsed seconds here, as a float.
fn floor_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.max(0.0).floor() as u32)
}

/// Everything that is tracked, keyed by file name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub problems: BTreeMap<String, Problem>,
    #[serde(default)]
    pub solutions: BTreeMap<String, Solution>,
}

impl Document {
    /// Read the document at `path`.
    ///
    /// Never fails: a missing, unreadable or unparsable file yields an empty
    /// document.
    pub async fn read_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No data file at {}, starting empty", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Error reading data from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                warn!("Error parsing data in {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Overwrite the file at `path` with this document.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        if let Err(e) = self.try_write(path).await {
            error!("Error writing data to {}: {}", path.display(), e);
            return Err(e);
        }
        debug!("Data written to {}", path.display());
        Ok(())
    }

    async fn try_write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty() && self.solutions.is_empty()
    }
}
