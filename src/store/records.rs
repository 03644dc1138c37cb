//! Record operations over the document
//!
//! No locking: two operations in flight at once can interleave their reads
//! and writes and lose an update.

use super::document::{Document, Problem, Solution};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Problem/solution records backed by one JSON file
#[derive(Debug, Clone)]
pub struct ProblemStore {
    path: PathBuf,
}

impl ProblemStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document as currently stored
    pub async fn snapshot(&self) -> Document {
        Document::read_from(&self.path).await
    }

    /// Start tracking a problem. Does nothing if the title is already open.
    pub async fn add_problem(&self, title: &str, time: f64) -> Result<()> {
        let mut document = self.snapshot().await;

        if document.problems.contains_key(title) {
            error!("Problem with the same title already exists: {}", title);
            return Ok(());
        }

        document.problems.insert(
            title.to_string(),
            Problem {
                title: title.to_string(),
                time,
            },
        );
        debug!("Added problem {} at {}", title, time);
        document.write_to(&self.path).await
    }

    /// Stop tracking a problem. Does nothing if the title is not open.
    pub async fn delete_problem(&self, title: &str) -> Result<()> {
        let mut document = self.snapshot().await;

        if document.problems.remove(title).is_none() {
            error!("Problem not found: {}", title);
            return Ok(());
        }

        debug!("Deleted problem {}", title);
        document.write_to(&self.path).await
    }

    pub async fn find_problem(&self, title: &str) -> Option<Problem> {
        self.snapshot().await.problems.remove(title)
    }

    /// Record a solve. A new title stores `completeness` as given; an
    /// existing one is bumped by exactly one.
    pub async fn add_solution(&self, title: &str, completeness: u32) -> Result<()> {
        let mut document = self.snapshot().await;

        match document.solutions.get_mut(title) {
            Some(solution) => {
                solution.completeness = solution.completeness.saturating_add(1);
                debug!(
                    "Solution {} completeness now {}",
                    title, solution.completeness
                );
            }
            None => {
                document.solutions.insert(
                    title.to_string(),
                    Solution {
                        title: title.to_string(),
                        completeness,
                    },
                );
                debug!("Added solution {}", title);
            }
        }

        document.write_to(&self.path).await
    }

    pub async fn find_solution(&self, title: &str) -> Option<Solution> {
        self.snapshot().await.solutions.remove(title)
    }
}
