//! Editor event handling
//!
//! Opening a file under the problem folder starts its timer; saving it with
//! the completion marker at the end stops the timer, moves the record from
//! problems to solutions, and announces the elapsed time.

use crate::notifier::{compose_message, Notifier};
use crate::store::ProblemStore;
use crate::{Result, TimerConfig};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A text document as seen by an editor event
#[derive(Debug, Clone)]
pub struct TextDocument {
    /// `None` for an untitled (never saved) buffer
    pub path: Option<PathBuf>,
    pub text: String,
}

impl TextDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            text: text.into(),
        }
    }

    pub fn untitled(text: impl Into<String>) -> Self {
        Self {
            path: None,
            text: text.into(),
        }
    }
}

/// What an "opened" event did
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    /// Untitled buffer or outside the problem folder
    Ignored,
    /// Already solved earlier
    Solved,
    /// Timer was already running
    AlreadyTracking,
    /// Timer started
    Started { title: String, time: f64 },
}

/// What a "saved" event did
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Untitled buffer, outside the problem folder, or no marker
    Ignored,
    /// Marker present but the problem was solved before
    AlreadySolved { title: String },
    /// Marker present but no timer was running for the file
    Untracked { title: String },
    /// Timer stopped and the solve announced
    Solved {
        title: String,
        elapsed_secs: f64,
        elapsed: String,
    },
}

impl SaveOutcome {
    /// The line shown to the user, if any.
    pub fn message(&self, marker: &str) -> Option<String> {
        match self {
            Self::Ignored => None,
            Self::AlreadySolved { .. } => Some("Already solved".to_string()),
            Self::Untracked { .. } | Self::Solved { .. } => {
                Some(format!("File saved with \"{marker}\" at the end!"))
            }
        }
    }
}

/// Turns editor events into store updates and notifications
pub struct Tracker<N> {
    problem_dir: PathBuf,
    marker: String,
    store: ProblemStore,
    notifier: N,
}

impl<N: Notifier> Tracker<N> {
    pub fn new(config: &TimerConfig, store: ProblemStore, notifier: N) -> Self {
        Self {
            problem_dir: config.problem_dir.clone(),
            marker: config.marker.clone(),
            store,
            notifier,
        }
    }

    pub fn store(&self) -> &ProblemStore {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Handle a document being opened at unix time `now`.
    pub async fn document_opened(&self, document: &TextDocument, now: f64) -> Result<OpenOutcome> {
        let Some(title) = document.path.as_deref().and_then(|p| self.tracked_title(p)) else {
            return Ok(OpenOutcome::Ignored);
        };
        debug!("Opened {}", title);

        if self.store.find_solution(&title).await.is_some() {
            return Ok(OpenOutcome::Solved);
        }
        if self.store.find_problem(&title).await.is_some() {
            return Ok(OpenOutcome::AlreadyTracking);
        }

        self.store.add_problem(&title, now).await?;
        info!("Started timer for {}", title);
        Ok(OpenOutcome::Started { title, time: now })
    }

    /// Handle a document being saved at unix time `now`.
    pub async fn document_saved(&self, document: &TextDocument, now: f64) -> Result<SaveOutcome> {
        let Some(title) = document.path.as_deref().and_then(|p| self.tracked_title(p)) else {
            return Ok(SaveOutcome::Ignored);
        };
        if !self.ends_with_marker(&document.text) {
            return Ok(SaveOutcome::Ignored);
        }

        if self.store.find_solution(&title).await.is_some() {
            info!("{} already solved", title);
            return Ok(SaveOutcome::AlreadySolved { title });
        }

        let Some(problem) = self.store.find_problem(&title).await else {
            debug!("No running timer for {}", title);
            return Ok(SaveOutcome::Untracked { title });
        };

        let elapsed_secs = now - problem.time;
        self.store.delete_problem(&title).await?;
        self.store.add_solution(&title, 1).await?;

        let elapsed = format_elapsed(elapsed_secs);
        info!("Solved {} in {}", title, elapsed);

        if let Err(e) = self.notifier.send(&compose_message(&title, &elapsed)).await {
            warn!("Failed to send notification for {}: {}", title, e);
        }

        Ok(SaveOutcome::Solved {
            title,
            elapsed_secs,
            elapsed,
        })
    }

    /// File name of `path` if it lies under the problem folder.
    fn tracked_title(&self, path: &Path) -> Option<String> {
        if !path.starts_with(&self.problem_dir) {
            return None;
        }
        path.file_name().map(|name| name.to_string_lossy().into_owned())
    }

    fn ends_with_marker(&self, text: &str) -> bool {
        text.trim_end().ends_with(&self.marker)
    }
}

/// Current unix time in seconds, with millisecond precision.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Render elapsed seconds as `H hours, M minutes, S seconds`, leaving out
/// leading zero units.
pub fn format_elapsed(elapsed_secs: f64) -> String {
    let total = if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
        elapsed_secs.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours} hours, "));
    }
    if minutes > 0 || hours > 0 {
        out.push_str(&format!("{minutes} minutes, "));
    }
    out.push_str(&format!("{seconds} seconds"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        async fn send(&self, _text: &str) -> Result<()> {
            Err(crate::TimerError::Notify("offline".to_string()))
        }
    }

    fn tracker<N: Notifier>(temp_dir: &TempDir, notifier: N) -> Tracker<N> {
        let config = TimerConfig::new(
            temp_dir.path().join("problems"),
            temp_dir.path().join("data.json"),
        );
        let store = ProblemStore::new(config.data_file.clone());
        Tracker::new(&config, store, notifier)
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "0 seconds");
        assert_eq!(format_elapsed(90.7), "1 minutes, 30 seconds");
        assert_eq!(format_elapsed(59.9), "59 seconds");
        assert_eq!(format_elapsed(3600.0), "1 hours, 0 minutes, 0 seconds");
        assert_eq!(format_elapsed(3725.0), "1 hours, 2 minutes, 5 seconds");
        assert_eq!(format_elapsed(-5.0), "0 seconds");
    }

    #[test]
    fn test_save_outcome_messages() {
        let title = "a.py".to_string();
        assert_eq!(SaveOutcome::Ignored.message("// done"), None);
        assert_eq!(
            SaveOutcome::AlreadySolved { title: title.clone() }.message("// done"),
            Some("Already solved".to_string())
        );
        assert_eq!(
            SaveOutcome::Untracked { title }.message("// done"),
            Some("File saved with \"// done\" at the end!".to_string())
        );
    }

    #[tokio::test]
    async fn test_open_untitled_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());

        let outcome = tracker
            .document_opened(&TextDocument::untitled("x"), 1.0)
            .await
            .unwrap();
        assert_eq!(outcome, OpenOutcome::Ignored);
        assert!(tracker.store().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_outside_prefix_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());

        let outside = temp_dir.path().join("problems-old").join("a.py");
        let outcome = tracker
            .document_opened(&TextDocument::new(outside, ""), 1.0)
            .await
            .unwrap();
        assert_eq!(outcome, OpenOutcome::Ignored);
        assert!(tracker.store().find_problem("a.py").await.is_none());
    }

    #[tokio::test]
    async fn test_reopen_keeps_first_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());
        let document = TextDocument::new(temp_dir.path().join("problems").join("a.py"), "");

        let first = tracker.document_opened(&document, 1000.0).await.unwrap();
        assert_eq!(
            first,
            OpenOutcome::Started {
                title: "a.py".to_string(),
                time: 1000.0
            }
        );
        let second = tracker.document_opened(&document, 2000.0).await.unwrap();
        assert_eq!(second, OpenOutcome::AlreadyTracking);
        assert_eq!(tracker.store().find_problem("a.py").await.unwrap().time, 1000.0);
    }

    #[tokio::test]
    async fn test_open_solved_does_not_restart() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());
        tracker.store().add_solution("a.py", 1).await.unwrap();

        let document = TextDocument::new(temp_dir.path().join("problems").join("a.py"), "");
        let outcome = tracker.document_opened(&document, 5.0).await.unwrap();

        assert_eq!(outcome, OpenOutcome::Solved);
        assert!(tracker.store().find_problem("a.py").await.is_none());
    }

    #[tokio::test]
    async fn test_save_without_marker_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());
        let path = temp_dir.path().join("problems").join("a.py");

        tracker
            .document_opened(&TextDocument::new(&path, ""), 1000.0)
            .await
            .unwrap();
        let outcome = tracker
            .document_saved(&TextDocument::new(&path, "// done\nprint(1)"), 1090.0)
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::Ignored);
        assert!(tracker.store().find_problem("a.py").await.is_some());
        assert!(tracker.store().find_solution("a.py").await.is_none());
        assert!(tracker.notifier().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_untracked_with_marker() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());
        let path = temp_dir.path().join("problems").join("a.py");

        let outcome = tracker
            .document_saved(&TextDocument::new(&path, "x = 1\n// done"), 10.0)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Untracked {
                title: "a.py".to_string()
            }
        );
        assert!(tracker.store().find_solution("a.py").await.is_none());
        assert!(tracker.notifier().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_solves_and_notifies() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());
        let path = temp_dir.path().join("problems").join("1.two-sum.rs");

        tracker
            .document_opened(&TextDocument::new(&path, ""), 1000.0)
            .await
            .unwrap();
        let outcome = tracker
            .document_saved(&TextDocument::new(&path, "fn main() {}\n// done\n"), 1185.0)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Solved {
                title: "1.two-sum.rs".to_string(),
                elapsed_secs: 185.0,
                elapsed: "3 minutes, 5 seconds".to_string(),
            }
        );
        assert_eq!(
            *tracker.notifier().sent.lock().unwrap(),
            vec!["题号：1.two-sum\n用时:3 minutes, 5 seconds".to_string()]
        );
    }

    #[tokio::test]
    async fn test_save_after_solve_reports_already_solved() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, RecordingNotifier::default());
        let path = temp_dir.path().join("problems").join("a.py");
        let done = TextDocument::new(&path, "// done");

        tracker
            .document_opened(&TextDocument::new(&path, ""), 0.0)
            .await
            .unwrap();
        tracker.document_saved(&done, 30.0).await.unwrap();
        let outcome = tracker.document_saved(&done, 60.0).await.unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::AlreadySolved {
                title: "a.py".to_string()
            }
        );
        assert_eq!(tracker.store().find_solution("a.py").await.unwrap().completeness, 1);
        assert_eq!(tracker.notifier().sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_save() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, FailingNotifier);
        let path = temp_dir.path().join("problems").join("a.py");

        tracker
            .document_opened(&TextDocument::new(&path, ""), 0.0)
            .await
            .unwrap();
        let outcome = tracker
            .document_saved(&TextDocument::new(&path, "// done"), 5.0)
            .await
            .unwrap();

        assert!(matches!(outcome, SaveOutcome::Solved { .. }));
        assert!(tracker.store().find_solution("a.py").await.is_some());
    }
}
