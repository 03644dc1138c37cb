//! Folder watching
//!
//! Stands in for editor callbacks: a file created under the problem folder
//! counts as opened, a file whose contents are written counts as saved.
//! Events are forwarded from the `notify` callback thread over a channel and
//! handled one at a time.

use crate::notifier::Notifier;
use crate::tracker::{OpenOutcome, TextDocument, Tracker};
use crate::{Result, TimerError};
use glob::Pattern;
use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Events arriving this soon after the first one of a batch are folded into it.
const SETTLE: Duration = Duration::from_millis(300);

/// An editor-level event derived from file system activity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EditorEvent {
    Opened(PathBuf),
    Saved(PathBuf),
}

impl EditorEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Opened(path) | Self::Saved(path) => path,
        }
    }
}

/// Map a raw `notify` event to editor events, one per affected path.
pub fn classify(event: &Event) -> Vec<EditorEvent> {
    let make: fn(PathBuf) -> EditorEvent = match event.kind {
        EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) => {
            EditorEvent::Opened
        }
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To))
        | EventKind::Access(AccessKind::Close(AccessMode::Write)) => EditorEvent::Saved,
        _ => return Vec::new(),
    };
    event.paths.iter().cloned().map(make).collect()
}

/// File name globs the watcher skips
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<Pattern>,
}

impl IgnoreList {
    pub fn new(globs: &[String]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|g| {
                Pattern::new(g)
                    .map_err(|e| TimerError::Config(format!("invalid ignore pattern {g:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        self.patterns.iter().any(|p| p.matches(name))
    }
}

/// Append `event` unless the batch already holds it.
fn push_unique(batch: &mut Vec<EditorEvent>, event: EditorEvent) {
    if !batch.contains(&event) {
        batch.push(event);
    }
}

/// Watches the problem folder and yields editor events
pub struct FolderWatcher {
    // Dropping the watcher stops event delivery.
    _watcher: RecommendedWatcher,
    rx: async_channel::Receiver<EditorEvent>,
}

impl FolderWatcher {
    pub fn start(dir: &Path, ignore: IgnoreList) -> Result<Self> {
        let (tx, rx) = async_channel::unbounded::<EditorEvent>();

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for editor_event in classify(&event) {
                    if ignore.is_ignored(editor_event.path()) || editor_event.path().is_dir() {
                        continue;
                    }
                    if tx.send_blocking(editor_event).is_err() {
                        warn!("Event receiver dropped");
                    }
                }
            }
            Err(e) => error!("Watch error: {}", e),
        };

        let mut watcher = notify::recommended_watcher(handler)
            .map_err(|e| TimerError::Watch(format!("Failed to create file watcher: {e}")))?;
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| TimerError::Watch(format!("Failed to watch {}: {e}", dir.display())))?;

        info!("Watching {}", dir.display());
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next burst of events and return it without duplicates,
    /// in arrival order. `None` once the watcher has shut down.
    ///
    /// A single save usually produces several writes; waiting for the burst
    /// to settle means the file is read once, after the last write.
    pub async fn next_batch(&self) -> Option<Vec<EditorEvent>> {
        let first = self.rx.recv().await.ok()?;
        let mut batch = vec![first];
        let deadline = tokio::time::Instant::now() + SETTLE;
        while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, self.rx.recv()).await {
            push_unique(&mut batch, event);
        }
        Some(batch)
    }
}

/// Feed one event to the tracker. Returns the line to show the user, if any.
pub async fn handle_event<N: Notifier>(
    tracker: &Tracker<N>,
    event: &EditorEvent,
    now: f64,
) -> Result<Option<String>> {
    match event {
        EditorEvent::Opened(path) => {
            // Editors create and remove scratch files while saving.
            if !path.is_file() {
                debug!("Skipping vanished file {}", path.display());
                return Ok(None);
            }
            let outcome = tracker
                .document_opened(&TextDocument::new(path, String::new()), now)
                .await?;
            Ok(match outcome {
                OpenOutcome::Started { title, .. } => Some(format!("Timer started for {title}")),
                _ => None,
            })
        }
        EditorEvent::Saved(path) => {
            let text = match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(e) => {
                    debug!("Skipping save of {}: {}", path.display(), e);
                    return Ok(None);
                }
            };
            let outcome = tracker
                .document_saved(&TextDocument::new(path, text), now)
                .await?;
            Ok(outcome.message(tracker.marker()))
        }
    }
}
