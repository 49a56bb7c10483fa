//! Filesystem watching
//!
//! Provides a [`FileWatcher`] that wraps the `notify` crate to monitor the
//! mirrored directory, converting raw OS events into [`ChangeEvent`] values.
//!
//! ## Architecture
//!
//! ```text
//! inotify / FSEvents
//!       │
//!       ▼
//!  FileWatcher  ──→  mpsc::channel<WatchSignal>  ──→  ChangeMonitor
//! ```
//!
//! The channel is bounded; while it is full the notify thread blocks, so
//! events raised during the startup reconciliation are held rather than lost.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// ============================================================================
// ChangeEvent / WatchSignal
// ============================================================================

/// A change to a file directly inside the watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A file appeared (created, or renamed into place)
    Created(PathBuf),
    /// An existing file's content or metadata changed
    Modified(PathBuf),
    /// A file disappeared (deleted, or renamed away)
    Deleted(PathBuf),
}

impl ChangeEvent {
    /// Returns the path associated with this event
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Deleted(p) => p,
        }
    }
}

/// What the watcher delivers to the change monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Event(ChangeEvent),
    /// The OS event queue overflowed and changes in the directory were lost
    Rescan(PathBuf),
    /// The watch facility cannot continue
    Failed(String),
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Watches one directory, non-recursively, using the OS-native mechanism
///
/// Dropping the watcher stops the watch and eventually closes the channel.
///
/// ## Usage
///
/// ```ignore
/// let (watcher, rx) = FileWatcher::new(Path::new("/home/user/Outbox"), 1024)?;
/// // rx.recv().await to get signals
/// drop(watcher); // stops watching
/// ```
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl FileWatcher {
    /// Starts watching `dir`
    ///
    /// # Arguments
    /// * `dir` - The directory to watch; only its direct children are reported
    /// * `capacity` - Number of signals buffered before the notify thread blocks
    ///
    /// # Returns
    /// A tuple of `(FileWatcher, mpsc::Receiver<WatchSignal>)`
    ///
    /// # Errors
    /// Returns an error if the OS watcher cannot be created or the directory
    /// cannot be watched (missing, permissions, inotify watch limit)
    pub fn new(dir: &Path, capacity: usize) -> Result<(Self, mpsc::Receiver<WatchSignal>)> {
        let (tx, rx) = mpsc::channel::<WatchSignal>(capacity.max(1));

        // Backends may report the resolved path rather than the one given
        let roots = WatchRoots::new(dir);

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                let signals = match res {
                    Ok(event) => map_notify_event(&event, &roots),
                    Err(err) => {
                        error!(error = %err, "File watcher error");
                        vec![WatchSignal::Failed(err.to_string())]
                    }
                };
                for signal in signals {
                    if let Err(e) = tx.blocking_send(signal) {
                        warn!(error = %e, "Failed to send change event (receiver dropped)");
                    }
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch path: {}", dir.display()))?;

        info!(path = %dir.display(), capacity, "Watching directory");

        Ok((
            Self {
                watcher,
                dir: dir.to_path_buf(),
            },
            rx,
        ))
    }

    /// The directory being watched
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stops watching
    ///
    /// # Errors
    /// Returns an error if the directory was no longer being watched
    pub fn stop(mut self) -> Result<()> {
        info!(path = %self.dir.display(), "Stopping watch");
        self.watcher
            .unwatch(&self.dir)
            .with_context(|| format!("Failed to unwatch path: {}", self.dir.display()))
    }
}

// ============================================================================
// Event mapping - notify::Event → WatchSignal
// ============================================================================

/// The watched directory as given and as resolved by the OS
#[derive(Debug, Clone)]
struct WatchRoots {
    given: PathBuf,
    resolved: Option<PathBuf>,
}

impl WatchRoots {
    fn new(dir: &Path) -> Self {
        let resolved = std::fs::canonicalize(dir).ok().filter(|p| p != dir);
        Self {
            given: dir.to_path_buf(),
            resolved,
        }
    }

    fn is_root(&self, path: &Path) -> bool {
        path == self.given || self.resolved.as_deref() == Some(path)
    }

    fn is_direct_child(&self, path: &Path) -> bool {
        path.parent().is_some_and(|parent| self.is_root(parent))
    }
}

/// Converts a `notify::Event` into zero or more [`WatchSignal`]s
///
/// - `Create(*)` → `Created`
/// - `Modify(Name(From))` → `Deleted`, `Modify(Name(To))` → `Created`
/// - `Modify(Name(Both))` with 2 paths → `Deleted(old)` + `Created(new)`
/// - `Modify(Name(Any|Other))` → `Created` if the path exists, else `Deleted`
/// - Other `Modify(*)` → `Modified`
/// - `Remove(*)` → `Deleted`, or `Failed` when the root itself is removed
/// - `Access(*)`, `Any`, `Other` → ignored
/// - Any event flagged for rescan → a single `Rescan` of the watched directory
///
/// Paths that are not direct children of the watched directory are dropped.
fn map_notify_event(event: &notify::Event, roots: &WatchRoots) -> Vec<WatchSignal> {
    if event.need_rescan() {
        warn!(path = %roots.given.display(), "Event queue overflowed, changes may have been missed");
        return vec![WatchSignal::Rescan(roots.given.clone())];
    }

    let paths = &event.paths;

    let events: Vec<ChangeEvent> = match &event.kind {
        EventKind::Create(_) => paths.iter().cloned().map(ChangeEvent::Created).collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.iter().cloned().map(ChangeEvent::Deleted).collect()
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.iter().cloned().map(ChangeEvent::Created).collect()
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match paths.as_slice() {
            [old, new, ..] => {
                debug!(old = %old.display(), new = %new.display(), "Mapped Rename event");
                vec![
                    ChangeEvent::Deleted(old.clone()),
                    ChangeEvent::Created(new.clone()),
                ]
            }
            [only] => vec![ChangeEvent::Modified(only.clone())],
            [] => Vec::new(),
        },

        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|p| {
                if p.exists() {
                    ChangeEvent::Created(p.clone())
                } else {
                    ChangeEvent::Deleted(p.clone())
                }
            })
            .collect(),

        EventKind::Modify(_) => paths.iter().cloned().map(ChangeEvent::Modified).collect(),

        EventKind::Remove(_) => {
            if let Some(root) = paths.iter().find(|p| roots.is_root(p)) {
                error!(path = %root.display(), "Watched directory was removed");
                return vec![WatchSignal::Failed(format!(
                    "watched directory removed: {}",
                    root.display()
                ))];
            }
            paths.iter().cloned().map(ChangeEvent::Deleted).collect()
        }

        EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            return Vec::new();
        }
    };

    events
        .into_iter()
        .filter(|ev| {
            let keep = roots.is_direct_child(ev.path());
            if !keep {
                debug!(path = %ev.path().display(), "Ignoring event outside watched directory");
            }
            keep
        })
        .map(|ev| {
            debug!(event = ?ev, "Mapped filesystem event");
            WatchSignal::Event(ev)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
