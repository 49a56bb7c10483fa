//! Live change monitoring
//!
//! The [`ChangeMonitor`] consumes [`WatchSignal`]s one at a time, in delivery
//! order, and turns each qualifying [`ChangeEvent`] into a single remote
//! operation:
//!
//! - **Created**: wait for readiness, upload unconditionally
//! - **Modified**: upload only if the modification time is newer than the
//!   one last uploaded for that path, then record it in the ledger
//! - **Deleted**: delete every remote entry with the file's name
//!
//! A rescan signal, raised when the OS dropped events, triggers a full
//! reconciliation pass of the watched directory.
//!
//! A failure on one event is logged and the loop moves on to the next.

use std::path::Path;
use std::sync::Arc;

use drivemirror_core::domain::{FileName, RemoteFolder, Timestamp};
use drivemirror_core::ports::IRemoteStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ledger::DebounceLedger;
use crate::local::regular_file_mtime;
use crate::readiness::{Readiness, ReadinessPolicy};
use crate::reconciler::Reconciler;
use crate::watcher::{ChangeEvent, WatchSignal};
use crate::SyncError;

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for the next event
    Idle,
    /// Handling one event
    Processing,
}

/// Result of handling a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Uploaded,
    Deleted { count: usize },
    /// Modify event whose timestamp was already uploaded
    Suppressed,
    /// Not a regular file, or gone before it could be read
    Skipped,
}

/// Why [`ChangeMonitor::run`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// The shutdown token was cancelled
    Shutdown,
    /// The watch facility failed or its channel closed
    WatchFailed(String),
}

/// Event-driven mirror of one directory into one remote folder
pub struct ChangeMonitor {
    store: Arc<dyn IRemoteStore>,
    folder: RemoteFolder,
    readiness: ReadinessPolicy,
    ledger: DebounceLedger,
    forget_on_delete: bool,
    state: MonitorState,
}

impl ChangeMonitor {
    /// Creates a monitor with an empty ledger
    pub fn new(store: Arc<dyn IRemoteStore>, folder: RemoteFolder, readiness: ReadinessPolicy) -> Self {
        Self {
            store,
            folder,
            readiness,
            ledger: DebounceLedger::new(),
            forget_on_delete: true,
            state: MonitorState::Idle,
        }
    }

    /// Whether a delete event clears the ledger entry for its path
    pub fn with_forget_on_delete(mut self, forget: bool) -> Self {
        self.forget_on_delete = forget;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn ledger(&self) -> &DebounceLedger {
        &self.ledger
    }

    /// Consumes signals until shutdown or an unrecoverable watch failure
    ///
    /// Cancellation is only observed between events; an operation already
    /// in flight always completes.
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<WatchSignal>,
        shutdown: CancellationToken,
    ) -> MonitorExit {
        info!(folder = %self.folder.name, "Change monitor started");

        loop {
            let signal = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Change monitor stopping on shutdown");
                    return MonitorExit::Shutdown;
                }
                signal = events.recv() => signal,
            };

            match signal {
                None => {
                    error!("Watch channel closed");
                    return MonitorExit::WatchFailed("watch channel closed".to_string());
                }
                Some(WatchSignal::Failed(reason)) => {
                    error!(reason = %reason, "Watch facility failed");
                    return MonitorExit::WatchFailed(reason);
                }
                Some(WatchSignal::Rescan(dir)) => {
                    self.state = MonitorState::Processing;
                    self.rescan(&dir).await;
                    self.state = MonitorState::Idle;
                }
                Some(WatchSignal::Event(event)) => {
                    self.state = MonitorState::Processing;
                    let path = event.path().to_path_buf();
                    match self.handle_event(event).await {
                        Ok(EventOutcome::Uploaded) => {
                            info!(path = %path.display(), "Uploaded");
                        }
                        Ok(EventOutcome::Deleted { count }) => {
                            info!(path = %path.display(), count, "Deleted remotely");
                        }
                        Ok(EventOutcome::Suppressed) => {
                            debug!(path = %path.display(), "Already uploaded, suppressed");
                        }
                        Ok(EventOutcome::Skipped) => {
                            debug!(path = %path.display(), "Skipped");
                        }
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "Failed to process event");
                        }
                    }
                    self.state = MonitorState::Idle;
                }
            }
        }
    }

    /// Runs a full reconciliation pass after the watcher lost events
    async fn rescan(&self, dir: &Path) {
        warn!(path = %dir.display(), "Rescanning after missed events");
        let reconciler = Reconciler::new(Arc::clone(&self.store), self.readiness);
        match reconciler.reconcile(dir, &self.folder).await {
            Ok(report) if report.has_errors() => {
                warn!(errors = report.errors.len(), "Rescan finished with errors");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Rescan failed"),
        }
    }

    /// Handles a single event
    ///
    /// # Errors
    /// Returns an error when the file name cannot be represented remotely,
    /// the file cannot be stat'ed, or the remote call fails
    pub async fn handle_event(&mut self, event: ChangeEvent) -> Result<EventOutcome, SyncError> {
        match event {
            ChangeEvent::Created(path) => self.on_created(&path).await,
            ChangeEvent::Modified(path) => self.on_modified(&path).await,
            ChangeEvent::Deleted(path) => self.on_deleted(&path).await,
        }
    }

    async fn on_created(&mut self, path: &Path) -> Result<EventOutcome, SyncError> {
        let name = FileName::from_path(path)?;

        if self.readiness.wait(path).await == Readiness::Missing {
            return Ok(EventOutcome::Skipped);
        }
        let Some(modified_at) = regular_file_mtime(path).await? else {
            return Ok(EventOutcome::Skipped);
        };

        self.upload(&name, path, modified_at).await?;
        Ok(EventOutcome::Uploaded)
    }

    async fn on_modified(&mut self, path: &Path) -> Result<EventOutcome, SyncError> {
        let name = FileName::from_path(path)?;

        let Some(modified_at) = regular_file_mtime(path).await? else {
            return Ok(EventOutcome::Skipped);
        };

        if !self.ledger.should_upload(path, modified_at) {
            debug!(
                path = %path.display(),
                modified_at = %modified_at,
                "Modification time unchanged since last upload"
            );
            return Ok(EventOutcome::Suppressed);
        }

        if self.readiness.wait(path).await == Readiness::Missing {
            return Ok(EventOutcome::Skipped);
        }

        self.upload(&name, path, modified_at).await?;
        self.ledger.record(path, modified_at);
        Ok(EventOutcome::Uploaded)
    }

    async fn on_deleted(&mut self, path: &Path) -> Result<EventOutcome, SyncError> {
        let name = FileName::from_path(path)?;

        if self.forget_on_delete {
            self.ledger.forget(path);
        }

        let count = self
            .store
            .delete_by_name(&self.folder.id, name.as_str())
            .await
            .map_err(SyncError::Remote)?;
        Ok(EventOutcome::Deleted { count })
    }

    async fn upload(&self, name: &FileName, path: &Path, modified_at: Timestamp) -> Result<(), SyncError> {
        self.store
            .upload(&self.folder.id, name, path, modified_at)
            .await
            .map_err(SyncError::Remote)?;
        Ok(())
    }
}
