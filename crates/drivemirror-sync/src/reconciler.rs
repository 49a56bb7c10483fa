//! Full-directory reconciliation
//!
//! The [`Reconciler`] compares a fresh snapshot of the local directory with a
//! fresh listing of the remote folder and issues the minimal set of remote
//! operations that makes the remote side match the local one.
//!
//! ## Algorithm
//!
//! 1. **Preconditions**: local directory exists, remote folder is reachable
//! 2. **Snapshot**: flat local scan and remote listing
//! 3. **Plan**: upload local files missing remotely or strictly newer than
//!    the remote copy, delete remote names absent locally
//! 4. **Execute**: uploads in name order, then deletes in name order; each
//!    failure is logged and recorded without aborting the pass
//!
//! A second pass with no intervening change plans nothing.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use drivemirror_core::domain::{LocalFileEntry, RemoteFileEntry, RemoteFolder, Timestamp};
use drivemirror_core::ports::IRemoteStore;
use tracing::{debug, info, warn};

use crate::local::scan_local_dir;
use crate::readiness::{Readiness, ReadinessPolicy};
use crate::{validate_local_dir, SyncError};

// ============================================================================
// ReconcileReport
// ============================================================================

/// Summary of a completed reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of files uploaded (created or updated remotely)
    pub uploaded: u32,
    /// Number of remote entries deleted, duplicates counted individually
    pub deleted: u32,
    /// Number of planned uploads skipped because the file vanished
    pub skipped: u32,
    /// Per-file failures (non-fatal)
    pub errors: Vec<String>,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Why a local file is uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReason {
    /// No remote entry carries the name
    Missing,
    /// The local copy is strictly newer than every remote copy
    Newer,
}

/// A single remote operation planned by [`plan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Upload {
        entry: LocalFileEntry,
        reason: UploadReason,
    },
    /// Delete every remote entry named `name`
    Delete { name: String },
}

/// Computes the remote operations needed to mirror `local` into `remote`
///
/// Remote duplicates of one name are compared through their newest known
/// modification time; an entry without one sorts below every timestamp, so
/// any local copy wins. Each orphaned name appears exactly once, including
/// remote names that cannot exist locally. Uploads come first in name order,
/// then deletes in name order.
pub fn plan(local: &[LocalFileEntry], remote: &[RemoteFileEntry]) -> Vec<SyncAction> {
    // Option<Timestamp> orders None below Some(_)
    let mut newest_remote: BTreeMap<&str, Option<Timestamp>> = BTreeMap::new();
    for entry in remote {
        newest_remote
            .entry(entry.name.as_str())
            .and_modify(|newest| *newest = (*newest).max(entry.modified_at))
            .or_insert(entry.modified_at);
    }

    let mut sorted_local: Vec<&LocalFileEntry> = local.iter().collect();
    sorted_local.sort_by(|a, b| a.name.cmp(&b.name));

    let mut actions = Vec::new();
    for entry in &sorted_local {
        let reason = match newest_remote.get(entry.name.as_str()) {
            None => Some(UploadReason::Missing),
            Some(remote_ts) if Some(entry.modified_at) > *remote_ts => Some(UploadReason::Newer),
            Some(_) => None,
        };
        if let Some(reason) = reason {
            actions.push(SyncAction::Upload {
                entry: (*entry).clone(),
                reason,
            });
        }
    }

    let local_names: HashSet<&str> = sorted_local.iter().map(|e| e.name.as_str()).collect();
    for name in newest_remote.keys() {
        if !local_names.contains(name) {
            actions.push(SyncAction::Delete {
                name: (*name).to_string(),
            });
        }
    }

    actions
}

// ============================================================================
// Reconciler
// ============================================================================

/// Runs reconciliation passes against a remote store
pub struct Reconciler {
    store: Arc<dyn IRemoteStore>,
    readiness: ReadinessPolicy,
}

impl Reconciler {
    pub fn new(store: Arc<dyn IRemoteStore>, readiness: ReadinessPolicy) -> Self {
        Self { store, readiness }
    }

    /// Mirrors `local_dir` into `folder` with a single diff-based pass
    ///
    /// # Arguments
    /// * `local_dir` - Directory treated as the source of truth
    /// * `folder` - Remote folder resolved at startup
    ///
    /// # Returns
    /// A [`ReconcileReport`]; per-file failures are listed in it rather
    /// than returned
    ///
    /// # Errors
    /// Fails without touching the remote side when the local directory is
    /// missing, the folder is unreachable, or either snapshot cannot be taken
    #[tracing::instrument(
        skip(self, local_dir, folder),
        fields(local_dir = %local_dir.display(), folder = %folder.name)
    )]
    pub async fn reconcile(
        &self,
        local_dir: &Path,
        folder: &RemoteFolder,
    ) -> Result<ReconcileReport, SyncError> {
        let start = Instant::now();
        let mut report = ReconcileReport::default();

        validate_local_dir(local_dir).await?;
        if !self.store.check_folder_reachable(&folder.id).await {
            return Err(SyncError::FolderUnreachable(folder.id.clone()));
        }

        let local = scan_local_dir(local_dir).await?;
        let remote = self
            .store
            .list_entries(&folder.id)
            .await
            .map_err(SyncError::Remote)?;

        let actions = plan(&local, &remote);
        info!(
            local = local.len(),
            remote = remote.len(),
            planned = actions.len(),
            "Starting reconciliation"
        );

        for action in actions {
            match action {
                SyncAction::Upload { entry, reason } => {
                    self.upload(folder, &entry, reason, &mut report).await;
                }
                SyncAction::Delete { name } => {
                    self.delete(folder, &name, &mut report).await;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            uploaded = report.uploaded,
            deleted = report.deleted,
            skipped = report.skipped,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Reconciliation completed"
        );

        Ok(report)
    }

    async fn upload(
        &self,
        folder: &RemoteFolder,
        entry: &LocalFileEntry,
        reason: UploadReason,
        report: &mut ReconcileReport,
    ) {
        if self.readiness.wait(&entry.path).await == Readiness::Missing {
            debug!(name = %entry.name, "File vanished before upload, skipping");
            report.skipped += 1;
            return;
        }

        match self
            .store
            .upload(&folder.id, &entry.name, &entry.path, entry.modified_at)
            .await
        {
            Ok(_) => {
                debug!(name = %entry.name, ?reason, modified_at = %entry.modified_at, "Uploaded");
                report.uploaded += 1;
            }
            Err(err) => {
                warn!(name = %entry.name, error = %err, "Upload failed");
                report
                    .errors
                    .push(format!("Upload failed for {}: {err:#}", entry.name));
            }
        }
    }

    async fn delete(&self, folder: &RemoteFolder, name: &str, report: &mut ReconcileReport) {
        match self.store.delete_by_name(&folder.id, name).await {
            Ok(count) => {
                debug!(name = %name, count, "Deleted orphaned remote entries");
                report.deleted += count as u32;
            }
            Err(err) => {
                warn!(name = %name, error = %err, "Remote delete failed");
                report
                    .errors
                    .push(format!("Delete failed for {name}: {err:#}"));
            }
        }
    }
}
