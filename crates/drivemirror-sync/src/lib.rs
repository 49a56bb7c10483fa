//! DriveMirror Sync - One-way mirroring engine
//!
//! Provides:
//! - Full-directory reconciliation against a remote folder
//! - Live change monitoring driven by filesystem events
//! - Per-file debouncing of redundant modify events
//!
//! ## Modules
//!
//! - [`local`] - Flat snapshot of the mirrored directory
//! - [`readiness`] - Bounded wait until a freshly written file can be opened
//! - [`ledger`] - Debounce ledger of last uploaded modification times
//! - [`reconciler`] - Diff-based startup synchronization
//! - [`watcher`] - `notify` wrapper producing [`watcher::ChangeEvent`]s
//! - [`monitor`] - Event-driven state machine issuing remote operations

pub mod ledger;
pub mod local;
pub mod monitor;
pub mod readiness;
pub mod reconciler;
pub mod watcher;

use std::path::{Path, PathBuf};

use drivemirror_core::domain::{FolderId, RemoteFolder};
use drivemirror_core::ports::IRemoteStore;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured local directory does not exist
    #[error("Local directory not found: {0}")]
    LocalDirMissing(PathBuf),

    /// The configured local path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// No remote folder carries the requested display name
    #[error("Remote folder not found: {0}")]
    FolderNotFound(String),

    /// The resolved remote folder failed its reachability check
    #[error("Remote folder unreachable: {0}")]
    FolderUnreachable(FolderId),

    /// The filesystem watch facility failed
    #[error("Watch error: {0}")]
    Watch(String),

    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain-level error propagated from drivemirror-core
    #[error("Domain error: {0}")]
    Domain(#[from] drivemirror_core::domain::DomainError),

    /// A remote store call failed
    #[error("Remote error: {0:#}")]
    Remote(#[source] anyhow::Error),
}

// ============================================================================
// Startup checks
// ============================================================================

/// Verifies that `path` exists and is a directory
///
/// # Errors
/// Returns [`SyncError::LocalDirMissing`] or [`SyncError::NotADirectory`]
pub async fn validate_local_dir(path: &Path) -> Result<(), SyncError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SyncError::NotADirectory(path.to_path_buf())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(SyncError::LocalDirMissing(path.to_path_buf()))
        }
        Err(err) => Err(SyncError::Io(err)),
    }
}

/// Resolves the remote folder by display name, once, at startup
///
/// The first match returned by the store is used.
///
/// # Errors
/// Returns [`SyncError::FolderNotFound`] when no folder has that name and
/// [`SyncError::Remote`] when the lookup itself fails
pub async fn resolve_target(store: &dyn IRemoteStore, name: &str) -> Result<RemoteFolder, SyncError> {
    let folder = store
        .resolve_folder(name)
        .await
        .map_err(SyncError::Remote)?
        .ok_or_else(|| SyncError::FolderNotFound(name.to_string()))?;

    if folder.name != name {
        warn!(requested = %name, resolved = %folder.name, "Resolved folder name differs from request");
    }
    info!(name = %folder.name, folder_id = %folder.id, "Resolved remote folder");
    Ok(folder)
}
