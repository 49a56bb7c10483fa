//! Local directory snapshot
//!
//! Enumerates the regular files directly inside the mirrored directory.
//! Sub-directories are not descended into and symbolic links are not
//! followed; a link is never a regular file here.

use std::path::Path;

use drivemirror_core::domain::{FileName, LocalFileEntry, Timestamp};
use tracing::{debug, warn};

use crate::SyncError;

/// Takes a flat snapshot of `dir`, sorted by name
///
/// Entries whose name cannot be represented remotely (non-UTF-8)
/// are skipped with a warning.
///
/// # Errors
/// Returns [`SyncError::Io`] if the directory itself cannot be read
pub async fn scan_local_dir(dir: &Path) -> Result<Vec<LocalFileEntry>, SyncError> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();

        // file_type() does not traverse symlinks
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Cannot stat entry, skipping");
                continue;
            }
        };
        if !file_type.is_file() {
            debug!(path = %path.display(), "Not a regular file, skipping");
            continue;
        }

        let name = match FileName::from_path(&path) {
            Ok(name) => name,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Unsupported file name, skipping");
                continue;
            }
        };

        let modified_at = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(time) => Timestamp::from_system_time(time),
            Err(err) => {
                // Vanished between read_dir and stat
                warn!(path = %path.display(), error = %err, "Cannot read modification time, skipping");
                continue;
            }
        };

        entries.push(LocalFileEntry {
            name,
            path,
            modified_at,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(dir = %dir.display(), count = entries.len(), "Scanned local directory");
    Ok(entries)
}

/// Reads the current modification time of a single file
///
/// # Returns
/// `Ok(None)` when the path is missing or is not a regular file
///
/// # Errors
/// Returns [`SyncError::Io`] for any other metadata failure
pub async fn regular_file_mtime(path: &Path) -> Result<Option<Timestamp>, SyncError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(Timestamp::from_system_time(meta.modified()?))),
        Ok(_) => Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SyncError::Io(err)),
    }
}
