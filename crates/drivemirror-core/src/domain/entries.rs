//! File entries on both sides of a mirror
//!
//! [`LocalFileEntry`] values are enumerated fresh from the local directory on
//! every reconciliation pass; [`RemoteFileEntry`] values are fetched fresh from
//! the remote store on every query. Neither is persisted or cached.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::newtypes::{FileName, FolderId, RemoteId, Timestamp};

/// A regular file found directly inside the mirrored directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileEntry {
    /// Bare name, unique within the directory
    pub name: FileName,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Last modification time, truncated to milliseconds
    pub modified_at: Timestamp,
}

/// A file stored in the remote folder
///
/// The remote store does not enforce name uniqueness, so several entries
/// may share one `name`. The name is kept as the store reports it: it may
/// not be a valid [`FileName`], in which case no local file can match it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    pub name: String,
    pub remote_id: RemoteId,
    /// `None` when the store did not report a modification time
    pub modified_at: Option<Timestamp>,
    pub parent_folder_id: FolderId,
}

/// The remote folder resolved once at startup and held for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    /// Human-readable display name used for the lookup
    pub name: String,
    pub id: FolderId,
}

impl RemoteFolder {
    pub fn new(name: impl Into<String>, id: FolderId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}
