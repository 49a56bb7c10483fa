//! Remote store port (driven/secondary port)
//!
//! This module defines the interface the reconciler and change monitor use
//! to mirror files into a single remote folder. It is the only
//! network-facing boundary of the sync core.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - Every operation is scoped to a folder; the store is never asked to
//!   recurse into sub-folders.

use std::path::Path;

use crate::domain::entries::{RemoteFileEntry, RemoteFolder};
use crate::domain::newtypes::{FileName, FolderId, Timestamp};

/// Port trait for folder-scoped remote object storage
///
/// ## Implementation Notes
///
/// - `upload` is an upsert keyed by name. Implementations look up existing
///   entries with that name right before writing: the first match is updated
///   in place (its remote ID and parent are preserved), otherwise a new entry
///   is created in the folder. Callers never choose between create and update.
/// - Names are not unique remotely. `delete_by_name` removes every match.
/// - Implementations must not retry failed calls on their own; the sync core
///   logs per-file failures and moves on.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Looks up a folder by display name
    ///
    /// When several folders share the name, the first one returned by the
    /// store is authoritative.
    ///
    /// # Returns
    /// `Ok(None)` if no folder with that name exists
    async fn resolve_folder(&self, name: &str) -> anyhow::Result<Option<RemoteFolder>>;

    /// Cheap existence check for the target folder
    ///
    /// Transport failures are reported as `false`, not as errors.
    async fn check_folder_reachable(&self, folder_id: &FolderId) -> bool;

    /// Lists the files directly inside the folder, excluding trashed items
    async fn list_entries(&self, folder_id: &FolderId) -> anyhow::Result<Vec<RemoteFileEntry>>;

    /// Upserts `local_path` into the folder under `name`
    ///
    /// # Arguments
    /// * `folder_id` - Target folder
    /// * `name` - Remote entry name (the local file's bare name)
    /// * `local_path` - File whose content is uploaded
    /// * `modified_at` - Modification time recorded on the remote entry
    ///
    /// # Returns
    /// The created or updated entry
    async fn upload(
        &self,
        folder_id: &FolderId,
        name: &FileName,
        local_path: &Path,
        modified_at: Timestamp,
    ) -> anyhow::Result<RemoteFileEntry>;

    /// Deletes every entry named `name` in the folder
    ///
    /// `name` is a raw remote name, so entries whose names could never exist
    /// locally can still be removed.
    ///
    /// # Returns
    /// Number of entries deleted; zero matches is not an error
    async fn delete_by_name(&self, folder_id: &FolderId, name: &str) -> anyhow::Result<usize>;
}
