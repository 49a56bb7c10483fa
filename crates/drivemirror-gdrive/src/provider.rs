//! DriveRemoteStore - IRemoteStore implementation for Google Drive
//!
//! Wraps the [`DriveClient`] to fulfil the [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - Names are not unique in Drive. `upload` re-lists by name right before
//!   writing and updates the first match, which narrows but does not close
//!   the window in which two writers can both create.
//! - Remote names are reported as the store holds them. A name that is not
//!   a valid local file name (e.g. containing `/`) has no local counterpart,
//!   so reconciliation deletes it like any other orphan.
//! - Nothing here retries; failures surface to the sync core as errors.

use std::path::Path;

use anyhow::{Context, Result};
use drivemirror_core::domain::{
    DomainError, FileName, FolderId, RemoteFileEntry, RemoteFolder, RemoteId, Timestamp,
};
use drivemirror_core::ports::IRemoteStore;
use tracing::{debug, warn};

use crate::client::{children_query, folder_query, named_child_query, DriveClient, DriveFile};
use crate::DriveError;

/// Converts a Drive file resource into a [`RemoteFileEntry`]
fn to_entry(file: DriveFile, folder_id: &FolderId) -> Result<RemoteFileEntry, DomainError> {
    Ok(RemoteFileEntry {
        remote_id: RemoteId::new(file.id)?,
        name: file.name,
        modified_at: file.modified_time.map(Timestamp::from),
        parent_folder_id: folder_id.clone(),
    })
}

/// Remote store implementation that delegates to the Google Drive API
pub struct DriveRemoteStore {
    client: DriveClient,
}

impl DriveRemoteStore {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    async fn files_named(&self, folder_id: &FolderId, name: &str) -> Result<Vec<DriveFile>> {
        self.client
            .list_files(&named_child_query(folder_id.as_str(), name))
            .await
            .with_context(|| format!("Failed to look up '{name}'"))
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveRemoteStore {
    #[tracing::instrument(skip_all, fields(name = %name))]
    async fn resolve_folder(&self, name: &str) -> Result<Option<RemoteFolder>> {
        let folders = self
            .client
            .list_files(&folder_query(name))
            .await
            .with_context(|| format!("Failed to look up folder '{name}'"))?;

        if folders.len() > 1 {
            warn!(
                name,
                matches = folders.len(),
                "Several folders share this name, using the first"
            );
        }

        let Some(first) = folders.into_iter().next() else {
            return Ok(None);
        };
        let id = FolderId::new(first.id)?;
        debug!(folder_id = %id, "Folder resolved");
        Ok(Some(RemoteFolder::new(first.name, id)))
    }

    #[tracing::instrument(skip_all, fields(folder_id = %folder_id))]
    async fn check_folder_reachable(&self, folder_id: &FolderId) -> bool {
        match self.client.get_file(folder_id.as_str()).await {
            Ok(file) => {
                let reachable = !file.id.is_empty() && !file.trashed;
                if !reachable {
                    warn!("Folder is trashed or malformed");
                }
                reachable
            }
            Err(err) => {
                warn!(error = %err, "Folder reachability check failed");
                false
            }
        }
    }

    #[tracing::instrument(skip_all, fields(folder_id = %folder_id))]
    async fn list_entries(&self, folder_id: &FolderId) -> Result<Vec<RemoteFileEntry>> {
        let files = self
            .client
            .list_files(&children_query(folder_id.as_str()))
            .await
            .context("Failed to list remote folder")?;

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let raw_id = file.id.clone();
            match to_entry(file, folder_id) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(id = %raw_id, error = %err, "Skipping remote entry"),
            }
        }
        debug!(count = entries.len(), "Listed remote folder");
        Ok(entries)
    }

    #[tracing::instrument(
        skip_all,
        fields(folder_id = %folder_id, name = %name, modified_at = %modified_at)
    )]
    async fn upload(
        &self,
        folder_id: &FolderId,
        name: &FileName,
        local_path: &Path,
        modified_at: Timestamp,
    ) -> Result<RemoteFileEntry> {
        let content = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        let modified_time = modified_at.to_rfc3339()?;

        let existing = self.files_named(folder_id, name.as_str()).await?;
        let file = match existing.first() {
            Some(current) => {
                if existing.len() > 1 {
                    debug!(duplicates = existing.len(), "Updating first of several entries");
                }
                self.client
                    .update_file(&current.id, name.as_str(), &modified_time, content)
                    .await
                    .with_context(|| format!("Failed to update '{name}'"))?
            }
            None => self
                .client
                .create_file(folder_id.as_str(), name.as_str(), &modified_time, content)
                .await
                .with_context(|| format!("Failed to create '{name}'"))?,
        };

        let mut entry = to_entry(file, folder_id)?;
        entry.modified_at.get_or_insert(modified_at);
        Ok(entry)
    }

    #[tracing::instrument(skip_all, fields(folder_id = %folder_id, name = %name))]
    async fn delete_by_name(&self, folder_id: &FolderId, name: &str) -> Result<usize> {
        let matches = self.files_named(folder_id, name).await?;

        let mut deleted = 0;
        for file in &matches {
            match self.client.delete_file(&file.id).await {
                Ok(()) => deleted += 1,
                Err(DriveError::NotFound(_)) => {
                    debug!(id = %file.id, "Already gone");
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to delete '{name}' ({})", file.id));
                }
            }
        }
        Ok(deleted)
    }
}
