//! Google Drive v3 API client
//!
//! Provides a typed HTTP client for the handful of Drive endpoints the mirror
//! needs. Handles authentication headers, endpoint construction, `q` query
//! escaping, pagination, and `multipart/related` uploads.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivemirror_gdrive::client::{folder_query, DriveClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("access-token-here")?;
//! let folders = client.list_files(&folder_query("Sync")).await?;
//! println!("{} folder(s) named Sync", folders.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::DriveError;

/// Default base URL of the Google APIs front end
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// MIME type Drive assigns to folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Largest page size the files.list endpoint accepts
const PAGE_SIZE: &str = "1000";

/// Fields requested for every file resource
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,parents,trashed";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Drive API response types
// ============================================================================

/// A Drive file resource, restricted to the fields the mirror requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

/// One page of a files.list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// JSON metadata part of a multipart upload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata<'a> {
    name: &'a str,
    modified_time: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parents: Option<[&'a str; 1]>,
}

// ============================================================================
// Query building
// ============================================================================

/// Escapes a value for interpolation inside a single-quoted `q` literal
pub fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Matches non-trashed folders with the given display name
pub fn folder_query(name: &str) -> String {
    format!(
        "mimeType='{FOLDER_MIME_TYPE}' and name='{}' and trashed=false",
        escape_query_value(name)
    )
}

/// Matches non-trashed files (not sub-folders) directly inside a folder
pub fn children_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and mimeType!='{FOLDER_MIME_TYPE}' and trashed=false",
        escape_query_value(folder_id)
    )
}

/// Like [`children_query`], restricted to one name
pub fn named_child_query(folder_id: &str, name: &str) -> String {
    format!(
        "{} and name='{}'",
        children_query(folder_id),
        escape_query_value(name)
    )
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive v3 calls
///
/// Wraps `reqwest::Client` with bearer authentication and endpoint
/// construction. No call is retried.
pub struct DriveClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl DriveClient {
    /// Creates a client for the public Drive endpoint
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(access_token: impl Into<String>) -> Result<Self, DriveError> {
        Self::with_options(access_token, DRIVE_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, DriveError> {
        Self::with_options(access_token, base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL and per-request timeout
    ///
    /// # Errors
    /// Returns an error if `base_url` is unusable or the HTTP client
    /// cannot be built
    pub fn with_options(
        access_token: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, DriveError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DriveError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(DriveError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
        })
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/{segments...}`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Creates an authenticated request builder for the given URL
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Lists every file matching `query`, following `nextPageToken`
    ///
    /// # Arguments
    /// * `query` - A Drive `q` expression; see [`folder_query`] and friends
    pub async fn list_files(&self, query: &str) -> Result<Vec<DriveFile>, DriveError> {
        let url = self.endpoint(&["drive", "v3", "files"]);
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.request(Method::GET, url.clone()).query(&[
                ("q", query),
                ("fields", fields.as_str()),
                ("pageSize", PAGE_SIZE),
                ("spaces", "drive"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = parse_json(check_status(request.send().await?).await?).await?;
            debug!(query, count = page.files.len(), "Listed page");
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Fetches a single file or folder resource
    pub async fn get_file(&self, id: &str) -> Result<DriveFile, DriveError> {
        let url = self.endpoint(&["drive", "v3", "files", id]);
        let response = self
            .request(Method::GET, url)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    /// Creates a new file inside `folder_id`
    ///
    /// # Arguments
    /// * `folder_id` - Parent folder
    /// * `name` - File name
    /// * `modified_time` - RFC 3339 modification time to record
    /// * `content` - File bytes
    pub async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        modified_time: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, DriveError> {
        let url = self.endpoint(&["upload", "drive", "v3", "files"]);
        let metadata = UploadMetadata {
            name,
            modified_time,
            parents: Some([folder_id]),
        };
        debug!(name, folder_id, bytes = content.len(), "Creating file");
        self.send_multipart(Method::POST, url, &metadata, content)
            .await
    }

    /// Replaces the content and modification time of an existing file
    ///
    /// The parent is left untouched.
    pub async fn update_file(
        &self,
        id: &str,
        name: &str,
        modified_time: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, DriveError> {
        let url = self.endpoint(&["upload", "drive", "v3", "files", id]);
        let metadata = UploadMetadata {
            name,
            modified_time,
            parents: None,
        };
        debug!(name, id, bytes = content.len(), "Updating file");
        self.send_multipart(Method::PATCH, url, &metadata, content)
            .await
    }

    /// Permanently deletes a file
    pub async fn delete_file(&self, id: &str) -> Result<(), DriveError> {
        let url = self.endpoint(&["drive", "v3", "files", id]);
        let response = self.request(Method::DELETE, url).send().await?;
        check_status(response).await?;
        debug!(id, "Deleted file");
        Ok(())
    }

    async fn send_multipart(
        &self,
        method: Method,
        url: Url,
        metadata: &UploadMetadata<'_>,
        content: Vec<u8>,
    ) -> Result<DriveFile, DriveError> {
        let metadata = serde_json::to_vec(metadata)
            .map_err(|e| DriveError::InvalidResponse(format!("cannot encode metadata: {e}")))?;
        let boundary = multipart_boundary();
        let body = multipart_related_body(&boundary, &metadata, &content);

        let response = self
            .request(method, url)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }
}

// ============================================================================
// Response and body helpers
// ============================================================================

/// Passes 2xx responses through and maps everything else to [`DriveError`]
async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %body, "Drive API error response");

    Err(DriveError::from_status(status, body, retry_after.as_deref()))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, DriveError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| DriveError::InvalidResponse(e.to_string()))
}

fn multipart_boundary() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("drivemirror_{nanos:x}")
}

/// Assembles a `multipart/related` body: JSON metadata, then raw media
fn multipart_related_body(boundary: &str, metadata: &[u8], content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 4 * boundary.len() + 128);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
