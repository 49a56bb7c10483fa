//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Timestamp
// ============================================================================

/// Modification timestamp with millisecond resolution
///
/// Stored as signed milliseconds since the Unix epoch. Local modification
/// times are truncated to whole milliseconds when captured, so a value that
/// was written to the remote store and read back compares equal to the local
/// value it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a Timestamp from milliseconds since the Unix epoch
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Capture a filesystem time, truncating sub-millisecond precision
    ///
    /// Times before the epoch are floored so ordering is preserved.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self(i64::try_from(after.as_millis()).unwrap_or(i64::MAX)),
            Err(err) => {
                let before = err.duration();
                let whole = i64::try_from(before.as_millis()).unwrap_or(i64::MAX);
                if before.subsec_nanos() % 1_000_000 == 0 {
                    Self(-whole)
                } else {
                    Self(-whole.saturating_add(1))
                }
            }
        }
    }

    /// Convert from a chrono UTC datetime, truncating to milliseconds
    #[must_use]
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// Convert to a chrono UTC datetime
    ///
    /// # Errors
    /// Returns error if the value is outside chrono's representable range
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, DomainError> {
        DateTime::from_timestamp_millis(self.0)
            .ok_or_else(|| DomainError::InvalidTimestamp(format!("{} ms is out of range", self.0)))
    }

    /// RFC 3339 representation with millisecond precision (`...T10:00:00.123Z`)
    ///
    /// # Errors
    /// Returns error if the value is outside chrono's representable range
    pub fn to_rfc3339(&self) -> Result<String, DomainError> {
        Ok(self
            .to_datetime()?
            .to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{}ms", self.0),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(&dt)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

// ============================================================================
// FileName
// ============================================================================

/// Bare file name used as the identity of a file on both sides
///
/// Names are compared case-sensitively and never carry a directory
/// component. Rejected: empty names, `.`, `..`, and anything containing
/// `/` or NUL. A backslash is an ordinary character.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    /// Create a new FileName
    ///
    /// # Errors
    /// Returns error if the name is empty, a dot entry, or contains a separator
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if name.is_empty() {
            return Err(DomainError::InvalidFileName(
                "File name cannot be empty".to_string(),
            ));
        }

        if name == "." || name == ".." {
            return Err(DomainError::InvalidFileName(format!(
                "File name cannot be a dot entry: {name}"
            )));
        }

        if name.contains(['/', '\0']) {
            return Err(DomainError::InvalidFileName(format!(
                "File name contains a path separator or NUL: {name}"
            )));
        }

        Ok(Self(name))
    }

    /// Extract the file name from the last component of a path
    ///
    /// # Errors
    /// Returns error if the path has no final component or it is not valid UTF-8
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let component = path.file_name().ok_or_else(|| {
            DomainError::InvalidFileName(format!("Path has no file name: {}", path.display()))
        })?;

        let name = component.to_str().ok_or_else(|| {
            DomainError::InvalidFileName(format!(
                "File name is not valid UTF-8: {}",
                component.to_string_lossy()
            ))
        })?;

        Self::new(name)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for FileName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FileName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

/// Returns true if `id` is usable as an opaque remote identifier
fn is_valid_opaque_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Opaque identifier of a remote file entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace/control characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if !is_valid_opaque_id(&id) {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID must be non-empty without whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// Stable identifier of the remote folder being mirrored into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId(String);

impl FolderId {
    /// Create a new FolderId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace/control characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if !is_valid_opaque_id(&id) {
            return Err(DomainError::InvalidFolderId(format!(
                "Folder ID must be non-empty without whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FolderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FolderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FolderId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.0
    }
}

// ============================================================================
// Tests
// ============================================================================
