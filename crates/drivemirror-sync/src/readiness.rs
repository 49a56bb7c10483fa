//! Readiness wait before reading a freshly written file
//!
//! A file that has just been created or modified may still be held open by
//! its writer. Before uploading, the file is opened for reading; failures are
//! retried after a fixed delay up to a bounded number of attempts. This is a
//! heuristic: a successful open does not prove the writer has finished.

use std::path::Path;
use std::time::Duration;

use drivemirror_core::config::ReadinessConfig;
use tracing::{debug, warn};

/// Outcome of a readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The file opened for reading
    Ready,
    /// The file no longer exists; the caller should skip it
    Missing,
    /// Every attempt failed; the caller proceeds anyway
    GaveUp {
        /// Number of open attempts made
        attempts: u32,
    },
}

/// Bounded fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

impl ReadinessPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }

    /// Waits until `path` can be opened for reading
    ///
    /// A zero `max_attempts` is treated as one attempt.
    pub async fn wait(&self, path: &Path) -> Readiness {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match tokio::fs::File::open(path).await {
                Ok(_) => {
                    if attempt > 1 {
                        debug!(path = %path.display(), attempt, "File became readable");
                    }
                    return Readiness::Ready;
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "File vanished before it could be read");
                    return Readiness::Missing;
                }
                Err(err) => {
                    debug!(path = %path.display(), attempt, error = %err, "File not readable yet");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            path = %path.display(),
            attempts = max_attempts,
            "File still not readable, proceeding anyway"
        );
        Readiness::GaveUp {
            attempts: max_attempts,
        }
    }
}
