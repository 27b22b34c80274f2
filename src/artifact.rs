//! Bounded wait for a file produced by an external step.
//!
//! The post-processor writes its output asynchronously from the driver's
//! point of view. [`wait_for_artifact`] polls for the file with doubling
//! intervals and gives up with [`BridgeError::ArtifactTimeout`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{BridgeError, Result};
use crate::transport::deadline_after;

/// Default first poll interval.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(10);

/// Default ceiling for the poll interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(500);

/// Default overall wait.
pub const DEFAULT_ARTIFACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Polling schedule for [`wait_for_artifact`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay after the first failed check.
    pub initial_interval: Duration,
    /// Upper bound for the doubled delay.
    pub max_interval: Duration,
    /// Overall wait before giving up.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            timeout: DEFAULT_ARTIFACT_TIMEOUT,
        }
    }
}

impl PollConfig {
    /// Interval that follows `current`.
    fn back_off(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

/// Wait until `path` exists, returning how long it took.
///
/// Errors from the filesystem check itself (e.g. permission denied) are
/// returned as [`BridgeError::Io`] rather than retried.
pub async fn wait_for_artifact(path: &Path, config: &PollConfig) -> Result<Duration> {
    let start = Instant::now();
    let deadline = deadline_after(config.timeout);
    let mut interval = config.initial_interval.max(Duration::from_millis(1));
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if tokio::fs::try_exists(path).await? {
            let waited = start.elapsed();
            tracing::debug!(path = %path.display(), attempts, ?waited, "Artifact ready");
            return Ok(waited);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(path = %path.display(), attempts, "Artifact did not appear");
            return Err(BridgeError::ArtifactTimeout {
                path: path.to_path_buf(),
                after: config.timeout,
            });
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = config.back_off(interval);
    }
}
