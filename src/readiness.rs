//! Waiting for remote file processing to finish.
//!
//! Uploaded videos are processed asynchronously by the remote service; a file
//! may only be referenced in a critique once it leaves the `PROCESSING` state.

use crate::config::ReadinessSettings;
use crate::error::{CriticError, Result};
use crate::gemini::{FileState, RemoteFile, RemoteFiles};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How long and how often to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Pause between status checks.
    pub interval: Duration,
    /// Maximum number of status checks after the initial upload response.
    pub max_attempts: u32,
    /// Upper bound on total waiting time, if any.
    pub deadline: Option<Duration>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from(&ReadinessSettings::default())
    }
}

impl From<&ReadinessSettings> for ReadinessPolicy {
    fn from(settings: &ReadinessSettings) -> Self {
        Self {
            interval: settings.poll_interval(),
            max_attempts: settings.max_attempts,
            deadline: settings.deadline(),
        }
    }
}

/// Poll `file` until it is no longer processing.
///
/// Returns the first non-processing status. A `FAILED` file, an exhausted
/// policy or a cancelled token end the wait with an error.
#[instrument(skip(files, file, policy, cancel), fields(file = %file.name))]
pub async fn wait_until_ready(
    files: &dyn RemoteFiles,
    mut file: RemoteFile,
    policy: &ReadinessPolicy,
    cancel: &CancellationToken,
) -> Result<RemoteFile> {
    let started = Instant::now();
    let mut attempts = 0u32;

    while file.state.is_processing() {
        if attempts >= policy.max_attempts {
            warn!("Gave up after {} status checks", attempts);
            return Err(CriticError::ReadinessTimeout { attempts });
        }

        let mut pause = policy.interval;
        if let Some(deadline) = policy.deadline {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!("Deadline of {:?} passed after {} status checks", deadline, attempts);
                return Err(CriticError::ReadinessTimeout { attempts });
            }
            pause = pause.min(remaining);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Readiness wait cancelled");
                return Err(CriticError::Cancelled);
            }
            _ = tokio::time::sleep(pause) => {}
        }

        file = files.get_file(&file.name).await?;
        attempts += 1;
        debug!("Status check {}: {}", attempts, file.state);
    }

    match file.state {
        FileState::Failed => {
            let reason = file
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("{} could not be processed", file.name));
            Err(CriticError::RemoteProcessingFailed(reason))
        }
        _ => {
            info!("File ready after {} status checks", attempts);
            Ok(file)
        }
    }
}
