//! Single download job execution
//!
//! This module performs one `DownloadJob` to completion:
//! - Honoring the overwrite policy (skip, overwrite, resume)
//! - Enforcing the size ceiling before and during the transfer
//! - Streaming into a `.part` file and renaming on success
//! - Retrying transient failures with a fixed delay

use crate::config::OverwritePolicy;
use crate::crawler::fetcher::{ChunkStream, Fetcher};
use crate::state::{DownloadJob, DownloadOutcome, SkipReason};
use crate::storage::ensure_parent_dir;
use crate::MirrorError;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Retry behavior shared by all workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }
}

/// Runs one download job, retrying transient failures
///
/// # Arguments
///
/// * `fetcher` - The fetch capability
/// * `job` - What to download and where
/// * `policy` - Retry count and delay
///
/// # Returns
///
/// The final outcome; failures are reported as `DownloadOutcome::Failed`
/// rather than as an error.
pub async fn perform_download(
    fetcher: &dyn Fetcher,
    job: &DownloadJob,
    policy: &RetryPolicy,
) -> DownloadOutcome {
    if job.overwrite_policy == OverwritePolicy::Skip && is_file(&job.local_path).await {
        return DownloadOutcome::Skipped(SkipReason::AlreadyExists);
    }

    let max_attempts = policy.retries + 1;
    let mut attempt = 1;

    loop {
        match attempt_download(fetcher, job).await {
            Ok(outcome) => return outcome,
            Err(error) => {
                if attempt >= max_attempts || !is_retryable(&error) {
                    return DownloadOutcome::Failed {
                        attempts: attempt,
                        error,
                    };
                }

                tracing::warn!(
                    "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    job.remote_url,
                    error,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

fn is_retryable(error: &MirrorError) -> bool {
    match error {
        MirrorError::Fetch(e) => e.is_transient(),
        _ => false,
    }
}

/// One network attempt
async fn attempt_download(
    fetcher: &dyn Fetcher,
    job: &DownloadJob,
) -> Result<DownloadOutcome, MirrorError> {
    let existing = match job.overwrite_policy {
        OverwritePolicy::Resume => existing_len(&job.local_path).await,
        _ => None,
    };

    let stream = fetcher.get_stream(&job.remote_url, existing).await?;

    if stream.is_range_exhausted() {
        tracing::debug!("{} is already complete", job.local_path.display());
        return Ok(DownloadOutcome::Downloaded {
            bytes: 0,
            resumed: true,
        });
    }

    // A 200 reply to a range request means the server sent everything again
    let offset = match existing {
        Some(len) if stream.is_partial() => len,
        _ => 0,
    };

    if let (Some(limit), Some(len)) = (job.size_limit, stream.content_length) {
        if offset + len > limit {
            return Ok(DownloadOutcome::Skipped(SkipReason::TooLarge));
        }
    }

    ensure_parent_dir(&job.local_path).await?;

    if offset > 0 {
        append_download(job, stream.body, offset).await
    } else {
        fresh_download(job, stream.body).await
    }
}

async fn fresh_download(job: &DownloadJob, body: ChunkStream) -> Result<DownloadOutcome, MirrorError> {
    let part_path = part_path(&job.local_path);
    let mut file = File::create(&part_path)
        .await
        .map_err(|e| MirrorError::filesystem(&part_path, e))?;

    let written = match copy_stream(body, &mut file, &part_path, 0, job.size_limit).await {
        Ok(written) => written,
        Err(e) => {
            drop(file);
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }
    };
    drop(file);

    let Some(bytes) = written else {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Ok(DownloadOutcome::Skipped(SkipReason::TooLarge));
    };

    tokio::fs::rename(&part_path, &job.local_path)
        .await
        .map_err(|e| MirrorError::filesystem(&job.local_path, e))?;

    Ok(DownloadOutcome::Downloaded {
        bytes,
        resumed: false,
    })
}

async fn append_download(
    job: &DownloadJob,
    body: ChunkStream,
    offset: u64,
) -> Result<DownloadOutcome, MirrorError> {
    let path = &job.local_path;
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(|e| MirrorError::filesystem(path, e))?;

    // Bytes appended before a failure stay on disk for the next resume
    let written = copy_stream(body, &mut file, path, offset, job.size_limit).await?;

    let Some(bytes) = written else {
        file.set_len(offset)
            .await
            .map_err(|e| MirrorError::filesystem(path, e))?;
        return Ok(DownloadOutcome::Skipped(SkipReason::TooLarge));
    };

    Ok(DownloadOutcome::Downloaded {
        bytes,
        resumed: true,
    })
}

/// Copies body chunks into `file`
///
/// Returns `Ok(None)` as soon as `offset` plus the bytes written would pass
/// `limit`.
async fn copy_stream(
    mut body: ChunkStream,
    file: &mut File,
    path: &Path,
    offset: u64,
    limit: Option<u64>,
) -> Result<Option<u64>, MirrorError> {
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;

        if limit.is_some_and(|limit| offset + written > limit) {
            return Ok(None);
        }

        file.write_all(&chunk)
            .await
            .map_err(|e| MirrorError::filesystem(path, e))?;
    }

    file.flush()
        .await
        .map_err(|e| MirrorError::filesystem(path, e))?;

    Ok(Some(written))
}

/// Temporary file a fresh download is streamed into
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn existing_len(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file() && m.len() > 0)
        .map(|m| m.len())
}
