//! Download scheduler backed by a fixed pool of workers
//!
//! This module handles:
//! - A FIFO queue of download jobs shared by N worker tasks
//! - Per-job completion tickets the coordinator can await
//! - Graceful shutdown that drains queued work before the workers exit
//!
//! Workers never touch crawl state; every result travels back through the
//! job's ticket.

use crate::crawler::download::{perform_download, RetryPolicy};
use crate::crawler::fetcher::Fetcher;
use crate::state::{DownloadJob, DownloadOutcome, SkipReason};
use crate::MirrorError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use url::Url;

/// A job paired with the channel its outcome is reported on
struct QueuedDownload {
    job: DownloadJob,
    reply: oneshot::Sender<DownloadOutcome>,
}

/// Handle for one submitted download
#[derive(Debug)]
pub struct DownloadTicket {
    url: Url,
    receiver: oneshot::Receiver<DownloadOutcome>,
}

impl DownloadTicket {
    /// The remote URL this ticket tracks
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Waits for the worker to finish the job
    ///
    /// A worker that disappears without answering is reported as a failure.
    pub async fn outcome(self) -> DownloadOutcome {
        self.receiver
            .await
            .unwrap_or(DownloadOutcome::Failed {
                attempts: 0,
                error: MirrorError::QueueClosed,
            })
    }
}

/// DownloadScheduler owns the job queue and the worker tasks
///
/// Each job is taken by exactly one worker. Jobs are started in submission
/// order, although with more than one worker they may finish in any order.
pub struct DownloadScheduler {
    sender: Option<mpsc::UnboundedSender<QueuedDownload>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
}

impl DownloadScheduler {
    /// Starts `worker_count` workers sharing one queue
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetch capability shared by all workers
    /// * `policy` - Retry behavior for failed attempts
    /// * `worker_count` - Number of workers (at least one is started)
    pub fn start(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy, worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let pending = Arc::new(AtomicUsize::new(0));

        let workers = (0..worker_count.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&receiver),
                    Arc::clone(&fetcher),
                    policy,
                    Arc::clone(&pending),
                ))
            })
            .collect::<Vec<_>>();

        tracing::debug!("Started {} download workers", workers.len());

        Self {
            sender: Some(sender),
            workers,
            pending,
        }
    }

    /// Enqueues a job and returns its ticket
    ///
    /// # Returns
    ///
    /// * `Ok(DownloadTicket)` - Job accepted
    /// * `Err(MirrorError::QueueClosed)` - The scheduler is shutting down
    pub fn submit(&self, job: DownloadJob) -> Result<DownloadTicket, MirrorError> {
        let sender = self.sender.as_ref().ok_or(MirrorError::QueueClosed)?;
        let (reply, receiver) = oneshot::channel();
        let url = job.remote_url.clone();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(QueuedDownload { job, reply }).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(MirrorError::QueueClosed);
        }

        Ok(DownloadTicket { url, receiver })
    }

    /// Number of jobs submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Number of worker tasks
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue and waits for every worker to exit
    ///
    /// Jobs already queued are still performed.
    pub async fn shutdown(mut self) {
        self.sender.take();

        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                tracing::error!("Download worker terminated abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<QueuedDownload>>>,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    pending: Arc<AtomicUsize>,
) {
    loop {
        // Hold the lock only while waiting, not while downloading
        let next = receiver.lock().await.recv().await;
        let Some(QueuedDownload { job, reply }) = next else {
            break;
        };

        let outcome = perform_download(fetcher.as_ref(), &job, &policy).await;
        log_outcome(id, &job, &outcome);

        pending.fetch_sub(1, Ordering::SeqCst);
        // The submitter may have stopped waiting
        let _ = reply.send(outcome);
    }

    tracing::debug!("Download worker {} stopped", id);
}

fn log_outcome(worker: usize, job: &DownloadJob, outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Downloaded { bytes, resumed } => tracing::info!(
            "[worker {}] {} {} ({} bytes) -> {}",
            worker,
            if *resumed { "Resumed" } else { "Downloaded" },
            job.remote_url,
            bytes,
            job.local_path.display()
        ),
        DownloadOutcome::Skipped(SkipReason::AlreadyExists) => tracing::info!(
            "[worker {}] Skipping {}: {} exists",
            worker,
            job.remote_url,
            job.local_path.display()
        ),
        DownloadOutcome::Skipped(reason) => {
            tracing::warn!("[worker {}] Skipping {}: {}", worker, job.remote_url, reason)
        }
        DownloadOutcome::Failed { attempts, error } => tracing::error!(
            "[worker {}] Failed to download {} after {} attempt(s): {}",
            worker,
            job.remote_url,
            attempts,
            error
        ),
    }
}
