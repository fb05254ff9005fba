//! Chunks-only mode: mirror every unique chunk object verbatim into a
//! local directory, skipping objects already present at their expected
//! size. No cache is involved; the raw download bytes are written as-is.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mosaic_fetch::{download_chunk, retry_delay, CdnPool, HttpClient};
use mosaic_manifest::Chunk;

use crate::error::Result;
use crate::pipeline::PipelineOptions;

/// Outcome counters for a chunks-only run.
#[derive(Debug, Default, Clone, Copy)]
pub struct MirrorReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

struct MirrorJob {
    chunk: Chunk,
    attempts: u32,
}

enum MirrorOutcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Download every chunk in `chunks` to `{dir}/{GUID}`.
pub async fn mirror_chunks<C: HttpClient + 'static>(
    client: Arc<C>,
    pool: Arc<CdnPool>,
    chunks: Vec<Chunk>,
    dir: &Path,
    interrupt: Arc<AtomicBool>,
    options: &PipelineOptions,
) -> Result<MirrorReport> {
    let total = chunks.len();
    if total == 0 {
        return Ok(MirrorReport::default());
    }
    tokio::fs::create_dir_all(dir).await?;

    let (job_tx, job_rx) = mpsc::channel::<MirrorJob>(total);
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<MirrorOutcome>(total);
    for chunk in chunks {
        job_tx
            .send(MirrorJob { chunk, attempts: 0 })
            .await
            .map_err(|_| crate::error::AssembleError::ChannelClosed)?;
    }

    let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(options.worker_count);
    for _ in 0..options.worker_count.max(1) {
        workers.push(tokio::spawn(mirror_worker(
            Arc::clone(&client),
            Arc::clone(&pool),
            dir.to_path_buf(),
            Arc::clone(&interrupt),
            options.max_attempts.max(1),
            options.retry_backoff,
            Arc::clone(&job_rx),
            job_tx.clone(),
            outcome_tx.clone(),
        )));
    }
    drop(job_tx);
    drop(outcome_tx);

    let mut report = MirrorReport::default();
    for _ in 0..total {
        let Some(outcome) = outcome_rx.recv().await else {
            // workers bailed on the interrupt flag; report what finished
            break;
        };
        match outcome {
            MirrorOutcome::Downloaded => report.downloaded += 1,
            MirrorOutcome::Skipped => report.skipped += 1,
            MirrorOutcome::Failed => report.failed += 1,
        }
    }

    for worker in &workers {
        worker.abort();
    }
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn mirror_worker<C: HttpClient>(
    client: Arc<C>,
    pool: Arc<CdnPool>,
    dir: std::path::PathBuf,
    interrupt: Arc<AtomicBool>,
    max_attempts: u32,
    retry_backoff: std::time::Duration,
    jobs: Arc<tokio::sync::Mutex<mpsc::Receiver<MirrorJob>>>,
    requeue: mpsc::Sender<MirrorJob>,
    outcomes: mpsc::Sender<MirrorOutcome>,
) {
    loop {
        if interrupt.load(Ordering::Relaxed) {
            return;
        }
        let job = { jobs.lock().await.recv().await };
        let Some(mut job) = job else { return };

        let path = dir.join(&job.chunk.guid);

        // An existing object of the expected compressed size counts as
        // already mirrored.
        if let Ok(meta) = tokio::fs::metadata(&path).await {
            if meta.len() == job.chunk.file_size {
                let _ = outcomes.send(MirrorOutcome::Skipped).await;
                continue;
            }
        }

        let error = match download_chunk(client.as_ref(), &pool, &job.chunk).await {
            Ok(raw) => match tokio::fs::write(&path, &raw).await {
                Ok(()) => {
                    let _ = outcomes.send(MirrorOutcome::Downloaded).await;
                    continue;
                }
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        job.attempts += 1;
        if job.attempts >= max_attempts {
            warn!(guid = %job.chunk.guid, attempts = job.attempts, %error, "chunk mirror failed permanently");
            let _ = outcomes.send(MirrorOutcome::Failed).await;
        } else {
            debug!(guid = %job.chunk.guid, attempts = job.attempts, %error, "chunk mirror failed, requeueing");
            tokio::time::sleep(retry_delay(job.attempts - 1, retry_backoff)).await;
            let _ = requeue.send(job).await;
        }
    }
}
