use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mosaic_chunk::{decode_chunk, ChunkCache};
use mosaic_fetch::{retry_delay, CdnPool, HttpClient};
use mosaic_manifest::{Chunk, ManifestFile};

use crate::check;
use crate::error::{AssembleError, Result};
use crate::job::{ChunkJob, ChunkJobResult, ChunkOutcome};

/// Tuning for the per-file worker pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Concurrent download/decompress workers.
    pub worker_count: usize,
    /// Attempts per chunk job before it fails terminally.
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff.
    pub retry_backoff: Duration,
    /// Local directory of predownloaded chunk objects, consulted before
    /// the network.
    pub chunk_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            worker_count: 10,
            max_attempts: 5,
            retry_backoff: Duration::from_millis(500),
            chunk_dir: None,
        }
    }
}

/// How a file reached its on-disk state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembled {
    /// Already present with a matching hash; nothing was downloaded.
    AlreadyPresent,
    /// Rebuilt from chunk parts.
    Written,
}

/// Per-file assembly pipeline. Files are assembled one at a time; the
/// chunk cache and interrupt flag are shared across files.
pub struct Pipeline<C> {
    client: Arc<C>,
    pool: Arc<CdnPool>,
    cache: Arc<ChunkCache>,
    interrupt: Arc<AtomicBool>,
    options: PipelineOptions,
}

struct WorkerContext<C> {
    client: Arc<C>,
    pool: Arc<CdnPool>,
    cache: Arc<ChunkCache>,
    interrupt: Arc<AtomicBool>,
    chunk_dir: Option<PathBuf>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<C> Clone for WorkerContext<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            pool: Arc::clone(&self.pool),
            cache: Arc::clone(&self.cache),
            interrupt: Arc::clone(&self.interrupt),
            chunk_dir: self.chunk_dir.clone(),
            max_attempts: self.max_attempts,
            retry_backoff: self.retry_backoff,
        }
    }
}

impl<C: HttpClient + 'static> Pipeline<C> {
    pub fn new(
        client: Arc<C>,
        pool: Arc<CdnPool>,
        cache: Arc<ChunkCache>,
        interrupt: Arc<AtomicBool>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            client,
            pool,
            cache,
            interrupt,
            options,
        }
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Assemble one manifest file at `dest`.
    ///
    /// If a file with a matching hash already exists the download is
    /// skipped entirely; its chunk references are still released so the
    /// cache does not hold payloads for consumers that will never come.
    pub async fn assemble_file(
        &self,
        file: &ManifestFile,
        chunks: &HashMap<String, Chunk>,
        dest: &Path,
    ) -> Result<Assembled> {
        let mut jobs = Vec::with_capacity(file.parts.len());
        for (id, part) in file.parts.iter().enumerate() {
            let chunk = chunks
                .get(&part.guid)
                .ok_or_else(|| AssembleError::UnknownChunk(part.guid.clone()))?
                .clone();
            jobs.push(ChunkJob {
                id,
                chunk,
                part: part.part,
                attempts: 0,
            });
        }
        let part_count = jobs.len();

        if self.precheck(file, dest).await? {
            for part in &file.parts {
                self.cache.release(&part.guid);
            }
            return Ok(Assembled::AlreadyPresent);
        }

        info!(path = %dest.display(), parts = part_count, "downloading file");

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(dest).await?;

        if part_count == 0 {
            out.flush().await?;
            return Ok(Assembled::Written);
        }

        // Requeues reuse the job channel, so its capacity must cover
        // every outstanding job or a requeue could block a worker.
        let (job_tx, job_rx) = mpsc::channel::<ChunkJob>(part_count);
        let (result_tx, result_rx) = mpsc::channel::<ChunkJobResult>(part_count);
        let (ordered_tx, mut ordered_rx) = mpsc::channel::<ChunkJobResult>(part_count);

        for job in jobs {
            job_tx
                .send(job)
                .await
                .map_err(|_| AssembleError::ChannelClosed)?;
        }

        let reorder = spawn_reorder(result_rx, ordered_tx);

        let context = WorkerContext {
            client: Arc::clone(&self.client),
            pool: Arc::clone(&self.pool),
            cache: Arc::clone(&self.cache),
            interrupt: Arc::clone(&self.interrupt),
            chunk_dir: self.options.chunk_dir.clone(),
            max_attempts: self.options.max_attempts.max(1),
            retry_backoff: self.options.retry_backoff,
        };
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(self.options.worker_count);
        for _ in 0..self.options.worker_count.max(1) {
            workers.push(tokio::spawn(run_worker(
                context.clone(),
                Arc::clone(&job_rx),
                job_tx.clone(),
                result_tx.clone(),
            )));
        }
        drop(job_tx);
        drop(result_tx);

        let mut failure: Option<AssembleError> = None;
        for _ in 0..part_count {
            let Some(result) = ordered_rx.recv().await else {
                for worker in &workers {
                    worker.abort();
                }
                return Err(if self.interrupt.load(Ordering::Relaxed) {
                    AssembleError::Interrupted
                } else {
                    AssembleError::ChannelClosed
                });
            };

            match result.outcome {
                ChunkOutcome::Failed { error } => {
                    if failure.is_none() {
                        failure = Some(AssembleError::ChunkFailed {
                            guid: result.job.chunk.guid.clone(),
                            attempts: result.job.attempts,
                            last_error: error,
                        });
                    }
                }
                ChunkOutcome::Payload(payload) => {
                    // Keep draining after a failure so every job still
                    // reaches a terminal state and refcounts balance.
                    if failure.is_some() {
                        continue;
                    }
                    let offset = u64::from(result.job.part.offset);
                    let end = offset + u64::from(result.job.part.size);
                    if end > payload.len() as u64 {
                        failure = Some(AssembleError::PartOutOfRange {
                            offset,
                            end,
                            len: payload.len() as u64,
                        });
                        continue;
                    }
                    if let Err(e) = out.write_all(&payload[offset as usize..end as usize]).await {
                        failure = Some(AssembleError::Io(e));
                    }
                }
            }
        }

        for worker in &workers {
            worker.abort();
        }
        let _ = reorder.await;

        out.flush().await?;

        match failure {
            Some(error) => Err(error),
            None => Ok(Assembled::Written),
        }
    }

    async fn precheck(&self, file: &ManifestFile, dest: &Path) -> Result<bool> {
        let file = file.clone();
        let dest = dest.to_path_buf();
        let matched = tokio::task::spawn_blocking(move || check::check_file(&dest, &file))
            .await
            .map_err(|e| AssembleError::Io(std::io::Error::other(e)))??;
        Ok(matched)
    }
}

/// Buffer out-of-order results and forward them in ascending part order.
fn spawn_reorder(
    mut results: mpsc::Receiver<ChunkJobResult>,
    ordered: mpsc::Sender<ChunkJobResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buffer: BTreeMap<usize, ChunkJobResult> = BTreeMap::new();
        let mut next = 0usize;
        while let Some(result) = results.recv().await {
            buffer.insert(result.job.id, result);
            while let Some(ready) = buffer.remove(&next) {
                if ordered.send(ready).await.is_err() {
                    return;
                }
                next += 1;
            }
        }
    })
}

async fn run_worker<C: HttpClient>(
    context: WorkerContext<C>,
    jobs: Arc<tokio::sync::Mutex<mpsc::Receiver<ChunkJob>>>,
    requeue: mpsc::Sender<ChunkJob>,
    results: mpsc::Sender<ChunkJobResult>,
) {
    loop {
        if context.interrupt.load(Ordering::Relaxed) {
            return;
        }
        let job = { jobs.lock().await.recv().await };
        let Some(mut job) = job else { return };

        // Cache hit: the payload is already decompressed and
        // header-stripped, so no header parse happens here.
        if let Some(payload) = context.cache.get(&job.chunk.guid) {
            context.cache.release(&job.chunk.guid);
            let _ = results
                .send(ChunkJobResult {
                    job,
                    outcome: ChunkOutcome::Payload(payload),
                })
                .await;
            continue;
        }

        match fetch_and_decode(&context, &job.chunk).await {
            Ok(payload) => {
                context.cache.store(&job.chunk.guid, payload.clone());
                context.cache.release(&job.chunk.guid);
                let _ = results
                    .send(ChunkJobResult {
                        job,
                        outcome: ChunkOutcome::Payload(payload),
                    })
                    .await;
            }
            Err(error) => {
                job.attempts += 1;
                if job.attempts >= context.max_attempts {
                    warn!(
                        guid = %job.chunk.guid,
                        attempts = job.attempts,
                        %error,
                        "chunk failed permanently"
                    );
                    context.cache.release(&job.chunk.guid);
                    let _ = results
                        .send(ChunkJobResult {
                            job,
                            outcome: ChunkOutcome::Failed { error },
                        })
                        .await;
                } else {
                    debug!(
                        guid = %job.chunk.guid,
                        attempts = job.attempts,
                        %error,
                        "chunk failed, requeueing"
                    );
                    tokio::time::sleep(retry_delay(job.attempts - 1, context.retry_backoff)).await;
                    let _ = requeue.send(job).await;
                }
            }
        }
    }
}

/// Resolve a chunk to its decompressed payload: local chunk directory
/// first, then the CDN.
async fn fetch_and_decode<C: HttpClient>(
    context: &WorkerContext<C>,
    chunk: &Chunk,
) -> std::result::Result<Bytes, String> {
    let raw = match read_local(context, chunk).await {
        Some(raw) => raw,
        None => mosaic_fetch::download_chunk(context.client.as_ref(), &context.pool, chunk)
            .await
            .map_err(|e| e.to_string())?,
    };
    let (_header, payload) = decode_chunk(&raw).map_err(|e| e.to_string())?;
    Ok(payload)
}

async fn read_local<C>(context: &WorkerContext<C>, chunk: &Chunk) -> Option<Bytes> {
    let dir = context.chunk_dir.as_ref()?;
    tokio::fs::read(dir.join(&chunk.guid)).await.ok().map(Bytes::from)
}
