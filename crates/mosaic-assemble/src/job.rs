use bytes::Bytes;
use mosaic_manifest::{Chunk, ChunkPart};

/// One part of one output file, dispatched to the worker pool.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    /// Sequential part index within the file; the reorder stage restores
    /// ascending `id` order before bytes reach the writer.
    pub id: usize,
    pub chunk: Chunk,
    pub part: ChunkPart,
    /// Failed fetch/decode attempts so far.
    pub attempts: u32,
}

/// Terminal outcome of a job. Every dispatched job produces exactly one,
/// and the worker releases the chunk's cache reference alongside it.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Decompressed, header-stripped chunk payload.
    Payload(Bytes),
    /// Retry ceiling reached.
    Failed { error: String },
}

#[derive(Debug)]
pub struct ChunkJobResult {
    pub job: ChunkJob,
    pub outcome: ChunkOutcome,
}
