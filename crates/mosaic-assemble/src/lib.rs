//! Per-file assembly pipeline.
//!
//! For each output file, chunk jobs fan out to a pool of
//! download/decompress workers over a bounded channel, a reorder task
//! restores part order from out-of-order completions, and the consumer
//! writes each part's byte range to the output file in sequence. A
//! two-phase integrity check (pre-existing file short-circuit, then a
//! post-assembly SHA-1 pass) brackets the pipeline.

pub use self::check::{check_file, expected_file_hash, verify_files};
pub use self::error::{AssembleError, Result};
pub use self::job::{ChunkJob, ChunkJobResult, ChunkOutcome};
pub use self::mirror::{mirror_chunks, MirrorReport};
pub use self::pipeline::{Assembled, Pipeline, PipelineOptions};

mod check;
mod error;
mod job;
mod mirror;
mod pipeline;
