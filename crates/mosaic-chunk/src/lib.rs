//! Chunk wire codec and the reference-counted payload cache.
//!
//! On the wire a chunk is a 62-byte header (magic `0xB1FE3AA2`) followed
//! by the payload, stored raw or zlib-compressed. [`decode_chunk`] strips
//! the header and decompresses, so every downstream consumer and every
//! cached copy sees one representation: the decompressed payload.

pub use self::cache::ChunkCache;
pub use self::codec::decode_chunk;
pub use self::error::{ChunkError, Result};
pub use self::header::{ChunkHeader, CHUNK_HEADER_SIZE, CHUNK_MAGIC};

mod cache;
mod codec;
mod error;
mod header;
