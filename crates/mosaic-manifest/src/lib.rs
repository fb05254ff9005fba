//! Build-manifest decoding for chunked game distributions.
//!
//! A manifest describes a build as an ordered concatenation of byte ranges
//! taken from a pool of immutable, globally addressed chunks. Two wire
//! encodings exist: a legacy JSON document whose integer fields are packed
//! 3-digit ASCII strings, and a binary envelope (magic `0x44BEC00C`)
//! holding a zlib-compressed, SHA-1-checked payload. [`Manifest::parse`]
//! dispatches on the first byte and yields the same in-memory model for
//! both.

pub use self::catalog::{Catalog, CatalogElement, CatalogManifest, QueryParam};
pub use self::error::{ManifestError, Result};
pub use self::types::{Chunk, ChunkPart, FilePart, Manifest, ManifestFile};

pub mod packed;

mod binary;
mod catalog;
mod error;
mod json;
mod types;
