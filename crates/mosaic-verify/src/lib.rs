//! Streaming content verification for downloaded artifacts.
//!
//! Provides incremental hashing and verification without enforcing a
//! verification policy on callers. Data is hashed as it streams through
//! [`VerifiedReader`], so bytes are touched exactly once for both hashing
//! and writing.
//!
//! The manifest and chunk wire formats identify payloads by SHA-1, so the
//! built-in hasher is [`Sha1Hasher`]; anything implementing
//! [`digest::Digest`] plugs into [`DigestHasher`].

pub use self::error::{Result, VerifyError};
pub use self::hasher::{DigestHasher, Hasher, Sha1Hasher};
pub use self::reader::VerifiedReader;

mod error;
mod hasher;
mod reader;
