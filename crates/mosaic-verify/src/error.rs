use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Mismatch between the expected and computed digest.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("I/O error during verification: {0}")]
    Io(#[from] io::Error),

    #[error("hex decoding error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, VerifyError>;
