use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    /// The buffer does not start with a well-formed 62-byte header.
    #[error("invalid chunk header: {0}")]
    HeaderInvalid(&'static str),

    /// Stored-as discriminator this build cannot decode (2 is encrypted).
    #[error("unsupported chunk encoding {0}")]
    UnsupportedEncoding(u8),

    #[error("failed to inflate chunk payload: {0}")]
    Inflate(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChunkError>;
