use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssembleError {
    /// A chunk hit the retry ceiling; the file it belongs to is corrupt.
    #[error("chunk {guid} failed after {attempts} attempts: {last_error}")]
    ChunkFailed {
        guid: String,
        attempts: u32,
        last_error: String,
    },

    /// A part names a byte range outside its chunk's payload.
    #[error("part range [{offset}, {end}) exceeds chunk payload of {len} bytes")]
    PartOutOfRange { offset: u64, end: u64, len: u64 },

    /// A file part references a chunk the manifest does not describe.
    #[error("file references unknown chunk {0}")]
    UnknownChunk(String),

    /// The interrupt flag was raised mid-assembly.
    #[error("assembly interrupted")]
    Interrupted,

    /// Worker channels closed before every part arrived.
    #[error("worker channels closed before all parts arrived")]
    ChannelClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssembleError>;
