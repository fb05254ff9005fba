use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    /// A packed 3-digit field failed to decode.
    #[error("malformed packed field: {0:?}")]
    MalformedPacked(String),

    /// The buffer does not follow the manifest layout.
    #[error("malformed manifest: {0}")]
    MalformedManifest(&'static str),

    /// The decompressed payload does not hash to the header checksum.
    #[error("manifest checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Unknown stored-as discriminator in the binary header.
    #[error("unknown manifest storage format {0}")]
    UnknownFormat(u8),

    /// A section whose layout is unconfirmed carries data.
    #[error("unimplemented manifest section: {0}")]
    Unimplemented(&'static str),

    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
