use digest::Digest;

/// Minimal hasher interface for streaming verification.
/// Implementations must be Send for cross-thread safety.
pub trait Hasher: Send {
    /// Update the hash with new data.
    fn update(&mut self, data: &[u8]);

    /// Finalize and return the hash digest.
    /// Consumes self to prevent reuse.
    fn finalize(self) -> Vec<u8>;
}

/// Generic hasher wrapper for any `digest::Digest` implementation.
pub struct DigestHasher<D: Digest + Send>(D);

impl<D: Digest + Send> DigestHasher<D> {
    /// Create from a digest instance.
    pub fn from_digest(digest: D) -> Self {
        Self(digest)
    }

    /// One-shot digest of `data`.
    pub fn digest(data: &[u8]) -> Vec<u8> {
        D::digest(data).to_vec()
    }
}

impl<D: Digest + Send> Hasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

/// SHA-1 hasher; the digest both wire formats carry.
pub type Sha1Hasher = DigestHasher<sha1::Sha1>;

impl Sha1Hasher {
    /// Create a new SHA-1 hasher instance.
    pub fn new() -> Self {
        DigestHasher::from_digest(sha1::Sha1::new())
    }
}

impl Default for Sha1Hasher {
    fn default() -> Self {
        Self::new()
    }
}
