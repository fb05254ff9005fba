use std::io::{self, Read};

use crate::{Hasher, Result, VerifyError};

/// Reader adapter that hashes every byte it yields.
pub struct VerifiedReader<R, H> {
    inner: R,
    hasher: H,
}

impl<R, H> VerifiedReader<R, H> {
    pub fn new(inner: R, hasher: H) -> Self {
        Self { inner, hasher }
    }

    pub fn into_inner(self) -> (R, H) {
        (self.inner, self.hasher)
    }
}

impl<R, H: Hasher> VerifiedReader<R, H> {
    /// Compare the accumulated digest against `expected`.
    pub fn finish(self, expected: &[u8]) -> Result<()> {
        let actual = self.hasher.finalize();
        if actual.as_slice() == expected {
            Ok(())
        } else {
            Err(VerifyError::HashMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            })
        }
    }
}

impl<R: Read, H: Hasher> Read for VerifiedReader<R, H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_hash_while_reading() {
        let data = b"hello world";
        let mut reader = VerifiedReader::new(&data[..], crate::Sha1Hasher::new());
        let mut buffer = Vec::new();
        std::io::copy(&mut reader, &mut buffer).unwrap();

        let expected = hex::decode("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed").unwrap();
        reader.finish(&expected).unwrap();
        assert_eq!(buffer, data);
    }

    #[test]
    fn detects_mismatch() {
        let data = b"hello world";
        let mut reader = VerifiedReader::new(&data[..], crate::Sha1Hasher::new());
        let mut buffer = Vec::new();
        std::io::copy(&mut reader, &mut buffer).unwrap();

        let wrong_hash = vec![0u8; 20];
        assert!(matches!(
            reader.finish(&wrong_hash),
            Err(VerifyError::HashMismatch { .. })
        ));
    }

    #[test]
    fn one_shot_digest_matches_streaming() {
        let data = b"chunk payload";
        let mut reader = VerifiedReader::new(&data[..], crate::Sha1Hasher::new());
        std::io::copy(&mut reader, &mut std::io::sink()).unwrap();
        reader.finish(&crate::Sha1Hasher::digest(data)).unwrap();
    }

    #[test]
    fn custom_hasher() {
        struct CountingHasher {
            bytes: usize,
        }

        impl Hasher for CountingHasher {
            fn update(&mut self, data: &[u8]) {
                self.bytes += data.len();
            }
            fn finalize(self) -> Vec<u8> {
                self.bytes.to_le_bytes().to_vec()
            }
        }

        let data = b"test data";
        let mut reader = VerifiedReader::new(&data[..], CountingHasher { bytes: 0 });
        std::io::copy(&mut reader, &mut std::io::sink()).unwrap();

        reader
            .finish(&(data.len()).to_le_bytes())
            .expect("byte count digest should match");
    }
}
