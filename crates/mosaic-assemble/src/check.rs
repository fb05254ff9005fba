//! Two-phase file integrity checks: the pre-assembly short-circuit and
//! the post-assembly verification pass.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use mosaic_manifest::{packed, ManifestFile};
use mosaic_verify::{Sha1Hasher, VerifiedReader};

/// Expected digest of the assembled file. Binary manifests carry 40-char
/// hex; legacy JSON manifests carry the packed form.
pub fn expected_file_hash(file: &ManifestFile) -> Option<Vec<u8>> {
    if file.file_hash.len() == 40 {
        hex::decode(&file.file_hash).ok()
    } else {
        packed::decode_packed(&file.file_hash).ok()
    }
}

/// Whether the file at `path` already matches `file`: the summed part
/// sizes must equal the on-disk size and the streamed SHA-1 must match
/// the manifest hash. A missing file is simply not a match.
pub fn check_file(path: &Path, file: &ManifestFile) -> io::Result<bool> {
    let handle = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let Some(expected) = expected_file_hash(file) else {
        return Ok(false);
    };
    if handle.metadata()?.len() != file.total_size() {
        return Ok(false);
    }

    let mut reader = VerifiedReader::new(handle, Sha1Hasher::new());
    io::copy(&mut reader, &mut io::sink())?;
    Ok(reader.finish(&expected).is_ok())
}

/// Post-assembly integrity pass. Files the pre-check already validated
/// are skipped; mismatches are logged, never fatal. Returns the number
/// of corrupt files.
pub async fn verify_files(
    files: &[(PathBuf, ManifestFile)],
    prechecked: &HashSet<PathBuf>,
) -> usize {
    let mut corrupt = 0;
    for (path, file) in files {
        if prechecked.contains(path) {
            continue;
        }
        let task_path = path.clone();
        let task_file = file.clone();
        match tokio::task::spawn_blocking(move || check_file(&task_path, &task_file)).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                warn!(path = %path.display(), "file is corrupt");
                corrupt += 1;
            }
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "failed to hash file");
                corrupt += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "hash task failed");
                corrupt += 1;
            }
        }
    }
    corrupt
}

#[cfg(test)]
mod tests {
    use super::*;

    use mosaic_manifest::{ChunkPart, FilePart};

    fn manifest_file(content: &[u8], hash: String) -> ManifestFile {
        ManifestFile {
            name: "test.bin".to_string(),
            file_hash: hash,
            parts: vec![FilePart {
                guid: "A".repeat(32),
                part: ChunkPart {
                    offset: 0,
                    size: content.len() as u32,
                },
            }],
            install_tags: Vec::new(),
        }
    }

    fn write_temp(content: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.bin");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn matching_file_passes() {
        let content = b"file body";
        let hash = hex::encode(Sha1Hasher::digest(content));
        let (_dir, path) = write_temp(content);
        assert!(check_file(&path, &manifest_file(content, hash)).unwrap());
    }

    #[test]
    fn packed_hash_form_is_accepted() {
        let content = b"file body";
        let packed: String = Sha1Hasher::digest(content)
            .iter()
            .map(|b| format!("{b:03}"))
            .collect();
        let (_dir, path) = write_temp(content);
        assert!(check_file(&path, &manifest_file(content, packed)).unwrap());
    }

    #[test]
    fn size_mismatch_fails_before_hashing() {
        let content = b"file body";
        let hash = hex::encode(Sha1Hasher::digest(content));
        let (_dir, path) = write_temp(b"file body with trailing junk");
        assert!(!check_file(&path, &manifest_file(content, hash)).unwrap());
    }

    #[test]
    fn wrong_content_fails() {
        let content = b"file body";
        let hash = hex::encode(Sha1Hasher::digest(content));
        let (_dir, path) = write_temp(b"FILE BODY");
        assert!(!check_file(&path, &manifest_file(content, hash)).unwrap());
    }

    #[test]
    fn missing_file_is_not_a_match() {
        let content = b"file body";
        let hash = hex::encode(Sha1Hasher::digest(content));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        assert!(!check_file(&path, &manifest_file(content, hash)).unwrap());
    }

    #[tokio::test]
    async fn verify_pass_skips_prechecked_files() {
        let content = b"file body";
        let (_dir, path) = write_temp(b"corrupted");
        let file = manifest_file(content, hex::encode(Sha1Hasher::digest(content)));

        let files = vec![(path.clone(), file)];
        let mut prechecked = HashSet::new();
        assert_eq!(verify_files(&files, &prechecked).await, 1);

        prechecked.insert(path);
        assert_eq!(verify_files(&files, &prechecked).await, 0);
    }
}
