use std::collections::HashMap;

use crate::binary;
use crate::error::{ManifestError, Result};
use crate::json;

/// A downloadable chunk, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 16-byte identifier, uppercase hex.
    pub guid: String,
    /// 64-bit rolling hash, uppercase hex; appears in the CDN path.
    pub hash: String,
    /// SHA-1 of the decompressed body, lowercase hex; may be empty.
    pub sha: String,
    /// Two-digit zero-padded CDN path segment.
    pub data_group: u8,
    /// Expected on-disk (compressed) size of the chunk object.
    pub file_size: u64,
}

/// Byte range `[offset, offset + size)` inside a chunk's decompressed
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPart {
    pub offset: u32,
    pub size: u32,
}

/// One entry of a file's ordered part list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub guid: String,
    pub part: ChunkPart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// Slash-delimited path relative to the install root.
    pub name: String,
    /// SHA-1 of the assembled contents; 40-char hex or legacy packed form.
    pub file_hash: String,
    /// The file is the in-order concatenation of these byte ranges.
    pub parts: Vec<FilePart>,
    /// Opaque labels, preserved but unused by the pipeline.
    pub install_tags: Vec<String>,
}

impl ManifestFile {
    /// Expected size of the fully assembled file.
    pub fn total_size(&self) -> u64 {
        self.parts.iter().map(|p| u64::from(p.part.size)).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub app_name: String,
    pub build_version: String,
    pub launch_exe: String,
    pub launch_command: String,
    pub prereq_ids: Vec<String>,
    pub prereq_name: String,
    pub prereq_path: String,
    pub prereq_args: String,
    pub files: Vec<ManifestFile>,
    pub chunks: HashMap<String, Chunk>,
}

impl Manifest {
    /// Decode a manifest from raw bytes, dispatching on the first byte:
    /// `{` selects the legacy JSON format, anything else the binary one.
    pub fn parse(data: &[u8]) -> Result<Manifest> {
        let manifest = match data.first() {
            Some(b'{') => json::decode(data)?,
            Some(_) => binary::decode(data)?,
            None => return Err(ManifestError::MalformedManifest("empty manifest")),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Install sub-path derived from the build version: the
    /// `++Fortnite+Release-` prefix and `-{platform}` suffix are stripped.
    pub fn install_root(&self, platform: &str) -> String {
        let version = self.build_version.as_str();
        let version = version
            .strip_prefix("++Fortnite+Release-")
            .unwrap_or(version);
        let suffix = format!("-{platform}");
        version.strip_suffix(&suffix).unwrap_or(version).to_string()
    }

    fn validate(&self) -> Result<()> {
        for file in &self.files {
            for part in &file.parts {
                if !self.chunks.contains_key(&part.guid) {
                    return Err(ManifestError::MalformedManifest(
                        "file part references unknown chunk",
                    ));
                }
            }
        }
        Ok(())
    }
}
