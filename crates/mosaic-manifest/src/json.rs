//! Legacy JSON manifest format. Integer-valued fields arrive as packed
//! 3-digit strings and are decoded while converting into [`Manifest`].

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{ManifestError, Result};
use crate::packed;
use crate::types::{Chunk, ChunkPart, FilePart, Manifest, ManifestFile};

#[derive(Debug, Deserialize)]
struct JsonManifest {
    #[serde(rename = "AppNameString", default)]
    app_name: String,
    #[serde(rename = "BuildVersionString", default)]
    build_version: String,
    #[serde(rename = "LaunchExeString", default)]
    launch_exe: String,
    #[serde(rename = "LaunchCommand", default)]
    launch_command: String,
    #[serde(rename = "PrereqIds", default)]
    prereq_ids: Vec<String>,
    #[serde(rename = "PrereqName", default)]
    prereq_name: String,
    #[serde(rename = "PrereqPath", default)]
    prereq_path: String,
    #[serde(rename = "PrereqArgs", default)]
    prereq_args: String,
    #[serde(rename = "FileManifestList", default)]
    files: Vec<JsonFile>,
    #[serde(rename = "ChunkHashList", default)]
    chunk_hashes: HashMap<String, String>,
    #[serde(rename = "ChunkShaList", default)]
    chunk_shas: HashMap<String, String>,
    #[serde(rename = "DataGroupList", default)]
    data_groups: HashMap<String, String>,
    #[serde(rename = "ChunkFilesizeList", default)]
    chunk_file_sizes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct JsonFile {
    #[serde(rename = "Filename")]
    name: String,
    #[serde(rename = "FileHash", default)]
    hash: String,
    #[serde(rename = "FileChunkParts", default)]
    parts: Vec<JsonChunkPart>,
    #[serde(rename = "InstallTags", default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JsonChunkPart {
    #[serde(rename = "Guid")]
    guid: String,
    #[serde(rename = "Offset")]
    offset: String,
    #[serde(rename = "Size")]
    size: String,
}

pub(crate) fn decode(data: &[u8]) -> Result<Manifest> {
    let raw: JsonManifest = serde_json::from_slice(data)?;

    let mut chunks = HashMap::new();
    let mut files = Vec::with_capacity(raw.files.len());
    for file in &raw.files {
        let mut parts = Vec::with_capacity(file.parts.len());
        for part in &file.parts {
            parts.push(FilePart {
                guid: part.guid.clone(),
                part: ChunkPart {
                    offset: packed::decode_packed_u32(&part.offset)?,
                    size: packed::decode_packed_u32(&part.size)?,
                },
            });
            if !chunks.contains_key(&part.guid) {
                chunks.insert(part.guid.clone(), chunk_from_lists(&raw, &part.guid)?);
            }
        }
        files.push(ManifestFile {
            name: file.name.clone(),
            file_hash: file.hash.clone(),
            parts,
            install_tags: file.tags.clone(),
        });
    }

    Ok(Manifest {
        app_name: raw.app_name,
        build_version: raw.build_version,
        launch_exe: raw.launch_exe,
        launch_command: raw.launch_command,
        prereq_ids: raw.prereq_ids,
        prereq_name: raw.prereq_name,
        prereq_path: raw.prereq_path,
        prereq_args: raw.prereq_args,
        files,
        chunks,
    })
}

fn chunk_from_lists(raw: &JsonManifest, guid: &str) -> Result<Chunk> {
    let packed_hash = raw
        .chunk_hashes
        .get(guid)
        .ok_or(ManifestError::MalformedManifest(
            "chunk missing from hash list",
        ))?;
    // The JSON form stores the rolling hash little-endian; the CDN path
    // wants it big-endian hex.
    let mut hash = packed::decode_packed(packed_hash)?;
    hash.reverse();

    let data_group = raw
        .data_groups
        .get(guid)
        .ok_or(ManifestError::MalformedManifest(
            "chunk missing from data group list",
        ))?
        .parse::<u8>()
        .map_err(|_| ManifestError::MalformedManifest("invalid chunk data group"))?;

    let file_size = raw
        .chunk_file_sizes
        .get(guid)
        .ok_or(ManifestError::MalformedManifest(
            "chunk missing from file size list",
        ))?;

    Ok(Chunk {
        guid: guid.to_string(),
        hash: hex::encode_upper(&hash),
        sha: raw.chunk_shas.get(guid).cloned().unwrap_or_default(),
        data_group,
        file_size: u64::from(packed::decode_packed_u32(file_size)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_packed(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:03}")).collect()
    }

    fn sample() -> String {
        let guid = "0123456789ABCDEF0123456789ABCDEF";
        // rolling hash bytes, little-endian on the wire
        let hash = encode_packed(&[0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01]);
        let size = encode_packed(&1337u32.to_le_bytes());
        let offset = encode_packed(&6u32.to_le_bytes());
        let part_size = encode_packed(&5u32.to_le_bytes());
        format!(
            r#"{{
                "AppNameString": "TestApp",
                "BuildVersionString": "++Fortnite+Release-1.0-Windows",
                "LaunchExeString": "app.exe",
                "FileManifestList": [
                    {{
                        "Filename": "Engine/app.bin",
                        "FileHash": "{file_hash}",
                        "FileChunkParts": [
                            {{"Guid": "{guid}", "Offset": "{offset}", "Size": "{part_size}"}}
                        ],
                        "InstallTags": ["base"]
                    }}
                ],
                "ChunkHashList": {{"{guid}": "{hash}"}},
                "ChunkShaList": {{"{guid}": "aa11"}},
                "DataGroupList": {{"{guid}": "7"}},
                "ChunkFilesizeList": {{"{guid}": "{size}"}}
            }}"#,
            file_hash = encode_packed(&[0u8; 20]),
        )
    }

    #[test]
    fn decodes_sample_manifest() {
        let manifest = Manifest::parse(sample().as_bytes()).unwrap();
        assert_eq!(manifest.app_name, "TestApp");
        assert_eq!(manifest.files.len(), 1);

        let file = &manifest.files[0];
        assert_eq!(file.name, "Engine/app.bin");
        assert_eq!(file.install_tags, ["base"]);
        assert_eq!(file.parts.len(), 1);
        assert_eq!(file.parts[0].part, ChunkPart { offset: 6, size: 5 });

        let chunk = &manifest.chunks[&file.parts[0].guid];
        // byte-reversed before hex rendering
        assert_eq!(chunk.hash, "0123456789ABCDEF");
        assert_eq!(chunk.data_group, 7);
        assert_eq!(chunk.file_size, 1337);
        assert_eq!(chunk.sha, "aa11");
    }

    #[test]
    fn missing_chunk_lists_are_malformed() {
        let stripped = sample().replace("ChunkHashList", "SomethingElse");
        assert!(matches!(
            Manifest::parse(stripped.as_bytes()),
            Err(ManifestError::MalformedManifest(_))
        ));
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            Manifest::parse(b"{not json"),
            Err(ManifestError::Json(_))
        ));
    }
}
