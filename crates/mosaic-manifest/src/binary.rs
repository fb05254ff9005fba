//! Binary manifest format: a fixed little-endian header followed by a
//! possibly zlib-compressed payload whose SHA-1 must match the header
//! checksum. Strings are length-prefixed by a 32-bit byte count that
//! includes a trailing NUL; a count of zero means empty.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use sha1::{Digest, Sha1};

use crate::error::{ManifestError, Result};
use crate::types::{Chunk, ChunkPart, FilePart, Manifest, ManifestFile};

pub(crate) const MANIFEST_MAGIC: u32 = 0x44BE_C00C;

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ManifestError::MalformedManifest(
                "unexpected end of manifest data",
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let raw = self.take(len)?;
        Ok(String::from_utf8_lossy(&raw[..len - 1]).into_owned())
    }
}

pub(crate) fn decode(data: &[u8]) -> Result<Manifest> {
    let mut reader = Reader::new(data);

    if reader.u32()? != MANIFEST_MAGIC {
        return Err(ManifestError::MalformedManifest("bad manifest magic"));
    }
    let header_size = reader.u32()? as usize;
    let uncompressed_size = reader.u32()? as usize;
    let compressed_size = reader.u32()? as usize;
    let checksum = reader.take(20)?.to_vec();
    let stored_as = reader.u8()?;
    let _version = reader.u32()?;

    if reader.pos != header_size {
        return Err(ManifestError::MalformedManifest("header size mismatch"));
    }
    if reader.remaining() != compressed_size {
        return Err(ManifestError::MalformedManifest("payload size mismatch"));
    }

    let payload = &data[reader.pos..];
    let decompressed = match stored_as {
        0 => {
            if payload.len() < uncompressed_size {
                return Err(ManifestError::MalformedManifest(
                    "truncated manifest payload",
                ));
            }
            payload[..uncompressed_size].to_vec()
        }
        1 => {
            let mut out = Vec::new();
            ZlibDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|_| ManifestError::MalformedManifest("zlib inflate failed"))?;
            out
        }
        other => return Err(ManifestError::UnknownFormat(other)),
    };

    if decompressed.len() != uncompressed_size {
        return Err(ManifestError::MalformedManifest(
            "decompressed size mismatch",
        ));
    }

    let digest = Sha1::digest(&decompressed);
    if digest.as_slice() != checksum.as_slice() {
        return Err(ManifestError::ChecksumMismatch {
            expected: hex::encode(&checksum),
            actual: hex::encode(digest),
        });
    }

    decode_body(&decompressed)
}

fn decode_body(body: &[u8]) -> Result<Manifest> {
    let mut reader = Reader::new(body);

    // inner version header, opaque
    reader.skip(14)?;

    let app_name = reader.string()?;
    let build_version = reader.string()?;
    let launch_exe = reader.string()?;
    let launch_command = reader.string()?;

    // No confirmed sample of a populated prereq-id array exists; bail
    // instead of guessing its layout.
    if reader.u32()? != 0 {
        return Err(ManifestError::Unimplemented("prereq ids array"));
    }

    let prereq_name = reader.string()?;
    let prereq_path = reader.string()?;
    let prereq_args = reader.string()?;

    // chunk-section header
    reader.skip(5)?;
    let chunk_count = reader.u32()? as usize;

    // counts are untrusted; bounded reads grow the vecs
    let mut guids = Vec::new();
    for _ in 0..chunk_count {
        guids.push(hex::encode_upper(reader.take(16)?));
    }
    let mut hashes = Vec::new();
    for _ in 0..chunk_count {
        hashes.push(hex::encode_upper(reader.take(8)?));
    }
    let mut shas = Vec::new();
    for _ in 0..chunk_count {
        shas.push(hex::encode(reader.take(20)?));
    }
    let mut data_groups = Vec::new();
    for _ in 0..chunk_count {
        data_groups.push(reader.u8()?);
    }
    // per-chunk flags, unused
    reader.skip(4 * chunk_count)?;
    let mut file_sizes = Vec::new();
    for _ in 0..chunk_count {
        file_sizes.push(reader.u64()?);
    }

    let mut chunks = HashMap::with_capacity(guids.len());
    for i in 0..guids.len() {
        chunks.insert(
            guids[i].clone(),
            Chunk {
                guid: guids[i].clone(),
                hash: hashes[i].clone(),
                sha: shas[i].clone(),
                data_group: data_groups[i],
                file_size: file_sizes[i],
            },
        );
    }

    // file-section header
    reader.skip(5)?;
    let file_count = reader.u32()? as usize;

    let mut files = Vec::new();
    for _ in 0..file_count {
        files.push(ManifestFile {
            name: reader.string()?,
            file_hash: String::new(),
            parts: Vec::new(),
            install_tags: Vec::new(),
        });
    }
    // source file paths, discarded
    for _ in 0..files.len() {
        reader.string()?;
    }
    for file in &mut files {
        file.file_hash = hex::encode(reader.take(20)?);
    }
    // one metadata byte per file
    reader.skip(files.len())?;

    for file in &mut files {
        let tag_count = reader.u32()? as usize;
        for _ in 0..tag_count {
            file.install_tags.push(reader.string()?);
        }
    }

    for file in &mut files {
        let part_count = reader.u32()? as usize;
        for _ in 0..part_count {
            reader.skip(4)?;
            let guid = hex::encode_upper(reader.take(16)?);
            let offset = reader.u32()?;
            let size = reader.u32()?;
            file.parts.push(FilePart {
                guid,
                part: ChunkPart { offset, size },
            });
        }
    }

    Ok(Manifest {
        app_name,
        build_version,
        launch_exe,
        launch_command,
        prereq_ids: Vec::new(),
        prereq_name,
        prereq_path,
        prereq_args,
        files,
        chunks,
    })
}
