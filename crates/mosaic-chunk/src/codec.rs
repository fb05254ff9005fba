use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;

use crate::error::{ChunkError, Result};
use crate::header::{ChunkHeader, CHUNK_HEADER_SIZE};

/// Decode a raw chunk object into its parsed header and decompressed,
/// header-stripped payload.
///
/// Raw chunks (`stored_as == 0`) yield a zero-copy slice past the header;
/// zlib chunks (`stored_as == 1`) are inflated into a fresh buffer. Both
/// converge on the single representation cached copies share.
pub fn decode_chunk(raw: &Bytes) -> Result<(ChunkHeader, Bytes)> {
    let header = ChunkHeader::parse(raw)?;
    let payload = match header.stored_as {
        0 => raw.slice(CHUNK_HEADER_SIZE..),
        1 => {
            let mut out = Vec::new();
            ZlibDecoder::new(&raw[CHUNK_HEADER_SIZE..])
                .read_to_end(&mut out)
                .map_err(ChunkError::Inflate)?;
            Bytes::from(out)
        }
        other => return Err(ChunkError::UnsupportedEncoding(other)),
    };
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;
    use crate::header::CHUNK_MAGIC;

    fn chunk_object(payload: &[u8], stored_as: u8) -> Bytes {
        let body = match stored_as {
            1 => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(payload).unwrap();
                encoder.finish().unwrap()
            }
            _ => payload.to_vec(),
        };
        let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body.len());
        out.extend_from_slice(&CHUNK_MAGIC.to_le_bytes());
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(CHUNK_HEADER_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0x42; 16]);
        out.extend_from_slice(&0u64.to_le_bytes());
        out.push(stored_as);
        out.extend_from_slice(&[0; 20]);
        out.push(3);
        out.extend_from_slice(&body);
        Bytes::from(out)
    }

    #[test]
    fn raw_chunk_passes_through_without_header() {
        let raw = chunk_object(b"HELLO WORLD!", 0);
        let (header, payload) = decode_chunk(&raw).unwrap();
        assert_eq!(header.stored_as, 0);
        assert_eq!(&payload[..], b"HELLO WORLD!");
    }

    #[test]
    fn zlib_chunk_is_inflated() {
        let body: Vec<u8> = (0..200u16).map(|i| (i % 251) as u8).collect();
        let raw = chunk_object(&body, 1);
        let (header, payload) = decode_chunk(&raw).unwrap();
        assert_eq!(header.stored_as, 1);
        assert_eq!(&payload[..], &body[..]);
    }

    #[test]
    fn encrypted_chunks_are_unsupported() {
        let raw = chunk_object(b"secret", 2);
        assert!(matches!(
            decode_chunk(&raw),
            Err(ChunkError::UnsupportedEncoding(2))
        ));
    }

    #[test]
    fn garbage_zlib_payload_fails() {
        let raw = chunk_object(b"this is not deflate data", 0);
        let mut bytes = raw.to_vec();
        bytes[40] = 1; // claim zlib over a raw body
        assert!(matches!(
            decode_chunk(&Bytes::from(bytes)),
            Err(ChunkError::Inflate(_))
        ));
    }
}
