// PNG `tEXt`/`zTXt` chunk emission, inserted after `IHDR` and before `IDAT`.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{ElaraError, Result};
use crate::hash::crc32;

use super::{PNG_FORENSIC_KEYWORD, PNG_KEYWORD};

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const IHDR: [u8; 4] = *b"IHDR";
const IDAT: [u8; 4] = *b"IDAT";

/// Build one PNG chunk: 4-byte big-endian length, 4-byte ASCII type, data,
/// 4-byte big-endian CRC-32 over type+data.
fn build_chunk(chunk_type: [u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 4 + data.len() + 4);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&chunk_type);
    out.extend_from_slice(data);
    let mut crc_input = Vec::with_capacity(4 + data.len());
    crc_input.extend_from_slice(&chunk_type);
    crc_input.extend_from_slice(data);
    out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
    out
}

/// A `tEXt` chunk: `keyword \0 text`, Latin-1 text with no compression.
fn text_chunk(keyword: &str, text: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(keyword.len() + 1 + text.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(text.as_bytes());
    build_chunk(*b"tEXt", &data)
}

/// A `zTXt` chunk: `keyword \0 compression_method(0) deflate(text)`.
fn compressed_text_chunk(keyword: &str, text: &str) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(keyword.len() + 2 + text.len() / 2);
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.push(0); // compression method 0 = deflate

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| ElaraError::ContainerDecodeError(format!("zTXt deflate failed: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| ElaraError::ContainerDecodeError(format!("zTXt deflate failed: {e}")))?;
    data.extend_from_slice(&compressed);

    Ok(build_chunk(*b"zTXt", &data))
}

/// Billboard chunks to insert into a PNG: a short `tEXt` summary plus a
/// `zTXt` carrying the full canonical metadata JSON, and (when present) a
/// `tEXt` chunk carrying the base64 forensic annotation.
pub fn build_billboard_chunks(
    canonical_json: &str,
    meta_hash_hex: &str,
    forensic_annotation: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&text_chunk(PNG_KEYWORD, meta_hash_hex));
    out.extend_from_slice(&compressed_text_chunk(PNG_KEYWORD, canonical_json)?);
    if let Some(annotation) = forensic_annotation {
        let encoded = BASE64.encode(annotation);
        out.extend_from_slice(&text_chunk(PNG_FORENSIC_KEYWORD, &encoded));
    }
    Ok(out)
}

/// Insert `chunks` (already-framed PNG chunk bytes) into `png_bytes`
/// immediately after `IHDR` and before the first `IDAT`. Fails with
/// `ContainerDecodeError` if the input is not a well-formed PNG with an
/// `IHDR` chunk.
pub fn insert_chunks(png_bytes: &[u8], chunks: &[u8]) -> Result<Vec<u8>> {
    if png_bytes.len() < PNG_SIGNATURE.len() || png_bytes[..8] != PNG_SIGNATURE {
        return Err(ElaraError::ContainerDecodeError("not a PNG file".into()));
    }

    let mut cursor = 8usize;
    let mut ihdr_end: Option<usize> = None;
    while cursor + 8 <= png_bytes.len() {
        let len = u32::from_be_bytes(png_bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
        let chunk_type: [u8; 4] = png_bytes[cursor + 4..cursor + 8].try_into().unwrap();
        let chunk_end = cursor + 8 + len + 4;
        if chunk_end > png_bytes.len() {
            return Err(ElaraError::ContainerDecodeError(
                "truncated PNG chunk".into(),
            ));
        }
        if chunk_type == IHDR {
            ihdr_end = Some(chunk_end);
            break;
        }
        if chunk_type == IDAT {
            break;
        }
        cursor = chunk_end;
    }

    let insert_at = ihdr_end.ok_or_else(|| {
        ElaraError::ContainerDecodeError("PNG missing IHDR chunk".into())
    })?;

    let mut out = Vec::with_capacity(png_bytes.len() + chunks.len());
    out.extend_from_slice(&png_bytes[..insert_at]);
    out.extend_from_slice(chunks);
    out.extend_from_slice(&png_bytes[insert_at..]);
    Ok(out)
}
