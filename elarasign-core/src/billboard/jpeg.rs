// JPEG APP1 EXIF segment emission: a minimal single-IFD TIFF structure
// carrying the four billboard tags from `spec.md` §6. The core owns which
// tags and keywords are written, not a full EXIF parser/writer -- mature
// codec libraries would own container surgery in a production deployment;
// this crate only needs to emit a segment a standard EXIF reader accepts.

use crate::error::Result;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
/// Big-endian ("Motorola") TIFF byte order marker.
const TIFF_BYTE_ORDER: [u8; 2] = *b"MM";
const TIFF_MAGIC: u16 = 42;

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_USER_COMMENT: u16 = 0x9286;

const TYPE_ASCII: u16 = 2;
const TYPE_UNDEFINED: u16 = 7;

/// EXIF `UserComment` character-code prefix for plain ASCII text.
const USER_COMMENT_ASCII_PREFIX: [u8; 8] = *b"ASCII\0\0\0";

struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    value_or_offset: Vec<u8>,
}

/// Build the APP1 segment payload (everything after the 2-byte marker and
/// 2-byte length): `Software`, `Copyright`, `ImageDescription`, and a
/// `UserComment` carrying the canonical metadata JSON, plus a short
/// `elaraSign:metaHash` string appended to the description field.
pub fn build_app1_segment(
    canonical_json: &str,
    meta_hash_hex: &str,
    software: &str,
) -> Result<Vec<u8>> {
    let description = format!("{}:{meta_hash_hex}", super::JPEG_META_HASH_PREFIX);
    let copyright = "elaraSign provenance record";

    let mut user_comment_value = USER_COMMENT_ASCII_PREFIX.to_vec();
    user_comment_value.extend_from_slice(canonical_json.as_bytes());

    let entries = vec![
        ascii_entry(TAG_SOFTWARE, software),
        ascii_entry(TAG_COPYRIGHT, copyright),
        ascii_entry(TAG_IMAGE_DESCRIPTION, &description),
        IfdEntry {
            tag: TAG_USER_COMMENT,
            field_type: TYPE_UNDEFINED,
            count: user_comment_value.len() as u32,
            value_or_offset: user_comment_value,
        },
    ];

    let tiff = build_tiff(&entries);

    let mut out = Vec::with_capacity(EXIF_HEADER.len() + tiff.len());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(&tiff);
    Ok(out)
}

fn ascii_entry(tag: u16, text: &str) -> IfdEntry {
    let mut value = text.as_bytes().to_vec();
    value.push(0); // NUL-terminated, per TIFF ASCII type
    IfdEntry {
        tag,
        field_type: TYPE_ASCII,
        count: value.len() as u32,
        value_or_offset: value,
    }
}

/// Assemble a minimal single-IFD TIFF structure: header, one IFD with
/// `entries` (sorted by tag, as TIFF requires), no next-IFD offset, and an
/// overflow area for values wider than 4 bytes.
fn build_tiff(entries: &[IfdEntry]) -> Vec<u8> {
    let mut sorted: Vec<&IfdEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.tag);

    let ifd_offset: u32 = 8; // immediately after the 8-byte TIFF header
    let entry_count = sorted.len() as u32;
    let ifd_size = 2 + entry_count * 12 + 4; // count + entries + next-IFD offset
    let overflow_start = ifd_offset + ifd_size;

    let mut overflow = Vec::new();
    let mut overflow_offsets = Vec::with_capacity(sorted.len());
    for entry in &sorted {
        overflow_offsets.push(overflow_start + overflow.len() as u32);
        overflow.extend_from_slice(&entry.value_or_offset);
        if overflow.len() % 2 == 1 {
            overflow.push(0); // word-align the next value, per TIFF convention
        }
    }

    let mut out = Vec::with_capacity((overflow_start as usize) + overflow.len());
    out.extend_from_slice(&TIFF_BYTE_ORDER);
    out.extend_from_slice(&TIFF_MAGIC.to_be_bytes());
    out.extend_from_slice(&ifd_offset.to_be_bytes());

    out.extend_from_slice(&(entry_count as u16).to_be_bytes());
    for (entry, offset) in sorted.iter().zip(overflow_offsets.iter()) {
        out.extend_from_slice(&entry.tag.to_be_bytes());
        out.extend_from_slice(&entry.field_type.to_be_bytes());
        out.extend_from_slice(&entry.count.to_be_bytes());
        if entry.value_or_offset.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.value_or_offset.len()].copy_from_slice(&entry.value_or_offset);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&offset.to_be_bytes());
        }
    }
    out.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

    out.extend_from_slice(&overflow);
    out
}
