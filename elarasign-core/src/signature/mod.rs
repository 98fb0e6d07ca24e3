// Signature codec: pack/unpack the 48-byte SignatureRecord wire record.
//
// Wire format (big-endian), 48 bytes total:
//   [magic:5="ELARA"][version:1][location_id:1][timestamp:4]
//   [meta_hash_prefix:16][content_hash_prefix:16][flags:1][crc32:4]
//
// The same 48 bytes are written at each of the three pixel locations; only
// `location_id` differs. crc32 covers bytes 0..43 (everything but itself).

use crate::error::{ElaraError, Result};
use crate::hash::crc32;

pub const MAGIC: [u8; 5] = *b"ELARA";
pub const VERSION_V2: u8 = 0x02;
pub const VERSION_V1_LEGACY: u8 = 0x01;
pub const RECORD_LEN: usize = 48;

/// Bit 0 of the flags byte: a forensic payload is attached elsewhere
/// (in a container-level annotation, never in pixels).
pub const FLAG_FORENSIC_PRESENT: u8 = 0b0000_0001;

/// One of the three embedding locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationId {
    TopLeft = 1,
    TopRight = 2,
    BottomCenter = 3,
}

impl LocationId {
    pub fn wire_value(self) -> u8 {
        self as u8
    }

    pub fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            1 => Some(LocationId::TopLeft),
            2 => Some(LocationId::TopRight),
            3 => Some(LocationId::BottomCenter),
            _ => None,
        }
    }

    pub fn all() -> [LocationId; 3] {
        [LocationId::TopLeft, LocationId::TopRight, LocationId::BottomCenter]
    }
}

/// The parsed fields of a v2 signature record. Present on both valid and
/// CRC-invalid unpacks, so a corrupt-but-parseable record can still be
/// reported for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecordV2 {
    pub location_id: LocationId,
    pub timestamp: u32,
    pub meta_hash_prefix: [u8; 16],
    pub content_hash_prefix: [u8; 16],
    pub flags: u8,
}

impl SignatureRecordV2 {
    pub fn forensic_present(&self) -> bool {
        self.flags & FLAG_FORENSIC_PRESENT != 0
    }
}

/// Outcome of unpacking a candidate 48-byte slot: a well-formed v2 record
/// (which may still have failed CRC), or a recognized-but-unsupported v1
/// legacy record (read-only recognition, never treated as valid for voting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unpacked {
    V2 {
        record: SignatureRecordV2,
        is_valid: bool,
    },
    V1Legacy {
        raw: [u8; RECORD_LEN],
    },
}

impl Unpacked {
    pub fn is_valid_v2(&self) -> bool {
        matches!(self, Unpacked::V2 { is_valid: true, .. })
    }
}

/// Build the 48-byte wire record for one location, with CRC-32 appended
/// over the first 44 bytes.
pub fn pack(
    location_id: LocationId,
    timestamp: u32,
    meta_hash: &[u8; 32],
    content_hash: &[u8; 32],
    flags: u8,
) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    buf[0..5].copy_from_slice(&MAGIC);
    buf[5] = VERSION_V2;
    buf[6] = location_id.wire_value();
    buf[7..11].copy_from_slice(&timestamp.to_be_bytes());
    buf[11..27].copy_from_slice(&meta_hash[0..16]);
    buf[27..43].copy_from_slice(&content_hash[0..16]);
    buf[43] = flags;
    let crc = crc32(&buf[0..44]);
    buf[44..48].copy_from_slice(&crc.to_be_bytes());
    buf
}

/// Parse a candidate 48-byte slot into an [`Unpacked`] record.
///
/// Any length other than 48 bytes, or a magic mismatch, or an unrecognized
/// version, fails fast with `ElaraError::BadSignature`. A v2 record with an
/// out-of-range `location_id` also fails fast (there is no partial-credit
/// parse for a structurally invalid location). A v2 record with a bad CRC
/// is NOT a hard failure: it is returned with `is_valid = false` so the
/// caller can report it for diagnostics.
pub fn unpack(bytes: &[u8]) -> Result<Unpacked> {
    if bytes.len() != RECORD_LEN {
        return Err(ElaraError::BadSignature(format!(
            "expected {RECORD_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0..5] != MAGIC {
        return Err(ElaraError::BadSignature("magic mismatch".into()));
    }

    let version = bytes[5];
    if version == VERSION_V1_LEGACY {
        let mut raw = [0u8; RECORD_LEN];
        raw.copy_from_slice(bytes);
        return Ok(Unpacked::V1Legacy { raw });
    }
    if version != VERSION_V2 {
        return Err(ElaraError::BadSignature(format!(
            "unsupported version: 0x{version:02x}"
        )));
    }

    let location_id = LocationId::from_wire_value(bytes[6])
        .ok_or_else(|| ElaraError::BadSignature(format!("bad location_id: {}", bytes[6])))?;

    let timestamp = u32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);

    let mut meta_hash_prefix = [0u8; 16];
    meta_hash_prefix.copy_from_slice(&bytes[11..27]);

    let mut content_hash_prefix = [0u8; 16];
    content_hash_prefix.copy_from_slice(&bytes[27..43]);

    let flags = bytes[43];

    let expected_crc = u32::from_be_bytes([bytes[44], bytes[45], bytes[46], bytes[47]]);
    let actual_crc = crc32(&bytes[0..44]);
    let is_valid = expected_crc == actual_crc;

    Ok(Unpacked::V2 {
        record: SignatureRecordV2 {
            location_id,
            timestamp,
            meta_hash_prefix,
            content_hash_prefix,
            flags,
        },
        is_valid,
    })
}
