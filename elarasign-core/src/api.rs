// Public API: the five operations consumers actually call
// (`spec.md` §4.9). Everything else in this crate is a detail reached
// through here.

use crate::canvas::Canvas;
use crate::error::{ElaraError, Result};
use crate::forensic::{self, AccountabilityPayload};
use crate::hash::sha256;
use crate::locations::{self, LocationFinding, LocationStatus};
use crate::metadata::MetadataRecord;
use crate::signature::{FLAG_FORENSIC_PRESENT, LocationId, SignatureRecordV2};
use crate::spectrum;

/// Outcome of [`sign_image`].
#[derive(Debug, Clone)]
pub struct SignReport {
    pub meta_hash: [u8; 32],
    pub content_hash: [u8; 32],
    pub locations_embedded: Vec<LocationId>,
    pub spread_applied: bool,
    /// The 45-byte `iv || ciphertext || tag` annotation, when a forensic
    /// context and master key were both supplied. Never written to pixels;
    /// the caller hands this to the billboard/container adapter.
    pub forensic_annotation: Option<Vec<u8>>,
}

/// How confidently `verify_image` can speak to content integrity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    Intact,
    Tampered,
    /// No raw content bytes were supplied to compare against, e.g. when the
    /// caller only has an already-lossy re-encoding.
    Indeterminate,
}

/// Outcome of [`verify_image`]. Always `Ok` at the report level: recoverable
/// findings live in the fields, never as an `Err` (`spec.md` §7).
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub signed: bool,
    pub valid_locations: Vec<LocationId>,
    pub best_record: Option<SignatureRecordV2>,
    pub reduced_redundancy: bool,
    pub disagreeing_locations: Vec<LocationId>,
    pub lsb_present: bool,
    /// `None` when the image was too small for even one complete 8x8 block
    /// grid meeting the minimum block count; the layer was skipped, not
    /// reported absent.
    pub spread_present: Option<bool>,
    pub spread_confidence: Option<f32>,
    pub spread_low_energy: Option<bool>,
    pub tamper_detected: bool,
    pub integrity: Integrity,
}

/// Outcome of [`read_signature`].
#[derive(Debug, Clone)]
pub struct ReadReport {
    pub is_elara: bool,
    pub version: Option<&'static str>,
    pub timestamp: Option<u32>,
    pub meta_hash_prefix: Option<[u8; 16]>,
    pub valid_locations: Vec<LocationId>,
}

/// Optional forensic input to [`sign_image`]: everything needed to build
/// and encrypt an `AccountabilityPayload`, bound to the image's `meta_hash`.
#[derive(Debug, Clone, Copy)]
pub struct ForensicContext<'a> {
    pub payload: AccountabilityPayload,
    pub master_key: &'a str,
}

/// Sign `pixels` (a `width`x`height` RGBA buffer) in place: embed the
/// SignatureRecord at all three locations, apply the spread-spectrum layer
/// keyed off `metadata`'s hash, and optionally encrypt a forensic
/// annotation. `raw_content` is hashed for `content_hash`; it need not be
/// `pixels` itself (e.g. it may be the original compressed file bytes).
pub fn sign_image(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    metadata: &MetadataRecord,
    raw_content: &[u8],
    forensic_context: Option<ForensicContext>,
) -> Result<SignReport> {
    metadata.validate()?;
    let meta_hash = metadata.meta_hash()?;
    let content_hash = sha256(raw_content);

    let forensic_annotation = forensic_context
        .map(|ctx| forensic::encrypt_accountability(ctx.payload, ctx.master_key, &meta_hash))
        .transpose()?;
    let flags = if forensic_annotation.is_some() {
        FLAG_FORENSIC_PRESENT
    } else {
        0
    };

    let timestamp = forensic_context
        .map(|ctx| ctx.payload.timestamp)
        .unwrap_or(0);

    let mut canvas = Canvas::new(pixels, width, height)?;
    let locations_embedded =
        locations::sign_locations(&mut canvas, timestamp, &meta_hash, &content_hash, flags)?;

    let spread_result = spectrum::embed(&mut canvas, &meta_hash)?;
    let spread_applied = spread_result.blocks_embedded > 0;

    Ok(SignReport {
        meta_hash,
        content_hash,
        locations_embedded,
        spread_applied,
        forensic_annotation,
    })
}

/// Extract, vote, and (optionally) correlate the spread-spectrum layer;
/// compare against `raw_content` when supplied. Never raises a hard error:
/// any unsigned, partially-signed, or tampered image still produces a
/// report (`spec.md` §7).
pub fn verify_image(
    pixels: &[u8],
    width: u32,
    height: u32,
    raw_content: Option<&[u8]>,
    expected_meta_hash: Option<&[u8; 32]>,
) -> VerifyReport {
    let canvas = match Canvas::new_unchecked(pixels, width, height) {
        Ok(canvas) => canvas,
        Err(_) => return empty_verify_report(),
    };

    let extraction = match locations::extract_locations(&canvas) {
        Ok(report) => report,
        Err(_) => return empty_verify_report(),
    };

    // Spread-spectrum detection needs the full 32-byte meta_hash, which
    // cannot be recovered from the embedded record's 16-byte prefix alone;
    // it can only run when the caller supplies it.
    let spread = expected_meta_hash.and_then(|hash| spectrum::detect(&canvas, hash));

    let (tamper_detected, integrity) = match (&extraction.best_record, raw_content) {
        (Some(record), Some(content)) => {
            let actual_hash = sha256(content);
            let tampered = actual_hash[..16] != record.content_hash_prefix;
            (tampered, if tampered { Integrity::Tampered } else { Integrity::Intact })
        }
        (Some(_), None) => (false, Integrity::Indeterminate),
        (None, _) => (false, Integrity::Indeterminate),
    };

    VerifyReport {
        signed: extraction.signed,
        valid_locations: extraction.valid_locations,
        best_record: extraction.best_record,
        reduced_redundancy: extraction.reduced_redundancy,
        disagreeing_locations: extraction.disagreeing_locations,
        lsb_present: extraction.signed,
        spread_present: spread.as_ref().map(|s| s.present),
        spread_confidence: spread.as_ref().map(|s| s.confidence),
        spread_low_energy: spread.as_ref().map(|s| s.low_energy),
        tamper_detected,
        integrity,
    }
}

fn empty_verify_report() -> VerifyReport {
    VerifyReport {
        signed: false,
        valid_locations: Vec::new(),
        best_record: None,
        reduced_redundancy: false,
        disagreeing_locations: Vec::new(),
        lsb_present: false,
        spread_present: None,
        spread_confidence: None,
        spread_low_energy: None,
        tamper_detected: false,
        integrity: Integrity::Indeterminate,
    }
}

/// Lightweight read of whatever signature is present, without voting logic
/// beyond reporting which locations parsed as valid.
pub fn read_signature(pixels: &[u8], width: u32, height: u32) -> ReadReport {
    let canvas = match Canvas::new_unchecked(pixels, width, height) {
        Ok(canvas) => canvas,
        Err(_) => {
            return ReadReport {
                is_elara: false,
                version: None,
                timestamp: None,
                meta_hash_prefix: None,
                valid_locations: Vec::new(),
            }
        }
    };

    let extraction = match locations::extract_locations(&canvas) {
        Ok(report) => report,
        Err(_) => {
            return ReadReport {
                is_elara: false,
                version: None,
                timestamp: None,
                meta_hash_prefix: None,
                valid_locations: Vec::new(),
            }
        }
    };

    let has_legacy = extraction
        .findings
        .iter()
        .any(|f: &LocationFinding| matches!(f.status, LocationStatus::LegacyV1));

    match &extraction.best_record {
        Some(record) => ReadReport {
            is_elara: true,
            version: Some("2.0"),
            timestamp: Some(record.timestamp),
            meta_hash_prefix: Some(record.meta_hash_prefix),
            valid_locations: extraction.valid_locations,
        },
        None => ReadReport {
            is_elara: has_legacy,
            version: has_legacy.then_some("1.0"),
            timestamp: None,
            meta_hash_prefix: None,
            valid_locations: Vec::new(),
        },
    }
}

/// `true` if any location yields a valid or legacy signature.
pub fn has_signature(pixels: &[u8], width: u32, height: u32) -> bool {
    read_signature(pixels, width, height).is_elara
}

/// Decrypt a forensic annotation produced by [`sign_image`]. `meta_hash`
/// must be the same hash the image was signed under (the HKDF salt).
pub fn forensic_unlock(
    forensic_annotation: &[u8],
    master_key: &str,
    meta_hash: &[u8; 32],
) -> Result<AccountabilityPayload> {
    forensic::decrypt_accountability(forensic_annotation, master_key, meta_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BYTES_PER_PIXEL;
    use crate::metadata::{ContentType, GenerationMethod, MetadataRecordBuilder};

    fn sample_metadata(content_hash_hex: &str) -> MetadataRecord {
        MetadataRecordBuilder::new()
            .generator("test")
            .generated_at("2026-01-01T00:00:00Z")
            .user_fingerprint(crate::metadata::user_fingerprint("user-1"))
            .key_fingerprint("instance-a")
            .content_type(ContentType::Image)
            .content_hash(content_hash_hex)
            .character_id("char-1")
            .model_used("elara-vision-1")
            .prompt_hash(crate::metadata::prompt_hash(None))
            .generation_method(GenerationMethod::Ai)
            .build()
            .unwrap()
    }

    fn natural_image(width: u32, height: u32) -> Vec<u8> {
        let mut buf = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for (i, chunk) in buf.chunks_mut(BYTES_PER_PIXEL).enumerate() {
            chunk[0] = (i * 3 % 256) as u8;
            chunk[1] = (i * 7 % 256) as u8;
            chunk[2] = (i * 11 % 256) as u8;
            chunk[3] = 255;
        }
        buf
    }

    #[test]
    fn round_trip_reports_fully_signed() {
        let mut buf = natural_image(512, 512);
        let raw_content = b"original file bytes";
        let content_hash_hex = crate::hash::sha256_hex(raw_content);
        let metadata = sample_metadata(&content_hash_hex);

        let sign_report =
            sign_image(&mut buf, 512, 512, &metadata, raw_content, None).unwrap();
        assert_eq!(sign_report.locations_embedded.len(), 3);

        let verify_report = verify_image(&buf, 512, 512, Some(raw_content), None);
        assert!(verify_report.signed);
        assert_eq!(verify_report.valid_locations.len(), 3);
        assert!(!verify_report.tamper_detected);
        assert_eq!(verify_report.integrity, Integrity::Intact);
    }

    #[test]
    fn tamper_outside_signature_regions_is_detected() {
        let mut buf = natural_image(512, 512);
        let raw_content = b"original file bytes";
        let content_hash_hex = crate::hash::sha256_hex(raw_content);
        let metadata = sample_metadata(&content_hash_hex);
        sign_image(&mut buf, 512, 512, &metadata, raw_content, None).unwrap();

        let tampered_content = b"different file bytes";
        let verify_report = verify_image(&buf, 512, 512, Some(tampered_content), None);
        assert!(verify_report.signed);
        assert!(verify_report.tamper_detected);
        assert_eq!(verify_report.integrity, Integrity::Tampered);
    }

    #[test]
    fn missing_raw_content_is_indeterminate() {
        let mut buf = natural_image(512, 512);
        let raw_content = b"original file bytes";
        let content_hash_hex = crate::hash::sha256_hex(raw_content);
        let metadata = sample_metadata(&content_hash_hex);
        sign_image(&mut buf, 512, 512, &metadata, raw_content, None).unwrap();

        let verify_report = verify_image(&buf, 512, 512, None, None);
        assert!(verify_report.signed);
        assert!(!verify_report.tamper_detected);
        assert_eq!(verify_report.integrity, Integrity::Indeterminate);
    }

    #[test]
    fn sign_too_small_image_fails() {
        let mut buf = vec![0u8; 50 * 30 * BYTES_PER_PIXEL];
        let metadata = sample_metadata(&crate::hash::sha256_hex(b"x"));
        let result = sign_image(&mut buf, 50, 30, &metadata, b"x", None);
        assert!(matches!(result, Err(ElaraError::ImageTooSmall { .. })));
    }

    #[test]
    fn has_signature_true_after_sign_false_before() {
        let mut buf = natural_image(256, 256);
        assert!(!has_signature(&buf, 256, 256));
        let metadata = sample_metadata(&crate::hash::sha256_hex(b"x"));
        sign_image(&mut buf, 256, 256, &metadata, b"x", None).unwrap();
        assert!(has_signature(&buf, 256, 256));
    }

    #[test]
    fn read_signature_reports_version_and_timestamp() {
        let mut buf = natural_image(256, 256);
        let metadata = sample_metadata(&crate::hash::sha256_hex(b"x"));
        let ctx = ForensicContext {
            payload: AccountabilityPayload {
                timestamp: 1_700_000_000,
                user_fingerprint_short: [0; 8],
                ip_bytes: [0; 4],
                platform: crate::forensic::Platform::Web,
            },
            master_key: &"a".repeat(64),
        };
        sign_image(&mut buf, 256, 256, &metadata, b"x", Some(ctx)).unwrap();

        let read = read_signature(&buf, 256, 256);
        assert!(read.is_elara);
        assert_eq!(read.version, Some("2.0"));
        assert_eq!(read.timestamp, Some(1_700_000_000));
    }

    #[test]
    fn forensic_round_trip_through_public_api() {
        let mut buf = natural_image(256, 256);
        let metadata = sample_metadata(&crate::hash::sha256_hex(b"x"));
        let master_key = "c".repeat(64);
        let payload = AccountabilityPayload {
            timestamp: 42,
            user_fingerprint_short: [9; 8],
            ip_bytes: [10, 0, 0, 1],
            platform: crate::forensic::Platform::Mobile,
        };
        let ctx = ForensicContext { payload, master_key: &master_key };

        let sign_report =
            sign_image(&mut buf, 256, 256, &metadata, b"x", Some(ctx)).unwrap();
        let annotation = sign_report.forensic_annotation.unwrap();

        let recovered =
            forensic_unlock(&annotation, &master_key, &sign_report.meta_hash).unwrap();
        assert_eq!(recovered, payload);
    }
}
