// Integration tests for the elaraSign PDF adapter's public API: presence-only
// sign/verify round trip over a minimal incrementally-updated PDF, per
// `spec.md` §6 (no content-hash rebinding for this adapter).

use elarasign_core::{ContentType, GenerationMethod, MetadataRecordBuilder};
use elarasign_pdf::{read_provenance, write_provenance};

fn sample_metadata(content_hash_hex: &str) -> elarasign_core::MetadataRecord {
    MetadataRecordBuilder::new()
        .generator("elaraSign-pdf-adapter")
        .generated_at("2026-02-01T00:00:00Z")
        .user_fingerprint(elarasign_core::metadata::user_fingerprint("writer-7"))
        .key_fingerprint("instance-b")
        .content_type(ContentType::Document)
        .content_hash(content_hash_hex)
        .character_id("narrator")
        .model_used("elara-writer-2")
        .prompt_hash(elarasign_core::metadata::prompt_hash(Some("write a short story")))
        .generation_method(GenerationMethod::Ai)
        .build()
        .unwrap()
}

fn minimal_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    out.extend_from_slice(
        b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n",
    );
    out.extend_from_slice(
        b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n",
    );
    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n0 4\n0000000000 65535 f \n");
    out.extend_from_slice(b"0000000009 00000 n \n0000000058 00000 n \n0000000118 00000 n \n");
    out.extend_from_slice(
        format!("trailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n")
            .as_bytes(),
    );
    out
}

#[test]
fn signed_pdf_reports_provenance_on_read() {
    let pdf = minimal_pdf();
    let content_hash = elarasign_core::hash::sha256_hex(&pdf);
    let metadata = sample_metadata(&content_hash);

    let signed = write_provenance(&pdf, &metadata).unwrap();
    let report = read_provenance(&signed);

    assert!(report.is_elara);
    assert_eq!(report.generator.as_deref(), Some("elaraSign-pdf-adapter"));
    assert_eq!(report.method.as_deref(), Some("ai"));
    assert_eq!(report.content_hash.as_deref(), Some(content_hash.as_str()));

    let meta_hash_hex = metadata.meta_hash_hex().unwrap();
    assert_eq!(report.meta_hash.as_deref(), Some(meta_hash_hex.as_str()));
    assert_ne!(report.meta_hash, report.content_hash);
}

#[test]
fn unsigned_pdf_is_reported_as_missing_provenance() {
    let pdf = minimal_pdf();
    let report = read_provenance(&pdf);
    assert!(!report.is_elara);
    assert!(report.generator.is_none());
}

#[test]
fn signing_is_an_incremental_update_original_bytes_survive() {
    let pdf = minimal_pdf();
    let content_hash = elarasign_core::hash::sha256_hex(&pdf);
    let metadata = sample_metadata(&content_hash);

    let signed = write_provenance(&pdf, &metadata).unwrap();
    assert!(signed.len() > pdf.len());
    assert!(signed.starts_with(&pdf[..pdf.len().min(9)]));
    let text = String::from_utf8_lossy(&signed);
    assert!(text.contains("/Type /Page"));
    assert!(text.contains("/MediaBox"));
}

#[test]
fn signing_twice_keeps_the_latest_provenance_readable() {
    let pdf = minimal_pdf();
    let content_hash = elarasign_core::hash::sha256_hex(&pdf);
    let first_metadata = sample_metadata(&content_hash);
    let once = write_provenance(&pdf, &first_metadata).unwrap();

    let mut second_metadata = first_metadata.clone();
    second_metadata.character_id = "editor".into();
    let twice = write_provenance(&once, &second_metadata).unwrap();

    let report = read_provenance(&twice);
    assert!(report.is_elara);
}

#[test]
fn malformed_pdf_bytes_reject_signing() {
    let garbage = b"this is not a pdf at all".to_vec();
    let metadata = sample_metadata(&elarasign_core::hash::sha256_hex(&garbage));
    assert!(write_provenance(&garbage, &metadata).is_err());
}

#[test]
fn invalid_metadata_is_rejected_before_touching_pdf_bytes() {
    let pdf = minimal_pdf();
    let mut metadata = sample_metadata(&elarasign_core::hash::sha256_hex(&pdf));
    metadata.content_hash = "not-hex".into();
    assert!(write_provenance(&pdf, &metadata).is_err());
}
