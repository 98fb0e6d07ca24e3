// elaraSign PDF adapter.
//
// Reuses `elarasign-core`'s `MetadataRecord` and hashing discipline; the
// PDF-specific work here is container surgery only (`spec.md` §6): write
// `/Info` dictionary fields and custom `/Root` catalog entries via a
// standard PDF incremental update, and read them back presence-only.
// Content-hash rebinding is out of scope: PDF re-serialization perturbs
// bytes in ways that make a pixel-style hash comparison meaningless.

use elarasign_core::error::{ElaraError, Result};
use elarasign_core::MetadataRecord;

/// One indirect object reference, `obj gen R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObjRef {
    num: u32,
    generation: u16,
}

struct Trailer {
    root: ObjRef,
    info: Option<ObjRef>,
    max_obj_num: u32,
    prev_startxref: u64,
}

/// Outcome of [`read_provenance`]: presence-only, no content-hash rebinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfReadReport {
    pub is_elara: bool,
    /// The signing event's identity (`MetadataRecord::meta_hash_hex`), not
    /// to be confused with `content_hash`.
    pub meta_hash: Option<String>,
    pub content_hash: Option<String>,
    pub generator: Option<String>,
    pub method: Option<String>,
}

/// Write the provenance entries into `pdf_bytes` via an incremental update:
/// a fresh `/Info` object carrying `/Creator`, `/Producer`, `/Keywords`,
/// `/Subject`, and a new `/Root` object (same object number, next
/// generation) carrying the `ElaraSign*` catalog keys from `spec.md` §6.
pub fn write_provenance(pdf_bytes: &[u8], metadata: &MetadataRecord) -> Result<Vec<u8>> {
    metadata.validate()?;
    let trailer = locate_trailer(pdf_bytes)?;
    let root_body = locate_object_dict(pdf_bytes, trailer.root)?;

    let mut out = pdf_bytes.to_vec();
    if !out.ends_with(b"\n") {
        out.push(b'\n');
    }

    let info_num = trailer.max_obj_num + 1;
    let info_ref = ObjRef { num: info_num, generation: 0 };
    let info_offset = out.len();
    out.extend_from_slice(info_object_bytes(info_ref, metadata).as_bytes());

    let meta_hash_hex = metadata.meta_hash_hex()?;

    let root_offset = out.len();
    let new_root_body = splice_catalog_entries(&root_body, metadata, &meta_hash_hex);
    out.extend_from_slice(
        format!(
            "{} {} obj\n{}\nendobj\n",
            trailer.root.num, trailer.root.generation, new_root_body
        )
        .as_bytes(),
    );

    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n");
    out.extend_from_slice(
        format!(
            "{} 1\n{:010} {:05} n \n",
            trailer.root.num, root_offset, trailer.root.generation
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("{info_num} 1\n{info_offset:010} 00000 n \n").as_bytes());

    let new_max = (trailer.max_obj_num + 1).max(info_num + 1);
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {new_max} /Root {} {} R /Info {info_num} 0 R /Prev {} >>\n",
            trailer.root.num, trailer.root.generation, trailer.prev_startxref
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());

    Ok(out)
}

/// Presence-only read: scan the raw bytes for the `ElaraSign*` catalog
/// entries written by [`write_provenance`]. Does not attempt full object
/// resolution, matching the adapter's thin, out-of-core-scope role.
pub fn read_provenance(pdf_bytes: &[u8]) -> PdfReadReport {
    let text = String::from_utf8_lossy(pdf_bytes);
    if !text.contains("/ElaraSign ") && !text.contains("/ElaraSign(") {
        return PdfReadReport {
            is_elara: false,
            meta_hash: None,
            content_hash: None,
            generator: None,
            method: None,
        };
    }

    PdfReadReport {
        is_elara: true,
        meta_hash: extract_name_value(&text, "/ElaraSignature"),
        content_hash: extract_name_value(&text, "/ElaraContentHash"),
        generator: extract_name_value(&text, "/ElaraGenerator"),
        method: extract_name_value(&text, "/ElaraMethod"),
    }
}

fn info_object_bytes(info_ref: ObjRef, metadata: &MetadataRecord) -> String {
    format!(
        "{} {} obj\n<< /Creator ({}) /Producer (elaraSign/{}) /Keywords ({}) /Subject (elaraSign provenance record) >>\nendobj\n",
        info_ref.num,
        info_ref.generation,
        pdf_escape(&metadata.generator),
        pdf_escape(&metadata.signature_version),
        pdf_escape(&metadata.key_fingerprint),
    )
}

/// Append `/ElaraSign*` keys to an existing catalog dictionary body, just
/// before its closing `>>`. `meta_hash_hex` is the signing event's own
/// identity (`spec.md` line 245); it is distinct from `content_hash`, which
/// identifies the signed bytes rather than the signing event.
fn splice_catalog_entries(original_body: &str, metadata: &MetadataRecord, meta_hash_hex: &str) -> String {
    let close = original_body.rfind(">>").unwrap_or(original_body.len());
    let (head, tail) = original_body.split_at(close);

    let mut extra = String::new();
    extra.push_str(" /ElaraSign true");
    extra.push_str(&format!(" /ElaraSignature ({})", pdf_escape(meta_hash_hex)));
    extra.push_str(&format!(" /ElaraContentHash ({})", pdf_escape(&metadata.content_hash)));
    extra.push_str(&format!(" /ElaraMethod ({})", method_name(metadata)));
    extra.push_str(&format!(" /ElaraGenerator ({})", pdf_escape(&metadata.generator)));
    extra.push_str(" /ElaraTimestamp (");
    extra.push_str(&pdf_escape(&metadata.generated_at));
    extra.push(')');
    extra.push_str(&format!(
        " /ElaraFingerprint ({})",
        pdf_escape(&metadata.user_fingerprint)
    ));
    if !metadata.model_used.is_empty() {
        extra.push_str(&format!(" /ElaraModel ({})", pdf_escape(&metadata.model_used)));
    }
    if !metadata.character_id.is_empty() {
        extra.push_str(&format!(
            " /ElaraCharacter ({})",
            pdf_escape(&metadata.character_id)
        ));
    }
    extra.push_str(&format!(
        " /ElaraPromptHash ({})",
        pdf_escape(&metadata.prompt_hash)
    ));

    format!("{head}{extra} {tail}")
}

fn method_name(metadata: &MetadataRecord) -> &'static str {
    use elarasign_core::GenerationMethod::*;
    match metadata.generation_method {
        Ai => "ai",
        Human => "human",
        Mixed => "mixed",
        Unknown => "unknown",
    }
}

fn pdf_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

fn extract_name_value(text: &str, key: &str) -> Option<String> {
    let start = text.find(key)? + key.len();
    let rest = text[start..].trim_start();
    let rest = rest.strip_prefix('(')?;
    let end = rest.find(')')?;
    Some(rest[..end].to_string())
}

/// Locate the last `trailer` dictionary and the most recent `startxref`
/// offset, extracting `/Root`, `/Info`, and `/Size`.
fn locate_trailer(bytes: &[u8]) -> Result<Trailer> {
    let text = String::from_utf8_lossy(bytes);

    let trailer_pos = text
        .rfind("trailer")
        .ok_or_else(|| ElaraError::ContainerDecodeError("PDF missing trailer".into()))?;
    let dict_start = text[trailer_pos..]
        .find("<<")
        .map(|i| trailer_pos + i)
        .ok_or_else(|| ElaraError::ContainerDecodeError("malformed PDF trailer".into()))?;
    let dict_end = text[dict_start..]
        .find(">>")
        .map(|i| dict_start + i + 2)
        .ok_or_else(|| ElaraError::ContainerDecodeError("malformed PDF trailer".into()))?;
    let dict = &text[dict_start..dict_end];

    let root = extract_ref(dict, "/Root")
        .ok_or_else(|| ElaraError::ContainerDecodeError("PDF trailer missing /Root".into()))?;
    let info = extract_ref(dict, "/Info");
    let max_obj_num = extract_int(dict, "/Size")
        .map(|size| size.saturating_sub(1) as u32)
        .unwrap_or(root.num.max(info.map(|r| r.num).unwrap_or(0)));

    let startxref_pos = text
        .rfind("startxref")
        .ok_or_else(|| ElaraError::ContainerDecodeError("PDF missing startxref".into()))?;
    let prev_startxref = text[startxref_pos + "startxref".len()..]
        .trim_start()
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<u64>().ok())
        .ok_or_else(|| ElaraError::ContainerDecodeError("malformed startxref".into()))?;

    Ok(Trailer { root, info, max_obj_num, prev_startxref })
}

fn extract_ref(dict: &str, key: &str) -> Option<ObjRef> {
    let start = dict.find(key)? + key.len();
    let mut tokens = dict[start..].split_whitespace();
    let num: u32 = tokens.next()?.parse().ok()?;
    let generation: u16 = tokens.next()?.parse().ok()?;
    if tokens.next()? != "R" {
        return None;
    }
    Some(ObjRef { num, generation })
}

fn extract_int(dict: &str, key: &str) -> Option<i64> {
    let start = dict.find(key)? + key.len();
    dict[start..].split_whitespace().next()?.parse().ok()
}

/// Locate `"{num} {gen} obj ... endobj"` and return the dictionary body
/// (including its enclosing `<<` `>>`), for objects whose body is a single
/// dictionary (true of every PDF `/Catalog`).
fn locate_object_dict(bytes: &[u8], obj: ObjRef) -> Result<String> {
    let text = String::from_utf8_lossy(bytes);
    let needle = format!("{} {} obj", obj.num, obj.generation);
    let start = text
        .find(&needle)
        .ok_or_else(|| ElaraError::ContainerDecodeError(format!("object {needle} not found")))?;
    let body_start = start + needle.len();
    let end = text[body_start..]
        .find("endobj")
        .map(|i| body_start + i)
        .ok_or_else(|| ElaraError::ContainerDecodeError(format!("object {needle} unterminated")))?;
    Ok(text[body_start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_parens_and_backslash() {
        assert_eq!(pdf_escape("a(b)c\\d"), "a\\(b\\)c\\\\d");
    }

    #[test]
    fn extract_name_value_reads_parenthesized_string() {
        let text = "<< /ElaraGenerator (elaraSign-test) /Foo (bar) >>";
        assert_eq!(
            extract_name_value(text, "/ElaraGenerator"),
            Some("elaraSign-test".to_string())
        );
    }

    #[test]
    fn extract_name_value_is_none_when_key_absent() {
        let text = "<< /Foo (bar) >>";
        assert_eq!(extract_name_value(text, "/ElaraGenerator"), None);
    }

    #[test]
    fn splice_catalog_entries_preserves_original_keys_and_closes_dict() {
        let original = "<< /Type /Catalog /Pages 2 0 R >>";
        let metadata = crate::tests_support::sample_metadata();
        let meta_hash_hex = metadata.meta_hash_hex().unwrap();
        let spliced = splice_catalog_entries(original, &metadata, &meta_hash_hex);
        assert!(spliced.starts_with("<< /Type /Catalog /Pages 2 0 R"));
        assert!(spliced.trim_end().ends_with(">>"));
        assert!(spliced.contains("/ElaraSign true"));
    }

    #[test]
    fn splice_catalog_entries_keeps_signature_and_content_hash_distinct() {
        let original = "<< /Type /Catalog >>";
        let metadata = crate::tests_support::sample_metadata();
        let meta_hash_hex = metadata.meta_hash_hex().unwrap();
        assert_ne!(meta_hash_hex, metadata.content_hash);

        let spliced = splice_catalog_entries(original, &metadata, &meta_hash_hex);
        assert!(spliced.contains(&format!("/ElaraSignature ({meta_hash_hex})")));
        assert!(spliced.contains(&format!("/ElaraContentHash ({})", metadata.content_hash)));
    }

    #[test]
    fn locate_trailer_reads_root_info_and_startxref() {
        let pdf = crate::tests_support::minimal_pdf();
        let trailer = locate_trailer(&pdf).unwrap();
        assert_eq!(trailer.root, ObjRef { num: 1, generation: 0 });
        assert!(trailer.prev_startxref > 0);
    }

    #[test]
    fn locate_trailer_rejects_non_pdf_bytes() {
        assert!(locate_trailer(b"not a pdf").is_err());
    }
}

#[cfg(test)]
mod tests_support {
    use elarasign_core::{ContentType, GenerationMethod, MetadataRecord, MetadataRecordBuilder};

    pub fn sample_metadata() -> MetadataRecord {
        MetadataRecordBuilder::new()
            .generator("elaraSign-pdf-test")
            .generated_at("2026-01-01T00:00:00Z")
            .user_fingerprint(elarasign_core::metadata::user_fingerprint("user-1"))
            .key_fingerprint("instance-a")
            .content_type(ContentType::Document)
            .content_hash(elarasign_core::hash::sha256_hex(b"pdf bytes"))
            .character_id("char-1")
            .model_used("elara-writer-1")
            .prompt_hash(elarasign_core::metadata::prompt_hash(None))
            .generation_method(GenerationMethod::Human)
            .build()
            .unwrap()
    }

    pub fn minimal_pdf() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref_offset = out.len();
        out.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
        out.extend_from_slice(b"0000000009 00000 n \n0000000058 00000 n \n");
        out.extend_from_slice(
            format!("trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n")
                .as_bytes(),
        );
        out
    }
}
