// Canonical content-provenance metadata object and its derived fingerprints.

use serde::{Deserialize, Serialize};

use crate::error::{ElaraError, Result};
use crate::hash::sha256_hex;

/// Sentinel prompt hash used when no prompt text is available.
/// Fixed so that "no prompt" is distinguishable from any real prompt hash.
pub const NO_PROMPT_SENTINEL: &str = "no-prompt";

/// The content type a [`MetadataRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Document,
    Audio,
    Video,
}

/// How the signed content was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    Ai,
    Human,
    Mixed,
    Unknown,
}

/// Canonical content-provenance object. A `MetadataRecord` is built once per
/// sign call and is immutable thereafter; its canonical JSON serialization
/// is the pre-image of `meta_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub signature_version: String,
    pub generator: String,
    pub generated_at: String,
    pub user_fingerprint: String,
    pub key_fingerprint: String,
    pub content_type: ContentType,
    pub content_hash: String,
    pub character_id: String,
    pub model_used: String,
    pub prompt_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub generation_method: GenerationMethod,
}

/// The signature protocol version written into every `MetadataRecord`.
pub const SIGNATURE_VERSION: &str = "2.0";

impl MetadataRecord {
    /// Validate the textual fields every consumer depends on being
    /// well-formed: all hash fields must be 64 lowercase hex characters, and
    /// ASCII-only fields must in fact be ASCII. This is the `BadMetadata`
    /// check referenced by `spec.md` §7.
    pub fn validate(&self) -> Result<()> {
        if self.signature_version != SIGNATURE_VERSION {
            return Err(ElaraError::BadMetadata(format!(
                "unsupported signature_version: {}",
                self.signature_version
            )));
        }
        if !self.generator.is_ascii() {
            return Err(ElaraError::BadMetadata("generator must be ASCII".into()));
        }
        if !self.character_id.is_ascii() {
            return Err(ElaraError::BadMetadata("character_id must be ASCII".into()));
        }
        if !self.model_used.is_ascii() {
            return Err(ElaraError::BadMetadata("model_used must be ASCII".into()));
        }
        if !self.key_fingerprint.is_ascii() {
            return Err(ElaraError::BadMetadata("key_fingerprint must be ASCII".into()));
        }
        validate_hex64(&self.user_fingerprint, "user_fingerprint")?;
        validate_hex64(&self.content_hash, "content_hash")?;
        validate_hex64(&self.prompt_hash, "prompt_hash")?;
        Ok(())
    }

    /// Canonical JSON serialization: sorted keys, UTF-8, no insignificant
    /// whitespace, absent optional fields omitted. This exact byte form is
    /// the pre-image of `meta_hash`.
    ///
    /// Sorted-key ordering falls out of `serde_json::Value`'s map
    /// representation (a `BTreeMap` unless the `preserve_order` feature is
    /// enabled, which this crate does not enable) rather than any manual
    /// sort.
    pub fn canonical_json_bytes(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(self)
            .map_err(|e| ElaraError::BadMetadata(format!("canonicalization failed: {e}")))?;
        serde_json::to_vec(&value)
            .map_err(|e| ElaraError::BadMetadata(format!("canonicalization failed: {e}")))
    }

    /// `meta_hash = sha256(canonical_json_bytes)`, as 32 raw bytes.
    pub fn meta_hash(&self) -> Result<[u8; 32]> {
        Ok(crate::hash::sha256(&self.canonical_json_bytes()?))
    }

    /// `meta_hash` as 64 lowercase hex characters.
    pub fn meta_hash_hex(&self) -> Result<String> {
        Ok(sha256_hex(&self.canonical_json_bytes()?))
    }
}

/// `user_fingerprint(user_id) = sha256_hex(user_id)`.
pub fn user_fingerprint(user_id: &str) -> String {
    sha256_hex(user_id.as_bytes())
}

/// `prompt_hash(prompt_text) = sha256_hex(prompt_text)`, or the fixed
/// sentinel hash for the absent-prompt case.
pub fn prompt_hash(prompt_text: Option<&str>) -> String {
    match prompt_text {
        Some(text) => sha256_hex(text.as_bytes()),
        None => sha256_hex(NO_PROMPT_SENTINEL.as_bytes()),
    }
}

fn validate_hex64(s: &str, field: &str) -> Result<()> {
    if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        return Err(ElaraError::BadMetadata(format!(
            "{field} must be 64 lowercase hex characters"
        )));
    }
    Ok(())
}

/// Fluent builder for [`MetadataRecord`], in the shape of the teacher
/// crate's certificate builders: required fields are checked at `build()`,
/// not at each setter call.
#[derive(Debug, Default)]
pub struct MetadataRecordBuilder {
    generator: Option<String>,
    generated_at: Option<String>,
    user_fingerprint: Option<String>,
    key_fingerprint: Option<String>,
    content_type: Option<ContentType>,
    content_hash: Option<String>,
    character_id: Option<String>,
    model_used: Option<String>,
    prompt_hash: Option<String>,
    seed: Option<u64>,
    generation_method: Option<GenerationMethod>,
}

impl MetadataRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generator(mut self, v: impl Into<String>) -> Self {
        self.generator = Some(v.into());
        self
    }

    pub fn generated_at(mut self, v: impl Into<String>) -> Self {
        self.generated_at = Some(v.into());
        self
    }

    pub fn user_fingerprint(mut self, v: impl Into<String>) -> Self {
        self.user_fingerprint = Some(v.into());
        self
    }

    pub fn key_fingerprint(mut self, v: impl Into<String>) -> Self {
        self.key_fingerprint = Some(v.into());
        self
    }

    pub fn content_type(mut self, v: ContentType) -> Self {
        self.content_type = Some(v);
        self
    }

    pub fn content_hash(mut self, v: impl Into<String>) -> Self {
        self.content_hash = Some(v.into());
        self
    }

    pub fn character_id(mut self, v: impl Into<String>) -> Self {
        self.character_id = Some(v.into());
        self
    }

    pub fn model_used(mut self, v: impl Into<String>) -> Self {
        self.model_used = Some(v.into());
        self
    }

    pub fn prompt_hash(mut self, v: impl Into<String>) -> Self {
        self.prompt_hash = Some(v.into());
        self
    }

    pub fn seed(mut self, v: u64) -> Self {
        self.seed = Some(v);
        self
    }

    pub fn generation_method(mut self, v: GenerationMethod) -> Self {
        self.generation_method = Some(v);
        self
    }

    pub fn build(self) -> Result<MetadataRecord> {
        let record = MetadataRecord {
            signature_version: SIGNATURE_VERSION.to_string(),
            generator: self
                .generator
                .ok_or_else(|| ElaraError::BadMetadata("generator is required".into()))?,
            generated_at: self
                .generated_at
                .ok_or_else(|| ElaraError::BadMetadata("generated_at is required".into()))?,
            user_fingerprint: self
                .user_fingerprint
                .ok_or_else(|| ElaraError::BadMetadata("user_fingerprint is required".into()))?,
            key_fingerprint: self
                .key_fingerprint
                .ok_or_else(|| ElaraError::BadMetadata("key_fingerprint is required".into()))?,
            content_type: self
                .content_type
                .ok_or_else(|| ElaraError::BadMetadata("content_type is required".into()))?,
            content_hash: self
                .content_hash
                .ok_or_else(|| ElaraError::BadMetadata("content_hash is required".into()))?,
            character_id: self
                .character_id
                .ok_or_else(|| ElaraError::BadMetadata("character_id is required".into()))?,
            model_used: self
                .model_used
                .ok_or_else(|| ElaraError::BadMetadata("model_used is required".into()))?,
            prompt_hash: self
                .prompt_hash
                .unwrap_or_else(|| prompt_hash(None)),
            seed: self.seed,
            generation_method: self
                .generation_method
                .ok_or_else(|| ElaraError::BadMetadata("generation_method is required".into()))?,
        };
        record.validate()?;
        Ok(record)
    }
}
