// Billboard layer: human-readable provenance written into standard
// container metadata fields. Informational only -- its presence without a
// valid LSB or spread-spectrum layer is "metadata only", never treated as
// verified provenance (`spec.md` §4.8).

pub mod jpeg;
pub mod png;

/// Keyword used for the PNG `tEXt`/`zTXt` billboard chunks.
pub const PNG_KEYWORD: &str = "elaraSign:v2";
/// Keyword used for the PNG chunk carrying the base64 forensic ciphertext.
pub const PNG_FORENSIC_KEYWORD: &str = "elaraSign:forensic";
/// Short JPEG `UserComment` prefix for the meta hash, when the full
/// canonical JSON is not desired in the comment field.
pub const JPEG_META_HASH_PREFIX: &str = "elaraSign:metaHash";
