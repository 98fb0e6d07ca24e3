// elaraSign core — raster-image content provenance engine.
//
// Crate root: module declarations and public re-exports.

pub mod api;
pub mod billboard;
pub mod canvas;
pub mod error;
pub mod forensic;
pub mod hash;
pub mod locations;
pub mod lsb;
pub mod metadata;
pub mod signature;
pub mod spectrum;

pub use api::{
    forensic_unlock, has_signature, read_signature, sign_image, verify_image, ForensicContext,
    Integrity, ReadReport, SignReport, VerifyReport,
};
pub use error::{ElaraError, Result};
pub use metadata::{ContentType, GenerationMethod, MetadataRecord, MetadataRecordBuilder};
