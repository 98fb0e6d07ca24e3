// elaraSign error types

use thiserror::Error;

/// Top-level error type for the elaraSign image core.
///
/// Sign and verify prefer structured result objects over thrown failures
/// (see `crate::api`); variants here are reserved for programmer error and
/// unrecoverable input, never for per-location or per-layer findings that
/// belong in a report.
#[derive(Debug, Error)]
pub enum ElaraError {
    // -- Sign-time fatal errors --------------------------------------------
    #[error("image too small: {width}x{height}, minimum is 128x128")]
    ImageTooSmall { width: u32, height: u32 },

    #[error("bad metadata: {0}")]
    BadMetadata(String),

    // -- Pixel / embedding errors -------------------------------------------
    #[error("region does not fit buffer: {0}")]
    RegionTooSmall(String),

    #[error("overlapping embedding regions: {0}")]
    RegionOverlap(String),

    // -- Signature codec (non-fatal; surfaced via report, kept for codec API) --
    #[error("bad signature record: {0}")]
    BadSignature(String),

    // -- Forensic payload errors ---------------------------------------------
    #[error("forensic authentication failed")]
    ForensicAuthFailed,

    #[error("bad master key format: expected 64 lowercase hex characters")]
    BadKeyFormat,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    // -- Billboard / container errors ----------------------------------------
    #[error("container decode error: {0}")]
    ContainerDecodeError(String),
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, ElaraError>;
