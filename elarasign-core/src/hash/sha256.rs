// SHA-256 hashing: one-shot and streaming.

use sha2::{Digest, Sha256};

/// SHA-256 hash of `data`, returning a 32-byte digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// SHA-256 hash of `data`, returning 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_lower(&sha256(data))
}

/// Incremental SHA-256 hasher for content that arrives in chunks (e.g.
/// streamed upload bodies at a caller's HTTP boundary).
pub struct Sha256Stream {
    inner: Sha256,
}

impl Sha256Stream {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    /// Finalize the stream, returning the 32-byte digest.
    pub fn finalize(self) -> [u8; 32] {
        let result = self.inner.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Finalize the stream, returning 64 lowercase hex characters.
    pub fn finalize_hex(self) -> String {
        hex_lower(&self.finalize())
    }
}

impl Default for Sha256Stream {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
