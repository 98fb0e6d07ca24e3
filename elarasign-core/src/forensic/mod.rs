// Forensic payload codec: HKDF-SHA256 key derivation plus AES-256-GCM
// encryption of the 17-byte AccountabilityPayload. The derived subkey is
// bound to a caller-supplied salt (the signature's meta_hash) so a single
// master key cannot decrypt payloads across files that happen to share a
// plaintext shape.
//
// Wire layout of the annotation bytes: `iv(12) || ciphertext(17) || tag(16)`
// = 45 bytes total, carried as an opaque blob (base64-encoded by the
// billboard layer, never written into pixels). The spec leaves the tag
// width as an implementation choice; this crate keeps the untruncated
// 16-byte GCM tag rather than inventing a truncation scheme.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{ElaraError, Result};

/// Fixed HKDF info string binding derived keys to this protocol version.
pub const HKDF_INFO: &[u8] = b"elaraSign-forensic-v2";

const IV_LEN: usize = 12;
const PLAINTEXT_LEN: usize = 17;
const TAG_LEN: usize = 16;
const CIPHER_RECORD_LEN: usize = IV_LEN + PLAINTEXT_LEN + TAG_LEN;

/// Platform codes for `AccountabilityPayload::platform_code`. Fixed small
/// enum per `spec.md` §3; `Unknown` covers any value not otherwise listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Web,
    Mobile,
    Api,
    Unknown,
}

impl Platform {
    fn wire_value(self) -> u8 {
        match self {
            Platform::Web => 0,
            Platform::Mobile => 1,
            Platform::Api => 2,
            Platform::Unknown => 255,
        }
    }

    fn from_wire_value(value: u8) -> Self {
        match value {
            0 => Platform::Web,
            1 => Platform::Mobile,
            2 => Platform::Api,
            _ => Platform::Unknown,
        }
    }
}

/// The 17-byte plaintext accountability record: `timestamp(4) ||
/// user_fingerprint_short(8) || ip_bytes(4) || platform_code(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountabilityPayload {
    pub timestamp: u32,
    pub user_fingerprint_short: [u8; 8],
    /// IPv4 octets; `[0,0,0,0]` means unknown.
    pub ip_bytes: [u8; 4],
    pub platform: Platform,
}

impl AccountabilityPayload {
    fn to_bytes(self) -> [u8; PLAINTEXT_LEN] {
        let mut out = [0u8; PLAINTEXT_LEN];
        out[0..4].copy_from_slice(&self.timestamp.to_be_bytes());
        out[4..12].copy_from_slice(&self.user_fingerprint_short);
        out[12..16].copy_from_slice(&self.ip_bytes);
        out[16] = self.platform.wire_value();
        out
    }

    fn from_bytes(bytes: &[u8; PLAINTEXT_LEN]) -> Self {
        let mut timestamp_bytes = [0u8; 4];
        timestamp_bytes.copy_from_slice(&bytes[0..4]);
        let mut user_fingerprint_short = [0u8; 8];
        user_fingerprint_short.copy_from_slice(&bytes[4..12]);
        let mut ip_bytes = [0u8; 4];
        ip_bytes.copy_from_slice(&bytes[12..16]);
        Self {
            timestamp: u32::from_be_bytes(timestamp_bytes),
            user_fingerprint_short,
            ip_bytes,
            platform: Platform::from_wire_value(bytes[16]),
        }
    }
}

/// Pure format check on a master key: 64 lowercase hex characters. Not a
/// proof of possession.
pub fn is_valid_master_key(key: &str) -> bool {
    key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

fn parse_master_key(master_key: &str) -> Result<[u8; 32]> {
    if !is_valid_master_key(master_key) {
        return Err(ElaraError::BadKeyFormat);
    }
    let mut ikm = [0u8; 32];
    for (i, byte) in ikm.iter_mut().enumerate() {
        let hex_pair = &master_key[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(hex_pair, 16).map_err(|_| ElaraError::BadKeyFormat)?;
    }
    Ok(ikm)
}

/// Derive the 32-byte AES key: HKDF-SHA256 with `master_key` as IKM,
/// `salt` (the signature's `meta_hash`) as salt, and the fixed info string.
/// The caller is responsible for zeroizing the returned subkey once the
/// cipher is initialized from it.
fn derive_key(master_key: &mut [u8; 32], salt: &[u8; 32]) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master_key);
    master_key.zeroize();
    let mut subkey = [0u8; 32];
    hk.expand(HKDF_INFO, &mut subkey)
        .map_err(|e| ElaraError::KeyDerivation(format!("HKDF expand error: {e}")))?;
    Ok(subkey)
}

/// Deterministic IV derivation: first 12 bytes of `SHA-256(salt ||
/// timestamp_be)`. Used so re-encrypting the same payload under the same
/// salt and timestamp is reproducible, matching the engine's broader
/// determinism requirements (`spec.md` §5).
fn derive_iv(salt: &[u8; 32], timestamp: u32) -> [u8; IV_LEN] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(timestamp.to_be_bytes());
    let digest = hasher.finalize();
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&digest[..IV_LEN]);
    iv
}

/// Encrypt `payload` under a key derived from `master_key` and `salt`.
/// Returns the 45-byte `iv || ciphertext || tag` annotation record.
pub fn encrypt_accountability(
    payload: AccountabilityPayload,
    master_key: &str,
    salt: &[u8; 32],
) -> Result<Vec<u8>> {
    let mut ikm = parse_master_key(master_key)?;
    let mut subkey = derive_key(&mut ikm, salt)?;
    let iv = derive_iv(salt, payload.timestamp);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&subkey));
    subkey.zeroize();
    let nonce = Nonce::from_slice(&iv);
    let plaintext = payload.to_bytes();
    let sealed = cipher
        .encrypt(nonce, Payload { msg: &plaintext, aad: salt })
        .map_err(|e| ElaraError::KeyDerivation(format!("AES-GCM seal failed: {e}")))?;

    let mut out = Vec::with_capacity(CIPHER_RECORD_LEN);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a `45`-byte annotation record produced by
/// [`encrypt_accountability`]. A wrong master key or any bit-flip in the
/// record fails at tag verification with `ForensicAuthFailed`, leaking no
/// plaintext.
pub fn decrypt_accountability(
    record: &[u8],
    master_key: &str,
    salt: &[u8; 32],
) -> Result<AccountabilityPayload> {
    if record.len() != CIPHER_RECORD_LEN {
        return Err(ElaraError::ForensicAuthFailed);
    }
    let mut ikm = parse_master_key(master_key)?;
    let mut subkey = derive_key(&mut ikm, salt)?;

    let iv = &record[..IV_LEN];
    let sealed = &record[IV_LEN..];

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&subkey));
    subkey.zeroize();
    let nonce = Nonce::from_slice(iv);
    let plaintext = cipher
        .decrypt(nonce, Payload { msg: sealed, aad: salt })
        .map_err(|_| ElaraError::ForensicAuthFailed)?;

    let mut plaintext_bytes = [0u8; PLAINTEXT_LEN];
    plaintext_bytes.copy_from_slice(&plaintext);
    Ok(AccountabilityPayload::from_bytes(&plaintext_bytes))
}
