// Deterministic {-1, +1} pseudo-random sequence, keyed off meta_hash.
//
// A ChaCha-based stream is used so that the sequence is reproducible from
// the seed alone across runs, platforms, and thread counts -- the same
// requirement the signature and content hashes already satisfy.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Derive a `{-1, +1}` sequence of `length` samples from `meta_hash`
/// (the full 32-byte digest is used directly as the ChaCha20 seed).
pub fn generate(meta_hash: &[u8; 32], length: usize) -> Vec<f32> {
    let mut rng = ChaCha20Rng::from_seed(*meta_hash);
    let mut out = Vec::with_capacity(length);
    for _ in 0..length {
        let bit = rng.next_u32() & 1;
        out.push(if bit == 1 { 1.0 } else { -1.0 });
    }
    out
}
