// Hash / CRC primitives module declarations.

pub mod crc32;
pub mod sha256;

pub use crc32::crc32;
pub use sha256::{sha256, sha256_hex, Sha256Stream};
