//! SHA-256 and HMAC-SHA-256, thin wrappers over `sha2` / `hmac`.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const HASH_LEN: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 over the concatenation of several byte slices, avoiding an
/// intermediate allocation for the transcript.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; HASH_LEN] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}
