//! X25519 scalar multiplication (RFC 7748), via `x25519-dalek`'s raw API.
//!
//! `x25519_dalek::x25519` already performs the RFC 7748 clamping of the
//! scalar, so these wrappers only add the all-zero-output rejection the
//! RFC recommends but does not mandate.

use crate::error::Error;

/// `X25519(scalar, 9)` — the public key for a given private scalar.
pub fn base_point_mult(scalar: &[u8; 32]) -> [u8; 32] {
    x25519_dalek::x25519(*scalar, x25519_dalek::X25519_BASEPOINT_BYTES)
}

/// `X25519(scalar, u)` — the shared secret for a given private scalar and
/// peer public key. Rejects an all-zero result (RFC 7748 §6.1 SHOULD).
pub fn mult_scalar(scalar: &[u8; 32], u: &[u8; 32]) -> Result<[u8; 32], Error> {
    let out = x25519_dalek::x25519(*scalar, *u);
    if out == [0u8; 32] {
        return Err(Error::decode("X25519 produced a low-order (all-zero) output"));
    }
    Ok(out)
}
