//! Per-connection state: the X25519 keypair, running transcript, key
//! schedule, and the four `RecordAead` slots it produces along the way.
//!
//! `Context` is `!Sync` by construction intent: every method that mutates
//! it takes `&mut self`, so two tasks can never drive the same connection's
//! key schedule concurrently. This crate does not assert that with a
//! marker type, matching the host stack's preference for ordinary
//! ownership over sealed traits.

use bytes::Bytes;
use zeroize::Zeroize;

use crate::error::Error;
use crate::primitives::random::EntropySource;
use crate::primitives::x25519;
use crate::record_aead::RecordAead;
use crate::schedule::{ApplicationKeys, HandshakeKeys, HandshakeSecret, KeySchedule};
use crate::transcript::Transcript;

/// Seam for certificate-chain and hostname validation. The default
/// `NoVerification` impl accepts anything; real validation is a production
/// fork's concern, not this crate's (see SPEC_FULL.md §1/§6).
pub trait CertificateVerifier {
    /// Called with the raw `Certificate` and `CertificateVerify` handshake
    /// message bodies, in that order, as they are decrypted. The return
    /// value is not acted on beyond logging in this crate — wiring a real
    /// verifier's answer into the handshake's pass/fail outcome is left to
    /// the caller's fork.
    fn verify(&mut self, certificate: &[u8], certificate_verify: &[u8]) -> Result<(), Error>;
}

/// Accepts any certificate chain unchecked. **Insecure** — exists only as
/// the default seam filler; a caller connecting to anything but a trusted
/// test server must supply a real verifier.
#[derive(Default, Clone, Copy)]
pub struct NoVerification;

impl CertificateVerifier for NoVerification {
    fn verify(&mut self, _certificate: &[u8], _certificate_verify: &[u8]) -> Result<(), Error> {
        Ok(())
    }
}

pub struct Context {
    pub(crate) client_private: [u8; 32],
    pub(crate) client_public: [u8; 32],
    pub(crate) transcript: Transcript,
    schedule: Option<KeySchedule>,
    handshake_secret: Option<HandshakeSecret>,
    pub(crate) shared_secret: Option<[u8; 32]>,
    pub(crate) handshake_aead_c2s: Option<RecordAead>,
    pub(crate) handshake_aead_s2c: Option<RecordAead>,
    pub(crate) app_aead_c2s: Option<RecordAead>,
    pub(crate) app_aead_s2c: Option<RecordAead>,
    entropy: Box<dyn EntropySource + Send>,
}

impl Context {
    pub fn new(mut entropy: impl EntropySource + Send + 'static) -> Self {
        let mut client_private = [0u8; 32];
        entropy.fill(&mut client_private);
        let client_public = x25519::base_point_mult(&client_private);

        Self {
            client_private,
            client_public,
            transcript: Transcript::new(),
            schedule: Some(KeySchedule::new()),
            handshake_secret: None,
            shared_secret: None,
            handshake_aead_c2s: None,
            handshake_aead_s2c: None,
            app_aead_c2s: None,
            app_aead_s2c: None,
            entropy: Box::new(entropy),
        }
    }

    pub(crate) fn append_to_transcript(&mut self, message: Bytes) {
        self.transcript.push(message);
    }

    /// Fills `buf` from the same injected entropy source the private key
    /// was drawn from, so ClientHello's `random`/`legacy_session_id` stay
    /// testable via injection rather than reaching for a process-global RNG
    /// (see SPEC_FULL.md / DESIGN NOTES "entropy as a capability").
    pub(crate) fn fill_random(&mut self, buf: &mut [u8]) {
        self.entropy.fill(buf);
    }

    /// Phase H1: computes the shared secret from the server's key share and
    /// runs `KeySchedule::into_handshake`. Must be called exactly once,
    /// after ServerHello has been appended to the transcript.
    pub(crate) fn derive_handshake_keys(&mut self, server_public: &[u8; 32]) -> Result<HandshakeKeys, Error> {
        let schedule = self
            .schedule
            .take()
            .ok_or_else(|| Error::state("handshake keys already derived"))?;

        let shared_secret = x25519::mult_scalar(&self.client_private, server_public)?;
        let transcript_hash = self.transcript.hash();
        let (keys, handshake_secret) = schedule.into_handshake(&shared_secret, &transcript_hash);

        self.shared_secret = Some(shared_secret);
        self.handshake_secret = Some(handshake_secret);
        Ok(keys)
    }

    /// Phase H2: runs `HandshakeSecret::into_application` over the
    /// transcript hash through server Finished. Must be called exactly
    /// once, after the client Finished has been computed (but before, or
    /// regardless of, whether it has been appended to the transcript —
    /// see SPEC_FULL.md §4.2).
    pub(crate) fn derive_application_keys(&mut self, transcript_hash: &[u8; 32]) -> Result<ApplicationKeys, Error> {
        let handshake_secret = self
            .handshake_secret
            .take()
            .ok_or_else(|| Error::state("application keys derived before handshake keys"))?;
        Ok(handshake_secret.into_application(transcript_hash))
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.client_private.zeroize();
        if let Some(secret) = self.shared_secret.as_mut() {
            secret.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::random::FixedEntropy;

    #[test]
    fn new_derives_public_key_from_injected_entropy() {
        let ctx = Context::new(FixedEntropy(vec![0x07u8; 32]));
        assert_eq!(ctx.client_public, x25519::base_point_mult(&[0x07u8; 32]));
    }

    #[test]
    fn deriving_application_keys_before_handshake_keys_fails() {
        let mut ctx = Context::new(FixedEntropy(vec![0x01u8; 32]));
        assert!(ctx.derive_application_keys(&[0u8; 32]).is_err());
    }

    #[test]
    fn deriving_handshake_keys_twice_fails() {
        let mut ctx = Context::new(FixedEntropy(vec![0x01u8; 32]));
        let server_public = x25519::base_point_mult(&[0x02u8; 32]);
        assert!(ctx.derive_handshake_keys(&server_public).is_ok());
        assert!(ctx.derive_handshake_keys(&server_public).is_err());
    }
}
