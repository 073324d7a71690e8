//! HKDF-Extract/Expand, `HKDF-Expand-Label`, `Derive-Secret`, and the TLS 1.3
//! key-schedule phase transitions of RFC 8446 §7.
//!
//! `KeySchedule` is consumed and re-created at each phase transition
//! (`into_handshake`, `into_application`) so that calling a transition twice,
//! or out of order, is a type error at the call site rather than a runtime
//! assertion — [`crate::context::Context`] is the only caller and drives the
//! transitions in the order §4.2 requires.

use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::primitives::aead::KEY_LEN;
use crate::primitives::hash::{hmac_sha256, sha256, HASH_LEN};
use crate::record_aead::RecordAead;

const TLS13_LABEL_PREFIX: &[u8] = b"tls13 ";

fn hkdf_expand_label(secret: &[u8; HASH_LEN], label: &[u8], context: &[u8], out: &mut [u8]) {
    let mut info = Vec::with_capacity(2 + 1 + TLS13_LABEL_PREFIX.len() + label.len() + 1 + context.len());
    info.extend_from_slice(&(out.len() as u16).to_be_bytes());
    let full_label_len = TLS13_LABEL_PREFIX.len() + label.len();
    info.push(full_label_len as u8);
    info.extend_from_slice(TLS13_LABEL_PREFIX);
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    Hkdf::<Sha256>::from_prk(secret)
        .expect("32-byte PRK is always valid for HKDF-SHA256")
        .expand(&info, out)
        .expect("requested output length never exceeds HKDF-SHA256's 255*32 byte limit");
}

fn derive_secret(secret: &[u8; HASH_LEN], label: &[u8], messages: &[u8]) -> [u8; HASH_LEN] {
    let context = sha256(messages);
    let mut out = [0u8; HASH_LEN];
    hkdf_expand_label(secret, label, &context, &mut out);
    out
}

fn traffic_key_iv(secret: &[u8; HASH_LEN]) -> ([u8; KEY_LEN], [u8; 12]) {
    let mut key = [0u8; KEY_LEN];
    hkdf_expand_label(secret, b"key", &[], &mut key);
    let mut iv = [0u8; 12];
    hkdf_expand_label(secret, b"iv", &[], &mut iv);
    (key, iv)
}

fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; HASH_LEN] {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    prk.into()
}

/// Traffic secrets and ciphers produced by a handshake-phase transition.
///
/// The traffic secrets are wrapped in [`Zeroizing`] rather than given to this
/// struct via a manual `Drop` impl: `engine.rs` moves `handshake_aead_c2s`/
/// `handshake_aead_s2c` out of a `HandshakeKeys` by value once the handshake
/// keys are derived, which a struct-level `Drop` impl would make illegal
/// (E0509, partial move out of a `Drop` type). `Zeroizing` zeroizes its
/// contents on its own drop instead, so each field cleans up independently of
/// how the rest of the struct is consumed.
pub struct HandshakeKeys {
    pub client_hs_traffic_secret: Zeroizing<[u8; HASH_LEN]>,
    pub server_hs_traffic_secret: Zeroizing<[u8; HASH_LEN]>,
    pub handshake_aead_c2s: RecordAead,
    pub handshake_aead_s2c: RecordAead,
}

/// Traffic secrets and ciphers produced by the application-phase transition.
/// See [`HandshakeKeys`] for why the secrets are `Zeroizing` fields rather
/// than a struct-level `Drop` impl.
pub struct ApplicationKeys {
    pub client_app_traffic_secret: Zeroizing<[u8; HASH_LEN]>,
    pub server_app_traffic_secret: Zeroizing<[u8; HASH_LEN]>,
    pub app_aead_c2s: RecordAead,
    pub app_aead_s2c: RecordAead,
}

pub struct KeySchedule {
    early_secret: [u8; HASH_LEN],
}

impl KeySchedule {
    /// Phase H0: `early_secret = HKDF-Extract(0^32, PSK=0^32)`. No PSK
    /// support (out of scope), so the IKM is always the zero key.
    pub fn new() -> Self {
        let early_secret = hkdf_extract(&[0u8; HASH_LEN], &[0u8; HASH_LEN]);
        Self { early_secret }
    }

    /// Phase H1, triggered by receipt of ServerHello. `transcript_hash` must
    /// be SHA-256 over exactly ClientHello||ServerHello.
    pub fn into_handshake(
        self,
        shared_secret: &[u8; 32],
        transcript_hash: &[u8; HASH_LEN],
    ) -> (HandshakeKeys, HandshakeSecret) {
        let derived = derive_secret(&self.early_secret, b"derived", &[]);
        let handshake_secret = hkdf_extract(&derived, shared_secret);

        let client_hs_traffic_secret =
            derive_secret_from_hash(&handshake_secret, b"c hs traffic", transcript_hash);
        let server_hs_traffic_secret =
            derive_secret_from_hash(&handshake_secret, b"s hs traffic", transcript_hash);

        let (c_key, c_iv) = traffic_key_iv(&client_hs_traffic_secret);
        let (s_key, s_iv) = traffic_key_iv(&server_hs_traffic_secret);

        (
            HandshakeKeys {
                client_hs_traffic_secret: Zeroizing::new(client_hs_traffic_secret),
                server_hs_traffic_secret: Zeroizing::new(server_hs_traffic_secret),
                handshake_aead_c2s: RecordAead::new(c_key, c_iv),
                handshake_aead_s2c: RecordAead::new(s_key, s_iv),
            },
            HandshakeSecret(handshake_secret),
        )
    }
}

impl Default for KeySchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeySchedule {
    fn drop(&mut self) {
        self.early_secret.zeroize();
    }
}

/// The handshake secret, carried forward from Phase H1 to Phase H2.
pub struct HandshakeSecret([u8; HASH_LEN]);

impl HandshakeSecret {
    /// Phase H2, triggered after server Finished is verified and the client
    /// Finished has been built. `transcript_hash` must be SHA-256 over
    /// exactly the messages through server Finished.
    pub fn into_application(self, transcript_hash: &[u8; HASH_LEN]) -> ApplicationKeys {
        let derived = derive_secret(&self.0, b"derived", &[]);
        let master_secret = hkdf_extract(&derived, &[0u8; HASH_LEN]);

        let client_app_traffic_secret =
            derive_secret_from_hash(&master_secret, b"c ap traffic", transcript_hash);
        let server_app_traffic_secret =
            derive_secret_from_hash(&master_secret, b"s ap traffic", transcript_hash);

        let (c_key, c_iv) = traffic_key_iv(&client_app_traffic_secret);
        let (s_key, s_iv) = traffic_key_iv(&server_app_traffic_secret);

        ApplicationKeys {
            client_app_traffic_secret: Zeroizing::new(client_app_traffic_secret),
            server_app_traffic_secret: Zeroizing::new(server_app_traffic_secret),
            app_aead_c2s: RecordAead::new(c_key, c_iv),
            app_aead_s2c: RecordAead::new(s_key, s_iv),
        }
    }
}

impl Drop for HandshakeSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

fn derive_secret_from_hash(
    secret: &[u8; HASH_LEN],
    label: &[u8],
    transcript_hash: &[u8; HASH_LEN],
) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    hkdf_expand_label(secret, label, transcript_hash, &mut out);
    out
}

/// `Finished.verify_data` for one direction: HMAC keyed by that direction's
/// `finished_key`, over the transcript hash up to (not including) this
/// Finished message.
pub fn verify_data(traffic_secret: &[u8; HASH_LEN], transcript_hash: &[u8; HASH_LEN]) -> [u8; HASH_LEN] {
    let mut finished_key = [0u8; HASH_LEN];
    hkdf_expand_label(traffic_secret, b"finished", &[], &mut finished_key);
    hmac_sha256(&finished_key, transcript_hash)
}

/// Recomputes `verify_data` for `traffic_secret`/`transcript_hash` and
/// compares it against `received` in constant time. `Err(Error::Auth)` on
/// mismatch, matching an AEAD tag failure's error channel.
pub fn verify_finished(
    traffic_secret: &[u8; HASH_LEN],
    transcript_hash: &[u8; HASH_LEN],
    received: &[u8; HASH_LEN],
) -> Result<(), crate::error::Error> {
    let expected = verify_data(traffic_secret, transcript_hash);
    if expected.ct_eq(received).into() {
        Ok(())
    } else {
        Err(crate::error::Error::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S2: RFC 8446 Appendix A worked example.
    #[test]
    fn early_secret_matches_rfc8446_appendix_a() {
        let schedule = KeySchedule::new();
        let bytes = hex::decode(
            "33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a",
        )
        .unwrap();
        let mut expected = [0u8; 32];
        expected.copy_from_slice(&bytes);
        assert_eq!(schedule.early_secret, expected);
    }

    /// Law 1: Derive-Secret is HKDF-Expand-Label keyed by the transcript hash.
    #[test]
    fn derive_secret_equals_expand_label_over_transcript_hash() {
        let secret = [0x7eu8; HASH_LEN];
        let transcript = b"client-hello || server-hello";
        let via_derive_secret = derive_secret(&secret, b"c hs traffic", transcript);

        let context = sha256(transcript);
        let mut via_expand_label = [0u8; HASH_LEN];
        hkdf_expand_label(&secret, b"c hs traffic", &context, &mut via_expand_label);

        assert_eq!(via_derive_secret, via_expand_label);
    }

    /// Property 7: client and server verify_data agree iff the transcript
    /// hash used is the same.
    #[test]
    fn verify_data_agrees_only_for_matching_transcript() {
        let secret = [0x11u8; HASH_LEN];
        let hash_a = sha256(b"transcript a");
        let hash_b = sha256(b"transcript b");
        assert_eq!(verify_data(&secret, &hash_a), verify_data(&secret, &hash_a));
        assert_ne!(verify_data(&secret, &hash_a), verify_data(&secret, &hash_b));
    }

    #[test]
    fn verify_finished_rejects_wrong_verify_data() {
        let secret = [0x33u8; HASH_LEN];
        let hash = sha256(b"transcript");
        let received = verify_data(&secret, &hash);
        assert!(verify_finished(&secret, &hash, &received).is_ok());

        let mut wrong = received;
        wrong[0] ^= 0x01;
        assert!(verify_finished(&secret, &hash, &wrong).is_err());
    }

    /// End-to-end phase transitions stay internally consistent: a client and
    /// a server deriving from the same shared secret and transcript land on
    /// identical traffic secrets.
    #[test]
    fn handshake_and_application_phases_are_symmetric() {
        let shared_secret = [0x55u8; 32];
        let sh_transcript_hash = sha256(b"ClientHello || ServerHello");
        let fin_transcript_hash =
            sha256(b"ClientHello || ServerHello || EE || Cert || CertVerify || ServerFinished");

        let (client_keys, client_hs_secret) =
            KeySchedule::new().into_handshake(&shared_secret, &sh_transcript_hash);
        let (server_keys, server_hs_secret) =
            KeySchedule::new().into_handshake(&shared_secret, &sh_transcript_hash);

        assert_eq!(
            client_keys.client_hs_traffic_secret,
            server_keys.client_hs_traffic_secret
        );
        assert_eq!(
            client_keys.server_hs_traffic_secret,
            server_keys.server_hs_traffic_secret
        );

        let client_app = client_hs_secret.into_application(&fin_transcript_hash);
        let server_app = server_hs_secret.into_application(&fin_transcript_hash);
        assert_eq!(
            client_app.client_app_traffic_secret,
            server_app.client_app_traffic_secret
        );
        assert_eq!(
            client_app.server_app_traffic_secret,
            server_app.server_app_traffic_secret
        );
    }
}
