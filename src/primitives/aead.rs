//! ChaCha20-Poly1305 AEAD (RFC 8439), via the `chacha20poly1305` crate.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

use crate::error::Error;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// `seal(key, nonce, aad, plaintext) -> ciphertext||tag`.
pub fn seal(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], aad: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .expect("ChaCha20-Poly1305 sealing cannot fail for valid key/nonce lengths")
}

/// `open(key, nonce, aad, ciphertext||tag) -> plaintext`, `Err(Error::Auth)` on
/// tag mismatch. Never returns partial plaintext on failure.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext_and_tag: &[u8],
) -> Result<Vec<u8>, Error> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload { msg: ciphertext_and_tag, aad },
        )
        .map_err(|_| Error::Auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S4: RFC 8439 §2.8.2 worked example.
    #[test]
    fn matches_rfc8439_test_vector() {
        let key: [u8; 32] = hex_array(
            "808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f",
        );
        let nonce: [u8; 12] = {
            let b = hex::decode("070000004041424344454647").unwrap();
            let mut out = [0u8; 12];
            out.copy_from_slice(&b);
            out
        };
        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();
        let plaintext = b"Ladies and Gentlemen of the class of '99: \
If I could offer you only one tip for the future, sunscreen would be it.";

        let expected_ciphertext = hex::decode(concat!(
            "d31a8d34648e60db7b86afbc53ef7ec2",
            "a4aded51296e08fea9e2b5a736ee62d6",
            "3dbea45e8ca9671282fafb69da92728b",
            "1a71de0a9e060b2905d6a5b67ecd3b36",
            "92ddbd7f2d778b8c9803aee328091b58",
            "fab324e4fad675945585808b4831d7bc",
            "3ff4def08e4b7a9de576d26586cec64b",
            "6116",
        ))
        .unwrap();
        let expected_tag =
            hex::decode("1ae10b594f09e26a7e902ecbd0600691").unwrap();

        let sealed = seal(&key, &nonce, &aad, plaintext);
        assert_eq!(sealed.len(), expected_ciphertext.len() + expected_tag.len());
        assert_eq!(&sealed[..expected_ciphertext.len()], &expected_ciphertext[..]);
        assert_eq!(&sealed[expected_ciphertext.len()..], &expected_tag[..]);

        let opened = open(&key, &nonce, &aad, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    /// Property 3: seal/open round-trip with a monotonically incrementing
    /// sequence-derived nonce, many records in a row.
    #[test]
    fn round_trips_with_incrementing_sequence() {
        let key = [0x42u8; 32];
        let base_iv = [0x24u8; 12];
        for seq in 0u64..16 {
            let mut nonce = base_iv;
            let seq_be = seq.to_be_bytes();
            for i in 0..8 {
                nonce[4 + i] ^= seq_be[i];
            }
            let plaintext = format!("record number {seq}");
            let sealed = seal(&key, &nonce, b"aad", plaintext.as_bytes());
            let opened = open(&key, &nonce, b"aad", &sealed).unwrap();
            assert_eq!(opened, plaintext.as_bytes());
        }
    }

    /// Property 6: flipping a ciphertext or AAD bit causes AuthError.
    #[test]
    fn bit_flip_in_ciphertext_fails_auth() {
        let key = [0x11u8; 32];
        let nonce = [0x22u8; 12];
        let mut sealed = seal(&key, &nonce, b"aad", b"hello");
        sealed[0] ^= 0x01;
        assert!(matches!(open(&key, &nonce, b"aad", &sealed), Err(Error::Auth)));
    }

    #[test]
    fn bit_flip_in_aad_fails_auth() {
        let key = [0x11u8; 32];
        let nonce = [0x22u8; 12];
        let sealed = seal(&key, &nonce, b"aad", b"hello");
        assert!(matches!(open(&key, &nonce, b"aaX", &sealed), Err(Error::Auth)));
    }

    fn hex_array(s: &str) -> [u8; 32] {
        let bytes = hex::decode(s).unwrap();
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        out
    }
}
