use crate::error::Error;

use super::{
    HandshakeType, CIPHER_SUITE_CHACHA20_POLY1305_SHA256, GROUP_X25519, LEGACY_VERSION_TLS12,
    LEGACY_VERSION_TLS13,
};

const EXT_SUPPORTED_VERSIONS: u16 = 43;
const EXT_KEY_SHARE: u16 = 51;

pub struct ServerHelloFields {
    pub server_public: [u8; 32],
}

/// Parses a ServerHello handshake message (handshake header included).
///
/// An absent or malformed `key_share` is a fatal decode error; a
/// `supported_versions` extension that doesn't indicate TLS 1.3 is also
/// fatal. Other fields (random, session_id echo, compression) are validated
/// for shape but not otherwise acted on.
pub fn parse_server_hello(message: &[u8]) -> Result<ServerHelloFields, Error> {
    if message.len() < 4 {
        return Err(Error::decode("ServerHello message shorter than handshake header"));
    }
    if message[0] != HandshakeType::ServerHello as u8 {
        return Err(Error::decode("expected ServerHello handshake type"));
    }
    let len = ((message[1] as usize) << 16) | ((message[2] as usize) << 8) | message[3] as usize;
    if message.len() != 4 + len {
        return Err(Error::decode("ServerHello handshake length mismatch"));
    }
    let body = &message[4..];

    let mut pos = 0;
    let legacy_version = read_u16(body, &mut pos)?;
    if legacy_version != LEGACY_VERSION_TLS12 {
        return Err(Error::decode("unexpected ServerHello.legacy_version"));
    }

    pos += 32; // random, not inspected
    if pos > body.len() {
        return Err(Error::decode("ServerHello truncated before random"));
    }

    let session_id_len = read_u8(body, &mut pos)? as usize;
    skip(body, &mut pos, session_id_len)?;

    let cipher_suite = read_u16(body, &mut pos)?;
    if cipher_suite != CIPHER_SUITE_CHACHA20_POLY1305_SHA256 {
        return Err(Error::decode("server selected an unsupported cipher suite"));
    }

    let compression_method = read_u8(body, &mut pos)?;
    if compression_method != 0 {
        return Err(Error::decode("unexpected ServerHello.compression_method"));
    }

    let extensions_len = read_u16(body, &mut pos)? as usize;
    let extensions_end = pos + extensions_len;
    if extensions_end > body.len() {
        return Err(Error::decode("ServerHello extensions length overruns message"));
    }

    let mut server_public: Option<[u8; 32]> = None;
    let mut saw_tls13 = false;

    while pos < extensions_end {
        let ext_type = read_u16(body, &mut pos)?;
        let ext_len = read_u16(body, &mut pos)? as usize;
        if pos + ext_len > extensions_end {
            return Err(Error::decode("extension length overruns extensions block"));
        }
        let ext_data = &body[pos..pos + ext_len];

        match ext_type {
            EXT_KEY_SHARE => {
                if ext_data.len() != 36 {
                    return Err(Error::decode("malformed key_share extension"));
                }
                let group = u16::from_be_bytes([ext_data[0], ext_data[1]]);
                let key_len = u16::from_be_bytes([ext_data[2], ext_data[3]]) as usize;
                if group != GROUP_X25519 || key_len != 32 {
                    return Err(Error::decode("key_share is not a 32-byte X25519 entry"));
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&ext_data[4..36]);
                server_public = Some(key);
            }
            EXT_SUPPORTED_VERSIONS => {
                if ext_data.len() != 2
                    || u16::from_be_bytes([ext_data[0], ext_data[1]]) != LEGACY_VERSION_TLS13
                {
                    return Err(Error::decode("ServerHello did not select TLS 1.3"));
                }
                saw_tls13 = true;
            }
            _ => {}
        }

        pos += ext_len;
    }

    if !saw_tls13 {
        return Err(Error::decode("ServerHello missing supported_versions extension"));
    }

    let server_public = server_public.ok_or_else(|| Error::decode("ServerHello missing key_share extension"))?;
    Ok(ServerHelloFields { server_public })
}

fn read_u8(body: &[u8], pos: &mut usize) -> Result<u8, Error> {
    let b = *body.get(*pos).ok_or_else(|| Error::decode("ServerHello truncated"))?;
    *pos += 1;
    Ok(b)
}

fn read_u16(body: &[u8], pos: &mut usize) -> Result<u16, Error> {
    if *pos + 2 > body.len() {
        return Err(Error::decode("ServerHello truncated"));
    }
    let v = u16::from_be_bytes([body[*pos], body[*pos + 1]]);
    *pos += 2;
    Ok(v)
}

fn skip(body: &[u8], pos: &mut usize, n: usize) -> Result<(), Error> {
    if *pos + n > body.len() {
        return Err(Error::decode("ServerHello truncated"));
    }
    *pos += n;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::client_hello::build_client_hello;

    fn build_server_hello(server_public: &[u8; 32]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&LEGACY_VERSION_TLS12.to_be_bytes());
        body.extend_from_slice(&[0x33u8; 32]); // random
        body.push(0); // session_id echo, empty
        body.extend_from_slice(&CIPHER_SUITE_CHACHA20_POLY1305_SHA256.to_be_bytes());
        body.push(0); // compression

        let mut extensions = Vec::new();
        extensions.extend_from_slice(&EXT_SUPPORTED_VERSIONS.to_be_bytes());
        extensions.extend_from_slice(&2u16.to_be_bytes());
        extensions.extend_from_slice(&LEGACY_VERSION_TLS13.to_be_bytes());

        extensions.extend_from_slice(&EXT_KEY_SHARE.to_be_bytes());
        extensions.extend_from_slice(&36u16.to_be_bytes());
        extensions.extend_from_slice(&GROUP_X25519.to_be_bytes());
        extensions.extend_from_slice(&32u16.to_be_bytes());
        extensions.extend_from_slice(server_public);

        body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
        body.extend_from_slice(&extensions);

        let mut message = vec![HandshakeType::ServerHello as u8];
        let len = body.len() as u32;
        message.push((len >> 16) as u8);
        message.push((len >> 8) as u8);
        message.push(len as u8);
        message.extend_from_slice(&body);
        message
    }

    #[test]
    fn parses_key_share_and_version() {
        let server_public = [0x99u8; 32];
        let message = build_server_hello(&server_public);
        let fields = parse_server_hello(&message).unwrap();
        assert_eq!(fields.server_public, server_public);
    }

    #[test]
    fn rejects_missing_key_share() {
        // A ClientHello has no key_share-with-only-36-byte-entry extension
        // shaped like a ServerHello's, so build a ServerHello by hand with
        // the key_share dropped instead.
        let mut body = Vec::new();
        body.extend_from_slice(&LEGACY_VERSION_TLS12.to_be_bytes());
        body.extend_from_slice(&[0x00u8; 32]);
        body.push(0);
        body.extend_from_slice(&CIPHER_SUITE_CHACHA20_POLY1305_SHA256.to_be_bytes());
        body.push(0);

        let mut extensions = Vec::new();
        extensions.extend_from_slice(&EXT_SUPPORTED_VERSIONS.to_be_bytes());
        extensions.extend_from_slice(&2u16.to_be_bytes());
        extensions.extend_from_slice(&LEGACY_VERSION_TLS13.to_be_bytes());

        body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
        body.extend_from_slice(&extensions);

        let mut message = vec![HandshakeType::ServerHello as u8];
        let len = body.len() as u32;
        message.push((len >> 16) as u8);
        message.push((len >> 8) as u8);
        message.push(len as u8);
        message.extend_from_slice(&body);

        assert!(parse_server_hello(&message).is_err());
    }

    #[test]
    fn client_hello_and_server_hello_codecs_agree_on_wire_constants() {
        // Sanity check that both codecs speak the same cipher suite and
        // group constants, since a mismatch here would silently desync a
        // real handshake against real peers.
        let client_public = [0x01u8; 32];
        let ch = build_client_hello(&client_public, &[0u8; 32], &[0u8; 32], None);
        assert!(ch
            .windows(2)
            .any(|w| w == CIPHER_SUITE_CHACHA20_POLY1305_SHA256.to_be_bytes()));
    }
}
