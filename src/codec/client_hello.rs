use bytes::{BufMut, Bytes, BytesMut};

use super::{
    HandshakeType, CIPHER_SUITE_CHACHA20_POLY1305_SHA256, GROUP_X25519, LEGACY_VERSION_TLS12,
    LEGACY_VERSION_TLS13,
};

const EXT_SERVER_NAME: u16 = 0;
const EXT_SUPPORTED_GROUPS: u16 = 10;
const EXT_SIGNATURE_ALGORITHMS: u16 = 13;
const EXT_SUPPORTED_VERSIONS: u16 = 43;
const EXT_KEY_SHARE: u16 = 51;

const SIG_ECDSA_SECP256R1_SHA256: u16 = 0x0403;
const SIG_RSA_PSS_RSAE_SHA256: u16 = 0x0804;

/// Builds the ClientHello handshake message (handshake header included),
/// ready to be appended to the transcript and wrapped in a record.
pub fn build_client_hello(
    client_public: &[u8; 32],
    random: &[u8; 32],
    legacy_session_id: &[u8; 32],
    server_name: Option<&str>,
) -> Bytes {
    let mut body = BytesMut::new();
    body.put_u16(LEGACY_VERSION_TLS12);
    body.put_slice(random);

    body.put_u8(legacy_session_id.len() as u8);
    body.put_slice(legacy_session_id);

    body.put_u16(2); // cipher_suites length
    body.put_u16(CIPHER_SUITE_CHACHA20_POLY1305_SHA256);

    body.put_u8(1); // compression methods length
    body.put_u8(0); // null compression

    let extensions = build_extensions(client_public, server_name);
    body.put_u16(extensions.len() as u16);
    body.put_slice(&extensions);

    wrap_handshake(HandshakeType::ClientHello, &body)
}

fn build_extensions(client_public: &[u8; 32], server_name: Option<&str>) -> BytesMut {
    let mut extensions = BytesMut::new();

    extensions.put_u16(EXT_SUPPORTED_VERSIONS);
    extensions.put_u16(3); // extension_data length
    extensions.put_u8(2); // versions list length
    extensions.put_u16(LEGACY_VERSION_TLS13);

    extensions.put_u16(EXT_SUPPORTED_GROUPS);
    extensions.put_u16(4);
    extensions.put_u16(2); // named_group_list length
    extensions.put_u16(GROUP_X25519);

    extensions.put_u16(EXT_SIGNATURE_ALGORITHMS);
    extensions.put_u16(6);
    extensions.put_u16(4); // supported_signature_algorithms length
    extensions.put_u16(SIG_ECDSA_SECP256R1_SHA256);
    extensions.put_u16(SIG_RSA_PSS_RSAE_SHA256);

    let key_share_entry_len = 2 + 2 + 32; // group + key_exchange length + key
    extensions.put_u16(EXT_KEY_SHARE);
    extensions.put_u16(2 + key_share_entry_len as u16); // extension_data length
    extensions.put_u16(key_share_entry_len as u16); // client_shares list length
    extensions.put_u16(GROUP_X25519);
    extensions.put_u16(32);
    extensions.put_slice(client_public);

    if let Some(name) = server_name {
        let name_bytes = name.as_bytes();
        let server_name_entry_len = 1 + 2 + name_bytes.len();
        extensions.put_u16(EXT_SERVER_NAME);
        extensions.put_u16(2 + server_name_entry_len as u16);
        extensions.put_u16(server_name_entry_len as u16); // server_name_list length
        extensions.put_u8(0); // NameType::host_name
        extensions.put_u16(name_bytes.len() as u16);
        extensions.put_slice(name_bytes);
    }

    extensions
}

pub(crate) fn wrap_handshake(handshake_type: HandshakeType, body: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(4 + body.len());
    message.put_u8(handshake_type as u8);
    let len = body.len() as u32;
    message.put_u8((len >> 16) as u8);
    message.put_u8((len >> 8) as u8);
    message.put_u8(len as u8);
    message.put_slice(body);
    message.freeze()
}
