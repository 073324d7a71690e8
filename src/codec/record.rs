use bytes::{Bytes, BytesMut};

use crate::error::Error;

use super::{ContentType, LEGACY_VERSION_TLS12};

pub const RECORD_HEADER_LEN: usize = 5;
const INNER_PLAINTEXT_BLOCK: usize = 16;
/// 2^14 + 256, the largest payload an encrypted TLS 1.3 record may carry
/// (RFC 8446 §5.2); also larger than any plaintext record this core sends
/// or expects, so it doubles as the one bound `read_record_header` enforces.
pub const MAX_RECORD_PAYLOAD_LEN: usize = (1 << 14) + 256;

pub struct RecordHeader {
    pub content_type: ContentType,
    pub length: u16,
}

/// Parses a 5-byte outer record header. The legacy record version is
/// checked for the `0x0303` value every post-ClientHello TLS 1.3 record
/// uses; callers that must tolerate a ClientHello's `0x0301` compatibility
/// value do so before calling this.
pub fn read_record_header(bytes: &[u8; RECORD_HEADER_LEN]) -> Result<RecordHeader, Error> {
    let content_type = ContentType::from_u8(bytes[0])
        .ok_or_else(|| Error::decode("unknown record content type"))?;
    if bytes[1] != (LEGACY_VERSION_TLS12 >> 8) as u8 || bytes[2] != LEGACY_VERSION_TLS12 as u8 {
        return Err(Error::decode("unexpected record legacy_record_version"));
    }
    let length = u16::from_be_bytes([bytes[3], bytes[4]]);
    if length as usize > MAX_RECORD_PAYLOAD_LEN {
        return Err(Error::decode("record length exceeds the maximum TLS 1.3 payload"));
    }
    Ok(RecordHeader { content_type, length })
}

pub fn encode_record_header(content_type: ContentType, length: u16) -> [u8; RECORD_HEADER_LEN] {
    let version = LEGACY_VERSION_TLS12.to_be_bytes();
    [content_type as u8, version[0], version[1], (length >> 8) as u8, length as u8]
}

/// Builds a TLS 1.3 inner plaintext: `content || content_type || zero
/// padding` out to the next 16-byte boundary. No padding is added beyond
/// the type byte when the content already lands on a boundary.
pub fn encode_inner_plaintext(content: &[u8], content_type: ContentType) -> BytesMut {
    let mut buf = BytesMut::with_capacity(content.len() + INNER_PLAINTEXT_BLOCK);
    buf.extend_from_slice(content);
    buf.extend_from_slice(&[content_type as u8]);

    let remainder = buf.len() % INNER_PLAINTEXT_BLOCK;
    if remainder != 0 {
        let pad = INNER_PLAINTEXT_BLOCK - remainder;
        buf.extend_from_slice(&vec![0u8; pad]);
    }
    buf
}

/// Recovers `(content, content_type)` from a decrypted inner plaintext by
/// scanning back from the end past zero-padding to the first non-zero byte.
pub fn decode_inner_plaintext(inner: &[u8]) -> Result<(&[u8], ContentType), Error> {
    let type_pos = inner
        .iter()
        .rposition(|&b| b != 0)
        .ok_or_else(|| Error::decode("inner plaintext is all padding"))?;
    let content_type = ContentType::from_u8(inner[type_pos])
        .ok_or_else(|| Error::decode("inner plaintext content type is unknown"))?;
    Ok((&inner[..type_pos], content_type))
}

/// Splits a handshake record's plaintext into individual
/// `type || uint24(len) || body` messages. Each returned `Bytes` carries its
/// own header so the transcript can append messages verbatim.
pub fn split_handshake_messages(plaintext: &Bytes) -> Result<Vec<Bytes>, Error> {
    let mut messages = Vec::new();
    let mut pos = 0usize;

    while pos < plaintext.len() {
        if plaintext.len() - pos < 4 {
            return Err(Error::decode("handshake message header straddles record boundary"));
        }
        let len = ((plaintext[pos + 1] as usize) << 16)
            | ((plaintext[pos + 2] as usize) << 8)
            | plaintext[pos + 3] as usize;
        let end = pos + 4 + len;
        if end > plaintext.len() {
            return Err(Error::decode("handshake message body straddles record boundary"));
        }
        messages.push(plaintext.slice(pos..end));
        pos = end;
    }

    Ok(messages)
}
