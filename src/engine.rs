//! The handshake and record engine: drives a connection through
//! `Init -> ... -> Established`, then serves `Session::send`/`recv`/`close`.
//!
//! The handshake itself is a straight-line async function rather than a
//! polled state machine: a TLS 1.3 client handshake has exactly one valid
//! path to `Established` (no renegotiation, no HelloRetryRequest in scope),
//! so the `Phase` enum exists to make that path's steps legible and to give
//! `Session` something to guard its post-handshake operations with, not to
//! support re-entrant dispatch.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::codec::alert::{encode_close_notify, is_close_notify, parse_alert};
use crate::codec::client_hello::{build_client_hello, wrap_handshake};
use crate::codec::record::{
    decode_inner_plaintext, encode_inner_plaintext, encode_record_header, read_record_header,
    RECORD_HEADER_LEN,
};
use crate::codec::server_hello::parse_server_hello;
use crate::codec::{ContentType, HandshakeType};
use crate::context::{CertificateVerifier, Context};
use crate::error::Error;
use crate::primitives::aead::TAG_LEN;
use crate::primitives::hash::HASH_LEN;
use crate::record_aead::RecordAead;
use crate::schedule::{verify_data, verify_finished};
use crate::transport::Transport;

/// The connection's current phase. `Session` only permits `send`/`recv` in
/// `Established` and nothing once `Closed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Established,
    Closed,
    Failed,
}

/// An established TLS 1.3 connection: application data in, application
/// data out, until `close`.
pub struct Session<T> {
    transport: T,
    app_aead_c2s: RecordAead,
    app_aead_s2c: RecordAead,
    recv_buf: BytesMut,
    phase: Phase,
}

/// Drives `ctx` and `transport` through the full TLS 1.3 handshake and
/// returns an established `Session`. `server_name` populates the SNI
/// extension when present; `verifier` receives the raw Certificate and
/// CertificateVerify bodies as they arrive (see [`CertificateVerifier`]).
pub async fn connect<T: Transport>(
    mut ctx: Context,
    mut transport: T,
    server_name: Option<&str>,
    mut verifier: impl CertificateVerifier,
) -> Result<Session<T>, Error> {
    let mut random = [0u8; 32];
    let mut session_id = [0u8; 32];
    ctx.fill_random(&mut random);
    ctx.fill_random(&mut session_id);

    let client_hello = build_client_hello(&ctx.client_public, &random, &session_id, server_name);
    write_plaintext_record(&mut transport, ContentType::Handshake, &client_hello).await?;
    ctx.append_to_transcript(client_hello.clone());
    debug!("ClientHello sent");

    let server_hello_message = read_plaintext_handshake_message(&mut transport).await?;
    let server_hello = parse_server_hello(&server_hello_message)?;
    ctx.append_to_transcript(server_hello_message);
    debug!("ServerHello received");

    let handshake_keys = ctx.derive_handshake_keys(&server_hello.server_public)?;
    let mut handshake_aead_c2s = handshake_keys.handshake_aead_c2s;
    let mut handshake_aead_s2c = handshake_keys.handshake_aead_s2c;

    let mut server_finished_seen = false;

    'read_until_finished: loop {
        let (header, body) = read_raw_record(&mut transport).await?;
        if header.content_type == ContentType::ChangeCipherSpec {
            continue;
        }
        if header.content_type != ContentType::ApplicationData {
            return Err(Error::decode("unexpected record type during handshake"));
        }

        let plaintext = handshake_aead_s2c.open(&header.raw, &body)?;
        let (content, content_type) = decode_inner_plaintext(&plaintext)?;
        if content_type != ContentType::Handshake {
            return Err(Error::decode("non-handshake content during handshake"));
        }

        let content = Bytes::copy_from_slice(content);
        let messages = crate::codec::record::split_handshake_messages(&content)?;

        for message in messages {
            if message.is_empty() {
                return Err(Error::decode("empty handshake message"));
            }
            match message[0] {
                t if t == HandshakeType::EncryptedExtensions as u8 => {
                    ctx.append_to_transcript(message);
                }
                t if t == HandshakeType::Certificate as u8 => {
                    if let Err(e) = verifier.verify(&message[4..], &[]) {
                        warn!(error = %e, "certificate verifier rejected Certificate, continuing unchecked");
                    }
                    ctx.append_to_transcript(message);
                }
                t if t == HandshakeType::CertificateVerify as u8 => {
                    if let Err(e) = verifier.verify(&[], &message[4..]) {
                        warn!(error = %e, "certificate verifier rejected CertificateVerify, continuing unchecked");
                    }
                    ctx.append_to_transcript(message);
                }
                t if t == HandshakeType::Finished as u8 => {
                    let finished_hash = ctx.transcript.hash();
                    let received = parse_finished(&message[4..])?;
                    verify_finished(
                        &handshake_keys.server_hs_traffic_secret,
                        &finished_hash,
                        &received,
                    )?;
                    ctx.append_to_transcript(message);
                    server_finished_seen = true;
                    break 'read_until_finished;
                }
                other => {
                    return Err(Error::decode(format!("unexpected handshake message type {other}")));
                }
            }
        }
    }

    debug_assert!(server_finished_seen);
    info!("server Finished verified");

    let transcript_hash_before_client_finished = ctx.transcript.hash();
    let client_verify_data = verify_data(
        &handshake_keys.client_hs_traffic_secret,
        &transcript_hash_before_client_finished,
    );
    let mut client_finished_body = BytesMut::with_capacity(HASH_LEN);
    client_finished_body.extend_from_slice(&client_verify_data);
    let client_finished = wrap_handshake(HandshakeType::Finished, &client_finished_body);
    ctx.append_to_transcript(client_finished.clone());

    write_encrypted_record(
        &mut transport,
        &mut handshake_aead_c2s,
        ContentType::Handshake,
        &client_finished,
    )
    .await?;
    debug!("client Finished sent");

    let application_keys = ctx.derive_application_keys(&transcript_hash_before_client_finished)?;
    info!("handshake complete, application keys derived");

    Ok(Session {
        transport,
        app_aead_c2s: application_keys.app_aead_c2s,
        app_aead_s2c: application_keys.app_aead_s2c,
        recv_buf: BytesMut::new(),
        phase: Phase::Established,
    })
}

fn parse_finished(body: &[u8]) -> Result<[u8; HASH_LEN], Error> {
    if body.len() != HASH_LEN {
        return Err(Error::decode("Finished.verify_data has the wrong length"));
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(body);
    Ok(out)
}

struct RawRecord {
    content_type: ContentType,
    raw: [u8; RECORD_HEADER_LEN],
}

async fn read_raw_record<T: Transport>(transport: &mut T) -> Result<(RawRecord, Vec<u8>), Error> {
    let mut header_bytes = [0u8; RECORD_HEADER_LEN];
    transport.read_exact(&mut header_bytes).await?;
    let header = read_record_header(&header_bytes)?;
    let mut body = vec![0u8; header.length as usize];
    transport.read_exact(&mut body).await?;
    Ok((
        RawRecord { content_type: header.content_type, raw: header_bytes },
        body,
    ))
}

async fn write_plaintext_record<T: Transport>(
    transport: &mut T,
    content_type: ContentType,
    body: &[u8],
) -> Result<(), Error> {
    let header = encode_record_header(content_type, body.len() as u16);
    transport.write_all(&header).await?;
    transport.write_all(body).await?;
    Ok(())
}

async fn write_encrypted_record<T: Transport>(
    transport: &mut T,
    aead: &mut RecordAead,
    content_type: ContentType,
    content: &[u8],
) -> Result<(), Error> {
    let inner = encode_inner_plaintext(content, content_type);
    let sealed_len = inner.len() + TAG_LEN;
    let header = encode_record_header(ContentType::ApplicationData, sealed_len as u16);
    let sealed = aead.seal(&header, &inner)?;
    transport.write_all(&header).await?;
    transport.write_all(&sealed).await?;
    Ok(())
}

/// Reads handshake messages before any AEAD keys exist (ClientHello's
/// reply). `HelloRetryRequest` is out of scope: anything other than a
/// single ServerHello in the first handshake record is an `Error::Decode`.
async fn read_plaintext_handshake_message<T: Transport>(transport: &mut T) -> Result<Bytes, Error> {
    let mut header_bytes = [0u8; RECORD_HEADER_LEN];
    transport.read_exact(&mut header_bytes).await?;
    let header = read_record_header(&header_bytes)?;
    if header.content_type != ContentType::Handshake {
        return Err(Error::decode("expected a plaintext Handshake record for ServerHello"));
    }
    let mut body = vec![0u8; header.length as usize];
    transport.read_exact(&mut body).await?;
    Ok(Bytes::from(body))
}

impl<T: Transport> Session<T> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub async fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.require(Phase::Established)?;
        write_encrypted_record(&mut self.transport, &mut self.app_aead_c2s, ContentType::ApplicationData, data).await
    }

    pub async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.require(Phase::Established)?;

        while self.recv_buf.is_empty() {
            let (header, body) = match read_raw_record(&mut self.transport).await {
                Ok(v) => v,
                Err(Error::Transport(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.phase = Phase::Closed;
                    return Ok(0);
                }
                Err(e) => {
                    self.phase = Phase::Failed;
                    error!(error = %e, "transport read failed, connection failed");
                    return Err(e);
                }
            };

            if header.content_type == ContentType::ChangeCipherSpec {
                continue;
            }
            if header.content_type != ContentType::ApplicationData {
                self.phase = Phase::Failed;
                error!("unexpected plaintext record after handshake, connection failed");
                return Err(Error::decode("unexpected plaintext record after handshake"));
            }

            let plaintext = match self.app_aead_s2c.open(&header.raw, &body) {
                Ok(p) => p,
                Err(e) => {
                    self.phase = Phase::Failed;
                    error!("application record AEAD open failed, connection failed");
                    return Err(e);
                }
            };
            let (content, content_type) = decode_inner_plaintext(&plaintext)?;

            match content_type {
                ContentType::ApplicationData => self.recv_buf.extend_from_slice(content),
                ContentType::Alert => {
                    let (level, description) = parse_alert(content)?;
                    if is_close_notify(level, description) {
                        self.phase = Phase::Closed;
                        return Ok(0);
                    }
                    self.phase = Phase::Failed;
                    error!(level, description, "peer sent a fatal alert, connection failed");
                    return Err(Error::Alert { level, description });
                }
                ContentType::Handshake => {
                    // Post-handshake messages (NewSessionTicket, key update)
                    // are out of scope; skip rather than fail the
                    // connection over a message this crate doesn't act on.
                    warn!("ignoring post-handshake handshake-layer message");
                }
                ContentType::ChangeCipherSpec => {
                    return Err(Error::decode("unexpected ChangeCipherSpec inside AEAD record"));
                }
            }
        }

        let n = buf.len().min(self.recv_buf.len());
        buf[..n].copy_from_slice(&self.recv_buf[..n]);
        let _ = self.recv_buf.split_to(n);
        Ok(n)
    }

    pub async fn close(mut self) -> Result<(), Error> {
        self.require(Phase::Established)?;
        let body = encode_close_notify();
        write_encrypted_record(&mut self.transport, &mut self.app_aead_c2s, ContentType::Alert, &body).await?;
        self.phase = Phase::Closed;
        Ok(())
    }

    fn require(&self, expected: Phase) -> Result<(), Error> {
        if self.phase != expected {
            return Err(Error::state(format!("operation invalid in phase {:?}", self.phase)));
        }
        Ok(())
    }
}
