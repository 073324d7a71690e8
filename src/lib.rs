//! Core of a minimal TLS 1.3 client: X25519 + ChaCha20-Poly1305 handshake,
//! RFC 8446 §7 key schedule, and AEAD record layer, driven over any
//! `tokio::io::{AsyncRead, AsyncWrite}` transport the caller supplies.
//!
//! Certificate-chain validation, session resumption, cipher-suite
//! negotiation, and post-handshake key updates are out of scope — see
//! SPEC_FULL.md for the full boundary. [`CertificateVerifier`] is the seam
//! a caller fills in for real validation; [`NoVerification`] accepts
//! anything and must not be used past a trusted test server.

pub mod codec;
pub mod context;
pub mod engine;
pub mod error;
pub mod primitives;
pub mod record_aead;
pub mod schedule;
pub mod transcript;
pub mod transport;

pub use context::{CertificateVerifier, Context, NoVerification};
pub use engine::{Phase, Session};
pub use error::Error;
pub use primitives::random::{EntropySource, OsEntropy};
pub use transport::Transport;

/// Performs the full handshake over `transport`, accepting any certificate
/// chain the server presents. Equivalent to `connect_with_verifier(ctx,
/// transport, server_name, NoVerification)`.
pub async fn connect<T: Transport>(
    ctx: Context,
    transport: T,
    server_name: Option<&str>,
) -> Result<Session<T>, Error> {
    engine::connect(ctx, transport, server_name, context::NoVerification).await
}

/// Performs the full handshake over `transport`, forwarding Certificate and
/// CertificateVerify bodies to `verifier` as they arrive.
pub async fn connect_with_verifier<T: Transport, V: CertificateVerifier>(
    ctx: Context,
    transport: T,
    server_name: Option<&str>,
    verifier: V,
) -> Result<Session<T>, Error> {
    engine::connect(ctx, transport, server_name, verifier).await
}
