//! The transport seam: any async byte stream the caller hands in.

use tokio::io::{AsyncRead, AsyncWrite};

/// Blanket bound for anything `connect` can drive a handshake and session
/// over. A `tokio::net::TcpStream` satisfies this directly; so does any
/// wrapped/multiplexed stream the caller constructs.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}
