use thiserror::Error;

/// Errors surfaced by the handshake and record engine.
///
/// Every variant is fatal to the connection: on return, the caller's
/// `Session`/`Context` must not be reused (the engine enforces this itself
/// by moving to `Phase::Failed`, see [`crate::engine`]).
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport I/O failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("malformed record or handshake message: {0}")]
    Decode(String),

    #[error("peer sent alert level={level} description={description}")]
    Alert { level: u8, description: u8 },

    #[error("AEAD authentication failed")]
    Auth,

    #[error("operation invalid in current state: {0}")]
    State(String),
}

impl Error {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Error::State(msg.into())
    }
}
