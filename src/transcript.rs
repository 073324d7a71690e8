use bytes::Bytes;

use crate::primitives::hash::{sha256_concat, HASH_LEN};

/// Append-only log of handshake-message bodies (type || uint24(len) ||
/// content), in the exact order sent or received. Never holds record
/// headers or ChangeCipherSpec.
///
/// Modeled as a single owning buffer with borrow-only access for hashing, to
/// avoid aliasing writers (see DESIGN.md).
#[derive(Default)]
pub struct Transcript {
    messages: Vec<Bytes>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn push(&mut self, message: Bytes) {
        self.messages.push(message);
    }

    /// SHA-256 over the concatenation of every message appended so far.
    pub fn hash(&self) -> [u8; HASH_LEN] {
        let refs: Vec<&[u8]> = self.messages.iter().map(|m| m.as_ref()).collect();
        sha256_concat(&refs)
    }
}
