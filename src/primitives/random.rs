use rand_core::RngCore;

/// Injectable entropy capability.
///
/// Passing the randomness source into [`crate::Context`] at construction
/// (rather than reaching for a process-global RNG) keeps tests deterministic
/// via injection.
pub trait EntropySource {
    fn fill(&mut self, buf: &mut [u8]);
}

/// Default entropy source, backed by the OS CSPRNG.
#[derive(Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, buf: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(buf);
    }
}

#[cfg(test)]
pub(crate) struct FixedEntropy(pub Vec<u8>);

#[cfg(test)]
impl EntropySource for FixedEntropy {
    fn fill(&mut self, buf: &mut [u8]) {
        let n = buf.len().min(self.0.len());
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0.drain(..n);
    }
}
