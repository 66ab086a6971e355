//! The masking-key transform and mask-policy configuration.

use crate::error::{Error, Result};

/// XOR `buf` against `key`, treating `buf[i]` as byte `start + i` of the
/// masked payload. Callable with any `start` offset so a single masked
/// payload can be streamed across multiple chunks without losing alignment.
/// Its own inverse: masking and unmasking are the same operation.
pub fn apply_mask(start: usize, key: [u8; 4], buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[(start + i) % 4];
    }
}

/// How a writer sources the masking key for the frames it emits.
#[derive(Debug, Clone, Copy)]
pub enum MaskPolicy {
    /// No masking key; frames are sent unmasked. Valid only for server-role
    /// writers — a client writer configured this way is a caller error the
    /// connection layer is expected to have already ruled out.
    Unmasked,
    /// Draw a fresh 32-bit key per frame from a cryptographically strong
    /// source.
    Random,
    /// Use the given key for every frame this writer emits.
    Fixed(u32),
}

impl MaskPolicy {
    pub(crate) fn resolve_key(self) -> Result<Option<[u8; 4]>> {
        match self {
            MaskPolicy::Unmasked => Ok(None),
            MaskPolicy::Fixed(key) => Ok(Some(key.to_be_bytes())),
            MaskPolicy::Random => {
                let mut key = [0u8; 4];
                getrandom::fill(&mut key).map_err(|_| Error::Transport {
                    kind: std::io::ErrorKind::Other,
                    message: "failed to source a random masking key".into(),
                })?;
                Ok(Some(key))
            }
        }
    }
}
