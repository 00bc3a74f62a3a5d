use std::fmt;
use std::path::Path;

use trellis_core::Label;

/// A 128-bit content-independent hash, used to key stores by path or label
/// without retaining the full string.
///
/// The value is the first 16 bytes of a blake3 digest. Collisions are
/// tolerated by the callers (id sets per hash bucket), not by this type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash128(pub [u8; 16]);

impl Hash128 {
    pub const LEN: usize = 16;

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = blake3::hash(bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest.as_bytes()[..16]);
        Self(out)
    }

    /// Hashes the textual form of a path, not its contents.
    pub fn of_path(path: &Path) -> Self {
        Self::of_bytes(path.to_string_lossy().as_bytes())
    }

    pub fn of_label(label: &Label) -> Self {
        Self::of_bytes(label.to_string().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for Hash128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash128(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Returns the 64-bit prefix of a blake3 digest, used as a cheap content
/// hash for store payload verification.
pub fn content_hash(payload: &[u8]) -> u64 {
    let hash_bytes = blake3::hash(payload);
    u64::from_le_bytes(hash_bytes.as_bytes()[..8].try_into().expect("hash slice"))
}
