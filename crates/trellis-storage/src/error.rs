use thiserror::Error;

/// Errors produced by the versioned codec layer.
///
/// A version mismatch is fatal for the affected load: there is no
/// partial-read tolerance and no silent downgrade.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported codec version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u16, found: u16 },
    #[error("invalid utf-8 in string payload")]
    InvalidUtf8,
    #[error("invalid tag {tag} for {type_name}")]
    InvalidTag { tag: u8, type_name: &'static str },
    #[error("declared length {len} exceeds limit {limit}")]
    LengthOverflow { len: u64, limit: u64 },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error in store {store}: {source}")]
    Codec {
        store: String,
        #[source]
        source: CodecError,
    },
    #[error("invalid store header: {0}")]
    InvalidHeader(&'static str),
    #[error("incompatible store format version: expected {expected}, found {found}")]
    WrongFormat { expected: u16, found: u16 },
    #[error("truncated store file: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("unsupported compression tag {0}")]
    UnsupportedCompression(u8),
    #[error("decompression failed: {0}")]
    Decompression(String),
    #[error("payload size {payload_len} does not fit into addressable memory")]
    OversizedPayload { payload_len: u64 },
    #[error("payload hash mismatch: expected {expected}, found {found}")]
    HashMismatch { expected: u64, found: u64 },
}

impl StorageError {
    pub(crate) fn codec(store: &str, source: CodecError) -> Self {
        StorageError::Codec {
            store: store.to_string(),
            source,
        }
    }
}
