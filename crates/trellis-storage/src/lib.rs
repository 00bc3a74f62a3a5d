//! Persistent storage for Trellis indices.
//!
//! ## Layers
//! - [`codec`]: explicit, hand-written versioned binary codecs.
//! - [`file`]: the store file format (header + verified payload, atomic
//!   snapshot writes, mmap-preferred reads, optional zstd).
//! - Store handles: [`KvStore`], [`SortedKvStore`] (per-key maps) and
//!   [`FlatStore`] (one whole value), each backed by an engine selected
//!   via [`StorageHints`] at registration time.
//! - [`StorageContext`]: registration root and lifecycle.
//!
//! ## Consistency
//! Stores are single-writer. A flush fully replaces the store file via a
//! unique temp file and an atomic rename; readers never observe a partial
//! write. Replay happens once at registration; a codec version mismatch
//! during replay aborts the affected store's load.

pub mod codec;
mod context;
mod error;
mod file;
mod flat;
mod hash;
mod manifest;
mod store;

pub use context::{StorageContext, StorageHints};
pub use error::{CodecError, StorageError};
pub use file::{
    read_store, write_store_atomic, Compression, StoreHeader, StorePayload, WriteCompression,
    FORMAT_VERSION, HEADER_LEN,
};
pub use flat::FlatStore;
pub use hash::{content_hash, Hash128};
pub use manifest::{Manifest, ManifestEntry, StoreKind, MANIFEST_FILE};
pub use store::{KvStore, SortedKvStore};
