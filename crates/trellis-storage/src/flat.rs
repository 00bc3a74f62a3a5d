//! Whole-value store.
//!
//! A [`FlatStore`] holds exactly one value of its type: read once at
//! registration (replayed from disk when present, otherwise produced by
//! the creator), mutated in place, and written back wholesale on
//! [`FlatStore::flush`] or drop. Used for small aggregate state where
//! whole-value versioned (de)serialization is simpler and cheaper than
//! per-key storage.

use std::io::Cursor;

use crate::codec::Codec;
use crate::context::StorePersistence;
use crate::error::StorageError;
use crate::file::{read_store, write_store_atomic};

pub struct FlatStore<T> {
    name: String,
    codec: Box<dyn Codec<T>>,
    creator: Box<dyn Fn() -> T + Send + Sync>,
    value: T,
    persistence: Option<StorePersistence>,
}

impl<T> std::fmt::Debug for FlatStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T> FlatStore<T> {
    pub(crate) fn open(
        name: String,
        codec: Box<dyn Codec<T>>,
        creator: Box<dyn Fn() -> T + Send + Sync>,
        persistence: Option<StorePersistence>,
    ) -> Result<Self, StorageError> {
        let value = match &persistence {
            Some(persistence) => match read_store(&persistence.path)? {
                Some(payload) => {
                    let bytes: &[u8] = &payload;
                    let mut cursor = Cursor::new(bytes);
                    let value = codec
                        .decode(&mut cursor)
                        .map_err(|err| StorageError::codec(&name, err))?;
                    tracing::debug!(
                        target = "trellis.storage",
                        store = %name,
                        "replayed flat store from disk"
                    );
                    value
                }
                None => creator(),
            },
            None => creator(),
        };

        Ok(Self {
            name,
            codec,
            creator,
            value,
            persistence,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn mutate(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
    }

    /// Swaps in a new value, returning the previous one.
    pub fn replace(&mut self, value: T) -> T {
        std::mem::replace(&mut self.value, value)
    }

    /// Resets to the creator value.
    pub fn reset(&mut self) {
        self.value = (self.creator)();
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let mut payload = Vec::new();
        self.codec
            .encode(&mut payload, &self.value)
            .map_err(|err| StorageError::codec(&self.name, err))?;
        write_store_atomic(&persistence.path, &payload, persistence.compression)
    }
}

impl<T> Drop for FlatStore<T> {
    fn drop(&mut self) {
        // Written back on disposal; failures are logged, not raised.
        if let Err(err) = self.flush() {
            tracing::warn!(
                target = "trellis.storage",
                store = %self.name,
                error = %err,
                "failed to flush flat store on drop"
            );
        }
    }
}
