//! Key/value store handles.
//!
//! A store is a named, codec-typed map owned by exactly one writer. The
//! backend is selected at registration time via [`StorageHints`]: the
//! in-memory backend keeps decoded values resident and the paged backend
//! keeps values encoded (decoding on access), trading CPU for memory on
//! large indices. Both persist the same snapshot format through
//! [`crate::file`], so a store can be re-registered under either hint.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::codec::Codec;
use crate::context::{StorageHints, StorePersistence};
use crate::error::{CodecError, StorageError};
use crate::file::{read_store, write_store_atomic};

fn encode_with<T>(
    name: &str,
    codec: &dyn Codec<T>,
    value: &T,
    out: &mut Vec<u8>,
) -> Result<(), StorageError> {
    codec
        .encode(out, value)
        .map_err(|err| StorageError::codec(name, err))
}

fn decode_with<T>(
    name: &str,
    codec: &dyn Codec<T>,
    cursor: &mut Cursor<&[u8]>,
) -> Result<T, StorageError> {
    codec
        .decode(cursor)
        .map_err(|err| StorageError::codec(name, err))
}

fn read_value_bytes(name: &str, cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, StorageError> {
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|err| StorageError::codec(name, CodecError::Io(err)))?;
    let mut bytes = vec![0u8; len as usize];
    std::io::Read::read_exact(cursor, &mut bytes)
        .map_err(|err| StorageError::codec(name, CodecError::Io(err)))?;
    Ok(bytes)
}

/// Unordered key/value store.
pub struct KvStore<K, V> {
    name: String,
    key_codec: Box<dyn Codec<K>>,
    value_codec: Box<dyn Codec<V>>,
    backend: KvBackend<K, V>,
    persistence: Option<StorePersistence>,
}

enum KvBackend<K, V> {
    Memory(hashbrown::HashMap<K, V>),
    Paged(hashbrown::HashMap<K, Vec<u8>>),
}

impl<K, V> std::fmt::Debug for KvStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<K, V> KvStore<K, V>
where
    K: Eq + std::hash::Hash + Clone,
    V: Clone,
{
    pub(crate) fn open(
        name: String,
        hints: StorageHints,
        key_codec: Box<dyn Codec<K>>,
        value_codec: Box<dyn Codec<V>>,
        persistence: Option<StorePersistence>,
    ) -> Result<Self, StorageError> {
        let backend = match hints {
            StorageHints::UseInMemory => KvBackend::Memory(hashbrown::HashMap::new()),
            StorageHints::UsePagedStore => KvBackend::Paged(hashbrown::HashMap::new()),
        };
        let mut store = Self {
            name,
            key_codec,
            value_codec,
            backend,
            persistence,
        };
        store.replay()?;
        Ok(store)
    }

    fn replay(&mut self) -> Result<(), StorageError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let Some(payload) = read_store(&persistence.path)? else {
            return Ok(());
        };

        let bytes: &[u8] = &payload;
        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u64::<LittleEndian>()
            .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;

        for _ in 0..count {
            let key = decode_with(&self.name, &*self.key_codec, &mut cursor)?;
            let value_bytes = read_value_bytes(&self.name, &mut cursor)?;
            match &mut self.backend {
                KvBackend::Memory(map) => {
                    let mut value_cursor = Cursor::new(value_bytes.as_slice());
                    let value = decode_with(&self.name, &*self.value_codec, &mut value_cursor)?;
                    map.insert(key, value);
                }
                KvBackend::Paged(map) => {
                    map.insert(key, value_bytes);
                }
            }
        }

        tracing::debug!(
            target = "trellis.storage",
            store = %self.name,
            entries = self.len(),
            "replayed kv store from disk"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        match &self.backend {
            KvBackend::Memory(map) => map.len(),
            KvBackend::Paged(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        match &self.backend {
            KvBackend::Memory(map) => map.contains_key(key),
            KvBackend::Paged(map) => map.contains_key(key),
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        match &self.backend {
            KvBackend::Memory(map) => Ok(map.get(key).cloned()),
            KvBackend::Paged(map) => match map.get(key) {
                None => Ok(None),
                Some(bytes) => {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    Ok(Some(decode_with(&self.name, &*self.value_codec, &mut cursor)?))
                }
            },
        }
    }

    pub fn put(&mut self, key: K, value: V) -> Result<(), StorageError> {
        match &mut self.backend {
            KvBackend::Memory(map) => {
                map.insert(key, value);
                Ok(())
            }
            KvBackend::Paged(map) => {
                let mut bytes = Vec::new();
                encode_with(&self.name, &*self.value_codec, &value, &mut bytes)?;
                map.insert(key, bytes);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Result<Option<V>, StorageError> {
        match &mut self.backend {
            KvBackend::Memory(map) => Ok(map.remove(key)),
            KvBackend::Paged(map) => match map.remove(key) {
                None => Ok(None),
                Some(bytes) => {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    Ok(Some(decode_with(&self.name, &*self.value_codec, &mut cursor)?))
                }
            },
        }
    }

    pub fn compute_if_absent(
        &mut self,
        key: K,
        create: impl FnOnce() -> V,
    ) -> Result<V, StorageError> {
        if let Some(existing) = self.get(&key)? {
            return Ok(existing);
        }
        let value = create();
        self.put(key, value.clone())?;
        Ok(value)
    }

    /// Replaces the entry with `f(current)`; `None` removes it. Returns
    /// the new value.
    pub fn compute(
        &mut self,
        key: K,
        f: impl FnOnce(Option<V>) -> Option<V>,
    ) -> Result<Option<V>, StorageError> {
        let current = self.get(&key)?;
        match f(current) {
            Some(value) => {
                self.put(key, value.clone())?;
                Ok(Some(value))
            }
            None => {
                self.remove(&key)?;
                Ok(None)
            }
        }
    }

    pub fn clear(&mut self) {
        match &mut self.backend {
            KvBackend::Memory(map) => map.clear(),
            KvBackend::Paged(map) => map.clear(),
        }
    }

    pub fn keys(&self) -> Vec<K> {
        match &self.backend {
            KvBackend::Memory(map) => map.keys().cloned().collect(),
            KvBackend::Paged(map) => map.keys().cloned().collect(),
        }
    }

    pub fn values(&self) -> Result<Vec<V>, StorageError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    pub fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        match &self.backend {
            KvBackend::Memory(map) => Ok(map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()),
            KvBackend::Paged(map) => {
                let mut out = Vec::with_capacity(map.len());
                for (key, bytes) in map {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    let value = decode_with(&self.name, &*self.value_codec, &mut cursor)?;
                    out.push((key.clone(), value));
                }
                Ok(out)
            }
        }
    }

    /// Writes the current contents as one atomic snapshot. A no-op for
    /// ephemeral stores.
    pub fn flush(&self) -> Result<(), StorageError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let mut payload = Vec::new();
        payload
            .write_u64::<LittleEndian>(self.len() as u64)
            .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;

        match &self.backend {
            KvBackend::Memory(map) => {
                for (key, value) in map {
                    encode_with(&self.name, &*self.key_codec, key, &mut payload)?;
                    let mut value_bytes = Vec::new();
                    encode_with(&self.name, &*self.value_codec, value, &mut value_bytes)?;
                    payload
                        .write_u32::<LittleEndian>(value_bytes.len() as u32)
                        .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;
                    payload.extend_from_slice(&value_bytes);
                }
            }
            KvBackend::Paged(map) => {
                for (key, value_bytes) in map {
                    encode_with(&self.name, &*self.key_codec, key, &mut payload)?;
                    payload
                        .write_u32::<LittleEndian>(value_bytes.len() as u32)
                        .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;
                    payload.extend_from_slice(value_bytes);
                }
            }
        }

        write_store_atomic(&persistence.path, &payload, persistence.compression)
    }
}

/// Key/value store with ordered iteration.
///
/// The comparator is the key type's `Ord`; iteration, `range` queries and
/// the snapshot encoding all follow it, which makes hash-keyed indices
/// deterministic to enumerate.
pub struct SortedKvStore<K, V> {
    name: String,
    key_codec: Box<dyn Codec<K>>,
    value_codec: Box<dyn Codec<V>>,
    backend: SortedBackend<K, V>,
    persistence: Option<StorePersistence>,
}

enum SortedBackend<K, V> {
    Memory(std::collections::BTreeMap<K, V>),
    Paged(std::collections::BTreeMap<K, Vec<u8>>),
}

impl<K, V> SortedKvStore<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub(crate) fn open(
        name: String,
        hints: StorageHints,
        key_codec: Box<dyn Codec<K>>,
        value_codec: Box<dyn Codec<V>>,
        persistence: Option<StorePersistence>,
    ) -> Result<Self, StorageError> {
        let backend = match hints {
            StorageHints::UseInMemory => SortedBackend::Memory(std::collections::BTreeMap::new()),
            StorageHints::UsePagedStore => SortedBackend::Paged(std::collections::BTreeMap::new()),
        };
        let mut store = Self {
            name,
            key_codec,
            value_codec,
            backend,
            persistence,
        };
        store.replay()?;
        Ok(store)
    }

    fn replay(&mut self) -> Result<(), StorageError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let Some(payload) = read_store(&persistence.path)? else {
            return Ok(());
        };

        let bytes: &[u8] = &payload;
        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u64::<LittleEndian>()
            .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;

        for _ in 0..count {
            let key = decode_with(&self.name, &*self.key_codec, &mut cursor)?;
            let value_bytes = read_value_bytes(&self.name, &mut cursor)?;
            match &mut self.backend {
                SortedBackend::Memory(map) => {
                    let mut value_cursor = Cursor::new(value_bytes.as_slice());
                    let value = decode_with(&self.name, &*self.value_codec, &mut value_cursor)?;
                    map.insert(key, value);
                }
                SortedBackend::Paged(map) => {
                    map.insert(key, value_bytes);
                }
            }
        }

        tracing::debug!(
            target = "trellis.storage",
            store = %self.name,
            entries = self.len(),
            "replayed sorted kv store from disk"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        match &self.backend {
            SortedBackend::Memory(map) => map.len(),
            SortedBackend::Paged(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        match &self.backend {
            SortedBackend::Memory(map) => map.contains_key(key),
            SortedBackend::Paged(map) => map.contains_key(key),
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        match &self.backend {
            SortedBackend::Memory(map) => Ok(map.get(key).cloned()),
            SortedBackend::Paged(map) => match map.get(key) {
                None => Ok(None),
                Some(bytes) => {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    Ok(Some(decode_with(&self.name, &*self.value_codec, &mut cursor)?))
                }
            },
        }
    }

    pub fn put(&mut self, key: K, value: V) -> Result<(), StorageError> {
        match &mut self.backend {
            SortedBackend::Memory(map) => {
                map.insert(key, value);
                Ok(())
            }
            SortedBackend::Paged(map) => {
                let mut bytes = Vec::new();
                encode_with(&self.name, &*self.value_codec, &value, &mut bytes)?;
                map.insert(key, bytes);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Result<Option<V>, StorageError> {
        match &mut self.backend {
            SortedBackend::Memory(map) => Ok(map.remove(key)),
            SortedBackend::Paged(map) => match map.remove(key) {
                None => Ok(None),
                Some(bytes) => {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    Ok(Some(decode_with(&self.name, &*self.value_codec, &mut cursor)?))
                }
            },
        }
    }

    pub fn compute_if_absent(
        &mut self,
        key: K,
        create: impl FnOnce() -> V,
    ) -> Result<V, StorageError> {
        if let Some(existing) = self.get(&key)? {
            return Ok(existing);
        }
        let value = create();
        self.put(key, value.clone())?;
        Ok(value)
    }

    pub fn compute(
        &mut self,
        key: K,
        f: impl FnOnce(Option<V>) -> Option<V>,
    ) -> Result<Option<V>, StorageError> {
        let current = self.get(&key)?;
        match f(current) {
            Some(value) => {
                self.put(key, value.clone())?;
                Ok(Some(value))
            }
            None => {
                self.remove(&key)?;
                Ok(None)
            }
        }
    }

    pub fn clear(&mut self) {
        match &mut self.backend {
            SortedBackend::Memory(map) => map.clear(),
            SortedBackend::Paged(map) => map.clear(),
        }
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        match &self.backend {
            SortedBackend::Memory(map) => map.keys().cloned().collect(),
            SortedBackend::Paged(map) => map.keys().cloned().collect(),
        }
    }

    pub fn values(&self) -> Result<Vec<V>, StorageError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Entries in ascending key order.
    pub fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        match &self.backend {
            SortedBackend::Memory(map) => Ok(map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()),
            SortedBackend::Paged(map) => {
                let mut out = Vec::with_capacity(map.len());
                for (key, bytes) in map {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    let value = decode_with(&self.name, &*self.value_codec, &mut cursor)?;
                    out.push((key.clone(), value));
                }
                Ok(out)
            }
        }
    }

    /// Entries within a key range, in ascending key order.
    pub fn range<R>(&self, range: R) -> Result<Vec<(K, V)>, StorageError>
    where
        R: std::ops::RangeBounds<K>,
    {
        match &self.backend {
            SortedBackend::Memory(map) => Ok(map
                .range(range)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()),
            SortedBackend::Paged(map) => {
                let mut out = Vec::new();
                for (key, bytes) in map.range(range) {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    let value = decode_with(&self.name, &*self.value_codec, &mut cursor)?;
                    out.push((key.clone(), value));
                }
                Ok(out)
            }
        }
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let mut payload = Vec::new();
        payload
            .write_u64::<LittleEndian>(self.len() as u64)
            .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;

        match &self.backend {
            SortedBackend::Memory(map) => {
                for (key, value) in map {
                    encode_with(&self.name, &*self.key_codec, key, &mut payload)?;
                    let mut value_bytes = Vec::new();
                    encode_with(&self.name, &*self.value_codec, value, &mut value_bytes)?;
                    payload
                        .write_u32::<LittleEndian>(value_bytes.len() as u32)
                        .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;
                    payload.extend_from_slice(&value_bytes);
                }
            }
            SortedBackend::Paged(map) => {
                for (key, value_bytes) in map {
                    encode_with(&self.name, &*self.key_codec, key, &mut payload)?;
                    payload
                        .write_u32::<LittleEndian>(value_bytes.len() as u32)
                        .map_err(|err| StorageError::codec(&self.name, CodecError::Io(err)))?;
                    payload.extend_from_slice(value_bytes);
                }
            }
        }

        write_store_atomic(&persistence.path, &payload, persistence.compression)
    }
}
