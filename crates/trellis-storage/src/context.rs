//! Store registration and lifecycle.
//!
//! A [`StorageContext`] is constructed once per indexing session, either
//! rooted at a directory (persistent) or ephemeral (tests), and handed to
//! the services that own stores. Each store is registered by name with
//! explicit [`StorageHints`] and codecs; call sites never see the physical
//! engine behind the hint.

use std::path::{Path, PathBuf};

use crate::codec::Codec;
use crate::error::StorageError;
use crate::file::WriteCompression;
use crate::flat::FlatStore;
use crate::manifest::{ManifestEntry, ManifestHandle, StoreKind};
use crate::store::{KvStore, SortedKvStore};

/// Backend selection for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageHints {
    /// Keep decoded values resident; snapshot wholesale on flush.
    UseInMemory,
    /// Keep values encoded and decode on access; same snapshot format.
    UsePagedStore,
}

impl StorageHints {
    fn backend_name(self) -> &'static str {
        match self {
            StorageHints::UseInMemory => "memory",
            StorageHints::UsePagedStore => "paged",
        }
    }
}

#[derive(Clone)]
pub(crate) struct StorePersistence {
    pub(crate) path: PathBuf,
    pub(crate) compression: WriteCompression,
}

#[derive(Clone)]
pub struct StorageContext {
    root: Option<PathBuf>,
    compression: WriteCompression,
    manifest: ManifestHandle,
}

impl StorageContext {
    /// Opens a persistent context rooted at `root`, creating the directory
    /// if needed. Stores registered against this context replay from disk.
    pub fn on_disk(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let manifest = ManifestHandle::load(&root);
        Ok(Self {
            root: Some(root),
            compression: WriteCompression::default(),
            manifest,
        })
    }

    /// Opens an ephemeral context: stores live only in memory and flushes
    /// are no-ops. Intended for tests and throwaway sessions.
    pub fn ephemeral() -> Self {
        Self {
            root: None,
            compression: WriteCompression::default(),
            manifest: ManifestHandle::ephemeral(),
        }
    }

    /// Overrides the snapshot compression policy for stores registered
    /// after the call.
    pub fn with_compression(mut self, compression: WriteCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn kv_store<K, V, KC, VC>(
        &self,
        name: &str,
        hints: StorageHints,
        key_codec: KC,
        value_codec: VC,
    ) -> Result<KvStore<K, V>, StorageError>
    where
        K: Eq + std::hash::Hash + Clone,
        V: Clone,
        KC: Codec<K> + 'static,
        VC: Codec<V> + 'static,
    {
        let persistence = self.register(name, StoreKind::Kv, hints);
        KvStore::open(
            name.to_string(),
            hints,
            Box::new(key_codec),
            Box::new(value_codec),
            persistence,
        )
    }

    pub fn sorted_kv_store<K, V, KC, VC>(
        &self,
        name: &str,
        hints: StorageHints,
        key_codec: KC,
        value_codec: VC,
    ) -> Result<SortedKvStore<K, V>, StorageError>
    where
        K: Ord + Clone,
        V: Clone,
        KC: Codec<K> + 'static,
        VC: Codec<V> + 'static,
    {
        let persistence = self.register(name, StoreKind::SortedKv, hints);
        SortedKvStore::open(
            name.to_string(),
            hints,
            Box::new(key_codec),
            Box::new(value_codec),
            persistence,
        )
    }

    /// Flat stores are whole-value; the hint only affects bookkeeping, the
    /// value is always resident.
    pub fn flat_store<T, C, F>(
        &self,
        name: &str,
        hints: StorageHints,
        codec: C,
        creator: F,
    ) -> Result<FlatStore<T>, StorageError>
    where
        C: Codec<T> + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let persistence = self.register(name, StoreKind::Flat, hints);
        FlatStore::open(
            name.to_string(),
            Box::new(codec),
            Box::new(creator),
            persistence,
        )
    }

    fn register(
        &self,
        name: &str,
        kind: StoreKind,
        hints: StorageHints,
    ) -> Option<StorePersistence> {
        let root = self.root.as_ref()?;
        let file_name = store_file_name(name);
        self.manifest.record(
            name,
            ManifestEntry {
                file: file_name.clone(),
                kind,
                backend: hints.backend_name().to_string(),
            },
        );
        Some(StorePersistence {
            path: root.join(file_name),
            compression: self.compression,
        })
    }
}

/// Maps a store name to its file name: alphanumerics, `-`, `_` and `.`
/// pass through, everything else becomes `_`.
fn store_file_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    out.push_str(".bin");
    out
}
