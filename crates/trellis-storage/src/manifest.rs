//! Best-effort manifest of the stores registered in a storage root.
//!
//! The manifest is diagnostics-only: it records which file each named
//! store lives in and how it was registered, so drift (a store re-opened
//! with a different kind or backend than last time) is visible in logs
//! before a codec error would surface it. Reading or writing the manifest
//! never fails the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Kv,
    SortedKv,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub kind: StoreKind,
    pub backend: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    stores: BTreeMap<String, ManifestEntry>,
}

#[derive(Clone)]
pub(crate) struct ManifestHandle {
    inner: Arc<Mutex<ManifestState>>,
}

struct ManifestState {
    path: Option<PathBuf>,
    manifest: Manifest,
}

impl ManifestHandle {
    pub(crate) fn ephemeral() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManifestState {
                path: None,
                manifest: Manifest::default(),
            })),
        }
    }

    pub(crate) fn load(root: &std::path::Path) -> Self {
        let path = root.join(MANIFEST_FILE);
        let manifest = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Manifest>(&bytes) {
                Ok(manifest) => manifest,
                Err(err) => {
                    tracing::warn!(
                        target = "trellis.storage",
                        path = %path.display(),
                        error = %err,
                        "failed to parse store manifest; starting fresh"
                    );
                    Manifest::default()
                }
            },
            Err(_) => Manifest::default(),
        };

        Self {
            inner: Arc::new(Mutex::new(ManifestState {
                path: Some(path),
                manifest,
            })),
        }
    }

    /// Records a store registration, logging drift against a previous run.
    pub(crate) fn record(&self, name: &str, entry: ManifestEntry) {
        let Ok(mut state) = self.inner.lock() else {
            return;
        };

        if let Some(previous) = state.manifest.stores.get(name) {
            if previous != &entry {
                tracing::warn!(
                    target = "trellis.storage",
                    store = name,
                    previous = ?previous,
                    current = ?entry,
                    "store registered differently than in the previous session"
                );
            }
        }

        let previous = state.manifest.stores.insert(name.to_string(), entry);
        if previous != state.manifest.stores.get(name).cloned() {
            Self::save_locked(&state);
        }
    }

    fn save_locked(state: &ManifestState) {
        let Some(path) = &state.path else {
            return;
        };

        // Persistence is best-effort: a manifest write failure must never
        // fail the store operation that triggered it.
        let result = serde_json::to_vec_pretty(&state.manifest)
            .map_err(std::io::Error::other)
            .and_then(|bytes| {
                let tmp = path.with_extension("json.tmp");
                fs::write(&tmp, bytes)?;
                fs::rename(&tmp, path)
            });
        if let Err(err) = result {
            tracing::debug!(
                target = "trellis.storage",
                path = %path.display(),
                error = %err,
                "failed to persist store manifest"
            );
        }
    }
}
