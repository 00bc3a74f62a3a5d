//! The file index: source-file path ↔ target id.
//!
//! Keys are 128-bit hashes of the canonical path text (and of the label on
//! the inverse side), not the raw strings, keeping the index compact and
//! comparisons cheap. Hash collisions are tolerated by storing a set of
//! vertex ids per bucket.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;

use trellis_core::{Label, VertexId};
use trellis_storage::codec::{versioned, BTreeSetCodec, Hash128Codec, PathCodec, VertexIdCodec};
use trellis_storage::{Hash128, SortedKvStore, StorageContext, StorageError, StorageHints};

use crate::context::{SyncColdDiff, SyncContext};
use crate::updater::SyncIndexUpdater;

pub struct FileTargetIndex {
    source_to_targets: SortedKvStore<Hash128, BTreeSet<VertexId>>,
    target_to_sources: SortedKvStore<Hash128, BTreeSet<PathBuf>>,
}

impl FileTargetIndex {
    pub fn open(storage: &StorageContext) -> Result<Self, StorageError> {
        Ok(Self {
            source_to_targets: storage.sorted_kv_store(
                "index.source2Target",
                StorageHints::UsePagedStore,
                Hash128Codec,
                versioned(1, BTreeSetCodec(VertexIdCodec)),
            )?,
            target_to_sources: storage.sorted_kv_store(
                "index.target2Source",
                StorageHints::UsePagedStore,
                Hash128Codec,
                versioned(1, BTreeSetCodec(PathCodec)),
            )?,
        })
    }

    /// Vertex ids owning the given canonical source path.
    pub fn targets_for_source(&self, path: &Path) -> Result<Vec<VertexId>, StorageError> {
        Ok(self
            .source_to_targets
            .get(&Hash128::of_path(path))?
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default())
    }

    /// Canonical source paths declared by the given target.
    pub fn sources_for_target(&self, label: &Label) -> Result<Vec<PathBuf>, StorageError> {
        Ok(self
            .target_to_sources
            .get(&Hash128::of_label(label))?
            .map(|paths| paths.into_iter().collect())
            .unwrap_or_default())
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.source_to_targets.flush()?;
        self.target_to_sources.flush()
    }

    /// Drops every (path hash → vertex id) association recorded for the
    /// target, and the target's own source set.
    fn remove_target_associations(
        &mut self,
        label_hash: Hash128,
        vertex_id: VertexId,
    ) -> Result<(), StorageError> {
        let Some(sources) = self.target_to_sources.remove(&label_hash)? else {
            return Ok(());
        };
        for path in sources {
            self.source_to_targets
                .compute(Hash128::of_path(&path), |ids| {
                    let mut ids = ids?;
                    ids.remove(&vertex_id);
                    if ids.is_empty() {
                        None
                    } else {
                        Some(ids)
                    }
                })?;
        }
        Ok(())
    }
}

impl SyncIndexUpdater for FileTargetIndex {
    fn update_indexes(
        &mut self,
        ctx: &SyncContext<'_>,
        diff: &SyncColdDiff,
    ) -> anyhow::Result<()> {
        if ctx.scope.is_full() {
            self.source_to_targets.clear();
            self.target_to_sources.clear();
        }

        let (changed, removed) = diff.split();

        for target in removed {
            self.remove_target_associations(Hash128::of_label(&target.label), target.vertex_id)?;
        }

        for target in changed {
            let Some(info) = ctx.targets.build_target(&target.label) else {
                tracing::debug!(
                    target = "trellis.index",
                    label = %target.label,
                    "skipping unresolvable changed target"
                );
                continue;
            };

            let label_hash = Hash128::of_label(&target.label);

            // A changed target may carry a different source list than the
            // one on record; clear the old associations first.
            self.remove_target_associations(label_hash, target.vertex_id)?;

            let mut canonical = BTreeSet::new();
            for declared in &info.sources {
                let Some(path) = ctx.paths.resolve(declared) else {
                    tracing::debug!(
                        target = "trellis.index",
                        label = %target.label,
                        declared = %declared.display(),
                        "skipping unresolvable source reference"
                    );
                    continue;
                };
                canonical.insert(path);
            }

            for path in &canonical {
                self.source_to_targets
                    .compute(Hash128::of_path(path), |ids| {
                        let mut ids = ids.unwrap_or_default();
                        ids.insert(target.vertex_id);
                        Some(ids)
                    })?;
            }

            if !canonical.is_empty() {
                self.target_to_sources.put(label_hash, canonical)?;
            }
        }

        self.flush().context("flushing file index")?;
        Ok(())
    }
}
