//! The executable-target index: the persisted set of vertex ids currently
//! tagged executable. The transitive-closure rebuild consumes this set, so
//! within a sync this updater runs before the closure one.

use anyhow::Context;
use hashbrown::HashSet;

use trellis_core::{TargetTags, VertexId};
use trellis_storage::codec::{versioned, HashSetCodec, VertexIdCodec};
use trellis_storage::{FlatStore, StorageContext, StorageError, StorageHints};

use crate::context::{SyncColdDiff, SyncContext};
use crate::updater::SyncIndexUpdater;

pub struct ExecutableTargetIndex {
    store: FlatStore<HashSet<VertexId>>,
}

impl ExecutableTargetIndex {
    pub fn open(storage: &StorageContext) -> Result<Self, StorageError> {
        let store = storage.flat_store(
            "index.executableTargets",
            StorageHints::UseInMemory,
            versioned(1, HashSetCodec(VertexIdCodec)),
            HashSet::new,
        )?;
        Ok(Self { store })
    }

    pub fn ids(&self) -> &HashSet<VertexId> {
        self.store.get()
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.store.get().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.store.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.get().is_empty()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.store.flush()
    }
}

impl SyncIndexUpdater for ExecutableTargetIndex {
    fn update_indexes(
        &mut self,
        ctx: &SyncContext<'_>,
        diff: &SyncColdDiff,
    ) -> anyhow::Result<()> {
        if ctx.scope.is_full() {
            self.store.reset();
        }

        let (changed, removed) = diff.split();

        for target in removed {
            self.store.mutate(|set| {
                set.remove(&target.vertex_id);
            });
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

            if info.tags.contains(TargetTags::EXECUTABLE) {
                self.store.mutate(|set| {
                    set.insert(target.vertex_id);
                });
            } else {
                // A still-present target that lost the tag is dropped here;
                // the closure rebuild reads this set as-is.
                self.store.mutate(|set| {
                    set.remove(&target.vertex_id);
                });
            }
        }

        self.store
            .flush()
            .context("flushing executable-target index")?;
        Ok(())
    }
}
