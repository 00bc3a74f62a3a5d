//! The target-tree index: per-target display metadata for universe
//! targets, plus a lazily-rebuilt list snapshot for the presentation
//! layer.

use std::io::{Read, Write};
use std::sync::{Arc, RwLock};

use anyhow::Context;

use trellis_core::{Label, TreeFlag};
use trellis_storage::codec::{versioned, Codec, Hash128Codec, LabelCodec, OptionCodec, StringCodec};
use trellis_storage::{CodecError, Hash128, SortedKvStore, StorageContext, StorageError, StorageHints};

use crate::context::{SyncColdDiff, SyncContext};
use crate::updater::SyncIndexUpdater;

/// Display metadata for one universe target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTreeEntry {
    pub label: Label,
    pub display_name: String,
    pub flag: Option<TreeFlag>,
}

struct TreeFlagCodec;

impl Codec<TreeFlag> for TreeFlagCodec {
    fn encode(&self, w: &mut dyn Write, value: &TreeFlag) -> Result<(), CodecError> {
        let tag: u8 = match value {
            TreeFlag::Testable => 0,
            TreeFlag::Runnable => 1,
            TreeFlag::NoBuild => 2,
        };
        w.write_all(&[tag])?;
        Ok(())
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TreeFlag, CodecError> {
        let mut tag = [0u8; 1];
        r.read_exact(&mut tag)?;
        match tag[0] {
            0 => Ok(TreeFlag::Testable),
            1 => Ok(TreeFlag::Runnable),
            2 => Ok(TreeFlag::NoBuild),
            tag => Err(CodecError::InvalidTag {
                tag,
                type_name: "TreeFlag",
            }),
        }
    }
}

pub struct TargetTreeEntryCodec;

impl Codec<TargetTreeEntry> for TargetTreeEntryCodec {
    fn encode(&self, w: &mut dyn Write, value: &TargetTreeEntry) -> Result<(), CodecError> {
        LabelCodec.encode(w, &value.label)?;
        StringCodec.encode(w, &value.display_name)?;
        OptionCodec(TreeFlagCodec).encode(w, &value.flag)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TargetTreeEntry, CodecError> {
        Ok(TargetTreeEntry {
            label: LabelCodec.decode(r)?,
            display_name: StringCodec.decode(r)?,
            flag: OptionCodec(TreeFlagCodec).decode(r)?,
        })
    }
}

pub struct TargetTreeIndex {
    entries: SortedKvStore<Hash128, TargetTreeEntry>,
    /// Read-through list snapshot. Invalidation (on update) and
    /// recomputation (on read, from the authoritative store) are distinct
    /// steps, so readers never see a half-updated list.
    cached: RwLock<Option<Arc<Vec<TargetTreeEntry>>>>,
}

impl TargetTreeIndex {
    pub fn open(storage: &StorageContext) -> Result<Self, StorageError> {
        Ok(Self {
            entries: storage.sorted_kv_store(
                "index.targetTree",
                StorageHints::UseInMemory,
                Hash128Codec,
                versioned(1, TargetTreeEntryCodec),
            )?,
            cached: RwLock::new(None),
        })
    }

    pub fn entry(&self, label: &Label) -> Result<Option<TargetTreeEntry>, StorageError> {
        self.entries.get(&Hash128::of_label(label))
    }

    /// The current entry list, sorted by label, rebuilt from the store on
    /// first read after an update.
    pub fn entries_cached(&self) -> Result<Arc<Vec<TargetTreeEntry>>, StorageError> {
        if let Some(cached) = self
            .cached
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
        {
            return Ok(cached);
        }

        let mut entries = self.entries.values()?;
        entries.sort_by(|a, b| a.label.cmp(&b.label));
        let snapshot = Arc::new(entries);

        if let Ok(mut guard) = self.cached.write() {
            *guard = Some(Arc::clone(&snapshot));
        }
        Ok(snapshot)
    }

    fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.entries.flush()
    }
}

impl SyncIndexUpdater for TargetTreeIndex {
    fn update_indexes(
        &mut self,
        ctx: &SyncContext<'_>,
        diff: &SyncColdDiff,
    ) -> anyhow::Result<()> {
        if ctx.scope.is_full() {
            self.entries.clear();
        }

        let (changed, removed) = diff.split();

        for target in removed {
            self.entries.remove(&Hash128::of_label(&target.label))?;
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
            if !info.in_universe {
                // Only universe targets are first-class in the tree.
                self.entries.remove(&label_hash)?;
                continue;
            }

            let entry = TargetTreeEntry {
                display_name: info
                    .display_name
                    .clone()
                    .unwrap_or_else(|| target.label.to_short_string()),
                flag: TreeFlag::derive(info.tags),
                label: target.label.clone(),
            };
            self.entries.put(label_hash, entry)?;
        }

        self.invalidate_cache();
        self.flush().context("flushing target-tree index")?;
        Ok(())
    }
}
