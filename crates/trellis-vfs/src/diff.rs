//! The classified file diff handed to the sync pipeline.

use std::path::PathBuf;

use trellis_core::normalize_path;

use crate::classify::ClassifiedFile;
use crate::state::{FileState, FileStateIndex};

/// Added/removed/changed classified files accumulated since the previous
/// sync, the input to the downstream target-diff computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncFileDiff {
    pub added: Vec<ClassifiedFile>,
    pub removed: Vec<ClassifiedFile>,
    pub changed: Vec<ClassifiedFile>,
}

impl SyncFileDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// Drains the accumulator, classifies every path, and merges files
/// explicitly touched by a partial sync scope (reported as changed unless
/// the watcher already recorded them).
pub fn compute_file_diff(index: &mut FileStateIndex, touched: &[PathBuf]) -> SyncFileDiff {
    let mut diff = SyncFileDiff::default();
    let mut seen: hashbrown::HashSet<PathBuf> = hashbrown::HashSet::new();

    for (path, state) in index.drain() {
        let path = normalize_path(&path);
        if !seen.insert(path.clone()) {
            continue;
        }
        let file = ClassifiedFile::new(path);
        match state {
            FileState::Added => diff.added.push(file),
            FileState::Removed => diff.removed.push(file),
            FileState::Changed => diff.changed.push(file),
        }
    }

    for path in touched {
        let path = normalize_path(path);
        if seen.insert(path.clone()) {
            diff.changed.push(ClassifiedFile::new(path));
        }
    }

    // Drain order is map order; keep the result stable for consumers.
    diff.added.sort_by(|a, b| a.path.cmp(&b.path));
    diff.removed.sort_by(|a, b| a.path.cmp(&b.path));
    diff.changed.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        target = "trellis.vfs",
        added = diff.added.len(),
        removed = diff.removed.len(),
        changed = diff.changed.len(),
        "computed file diff"
    );
    diff
}
