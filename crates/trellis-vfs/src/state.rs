//! Accumulated per-path file state between syncs.

use std::path::{Path, PathBuf};

use crate::watch::{FileChange, FileChangeKind, WatchEvent};

/// Net state of one path since the accumulator was last drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    Added,
    Removed,
    Changed,
}

/// Accumulates watcher events into one net state per path.
///
/// Overwrite precedence collapses event sequences to what the next sync
/// needs to know: a create over a recorded removal is a content change; a
/// modify over a recorded add stays an add (the file is still new to the
/// index); a delete over a recorded add cancels the entry outright.
#[derive(Debug, Default)]
pub struct FileStateIndex {
    states: hashbrown::HashMap<PathBuf, FileState>,
}

impl FileStateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: impl Into<PathBuf>, event: FileChangeKind) {
        let path = path.into();
        let previous = self.states.get(&path).copied();

        let next = match event {
            FileChangeKind::Created => match previous {
                Some(FileState::Removed) => Some(FileState::Changed),
                Some(FileState::Added) | None => Some(FileState::Added),
                Some(FileState::Changed) => Some(FileState::Changed),
            },
            FileChangeKind::Modified => match previous {
                Some(FileState::Added) => Some(FileState::Added),
                _ => Some(FileState::Changed),
            },
            FileChangeKind::Deleted => match previous {
                // Created and deleted between drains: the index never saw
                // the file, so there is nothing to report.
                Some(FileState::Added) => None,
                _ => Some(FileState::Removed),
            },
        };

        match next {
            Some(state) => {
                self.states.insert(path, state);
            }
            None => {
                self.states.remove(&path);
            }
        }
    }

    pub fn apply_change(&mut self, change: &FileChange) {
        self.record(change.path.clone(), change.kind);
    }

    pub fn apply_event(&mut self, event: &WatchEvent) {
        for change in event.changes() {
            self.apply_change(change);
        }
    }

    pub fn state_of(&self, path: &Path) -> Option<FileState> {
        self.states.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Takes the accumulated map, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<(PathBuf, FileState)> {
        self.states.drain().collect()
    }
}
