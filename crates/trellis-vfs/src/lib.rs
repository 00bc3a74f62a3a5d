//! Filesystem-change classification and accumulation for Trellis syncs.
//!
//! Raw watcher events flow into a [`FileStateIndex`], which keeps one net
//! `Added`/`Removed`/`Changed` state per path. Each sync drains the
//! accumulator through [`compute_file_diff`], classifying every path by
//! name ([`FileKind`]) and merging files explicitly touched by a partial
//! sync scope. The watcher boundary itself is the [`FileWatcher`] trait;
//! an OS backend is available behind the `watch-notify` feature.

mod classify;
mod diff;
mod state;
mod watch;

pub use classify::{
    ClassifiedFile, FileKind, WatchFilter, BUILD_FILE_NAMES, STARLARK_EXTENSION,
    WORKSPACE_FILE_NAMES,
};
pub use diff::{compute_file_diff, SyncFileDiff};
pub use state::{FileState, FileStateIndex};
pub use watch::{
    FileChange, FileChangeKind, FileWatcher, ManualFileWatcher, ManualFileWatcherHandle,
    WatchEvent, WatchMessage,
};

#[cfg(feature = "watch-notify")]
pub use watch::NotifyWatcher;
