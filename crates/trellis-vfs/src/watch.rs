//! File watching.
//!
//! This crate owns all operating-system integration for file watching.
//! Higher layers depend only on the [`FileWatcher`] trait and the stable
//! [`WatchEvent`]/[`FileChange`] model. The OS backend (currently
//! notify-based) lives behind the `watch-notify` feature so low-level
//! consumers don't take on platform watcher dependencies.
//!
//! Backends are allowed to be lossy; the OS can coalesce and reorder
//! events. Consumers should treat events as hints and consult the
//! filesystem for authoritative state. A backend that drops events due to
//! overflow emits [`WatchEvent::Rescan`] so consumers can fall back to a
//! full rescan.
//!
//! Tests should prefer the deterministic [`ManualFileWatcher`] over real
//! OS watcher timing.

use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel as channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A normalized change to one path on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// An event produced by a file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// One or more normalized file changes; backends may batch.
    Changes { changes: Vec<FileChange> },
    /// The watcher dropped events; consumers should rescan watched roots.
    Rescan,
}

impl WatchEvent {
    pub fn changes(&self) -> &[FileChange] {
        match self {
            WatchEvent::Changes { changes } => changes,
            WatchEvent::Rescan => &[],
        }
    }
}

/// Message type delivered by a [`FileWatcher`]; backends surface errors
/// asynchronously on the same stream.
pub type WatchMessage = io::Result<WatchEvent>;

/// Event-driven watcher abstraction.
pub trait FileWatcher: Send {
    /// Begin watching `root` recursively.
    fn watch_root(&mut self, root: &Path) -> io::Result<()>;

    /// Stop watching `root`.
    fn unwatch_root(&mut self, root: &Path) -> io::Result<()>;

    /// Returns the receiver used to consume watcher events.
    fn receiver(&self) -> &channel::Receiver<WatchMessage>;

    /// Drains all currently pending events without blocking.
    fn poll(&mut self) -> io::Result<Vec<WatchEvent>> {
        let mut out = Vec::new();
        for msg in self.receiver().try_iter() {
            match msg {
                Ok(event) => out.push(event),
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }
}

const MANUAL_WATCH_QUEUE_CAPACITY: usize = 1024;

/// Deterministic watcher implementation for tests.
///
/// Does not interact with the OS; callers inject events manually via
/// [`ManualFileWatcher::push`] or a [`ManualFileWatcherHandle`]. Delivery
/// uses a bounded queue; injection returns `WouldBlock` when it is full.
#[derive(Debug)]
pub struct ManualFileWatcher {
    tx: channel::Sender<WatchMessage>,
    rx: channel::Receiver<WatchMessage>,
    watched: Vec<PathBuf>,
}

/// Cloneable handle for injecting events into a [`ManualFileWatcher`]
/// after it has been moved elsewhere.
#[derive(Debug, Clone)]
pub struct ManualFileWatcherHandle {
    tx: channel::Sender<WatchMessage>,
}

impl ManualFileWatcherHandle {
    pub fn push(&self, event: WatchEvent) -> io::Result<()> {
        self.tx
            .try_send(Ok(event))
            .map_err(|_| io::Error::from(io::ErrorKind::WouldBlock))
    }
}

impl ManualFileWatcher {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(MANUAL_WATCH_QUEUE_CAPACITY);
        Self {
            tx,
            rx,
            watched: Vec::new(),
        }
    }

    pub fn handle(&self) -> ManualFileWatcherHandle {
        ManualFileWatcherHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, event: WatchEvent) -> io::Result<()> {
        self.tx
            .try_send(Ok(event))
            .map_err(|_| io::Error::from(io::ErrorKind::WouldBlock))
    }

    pub fn push_error(&self, err: io::Error) -> io::Result<()> {
        self.tx
            .try_send(Err(err))
            .map_err(|_| io::Error::from(io::ErrorKind::WouldBlock))
    }

    pub fn watched_roots(&self) -> &[PathBuf] {
        &self.watched
    }
}

impl Default for ManualFileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatcher for ManualFileWatcher {
    fn watch_root(&mut self, root: &Path) -> io::Result<()> {
        self.watched.push(root.to_path_buf());
        Ok(())
    }

    fn unwatch_root(&mut self, root: &Path) -> io::Result<()> {
        self.watched.retain(|watched| watched != root);
        Ok(())
    }

    fn receiver(&self) -> &channel::Receiver<WatchMessage> {
        &self.rx
    }
}

#[cfg(feature = "watch-notify")]
pub use self::notify_backend::NotifyWatcher;

#[cfg(feature = "watch-notify")]
mod notify_backend {
    use super::*;

    use notify::{RecommendedWatcher, RecursiveMode, Watcher};

    const NOTIFY_QUEUE_CAPACITY: usize = 4096;

    /// OS file watcher backed by `notify`.
    pub struct NotifyWatcher {
        watcher: RecommendedWatcher,
        rx: channel::Receiver<WatchMessage>,
    }

    impl NotifyWatcher {
        pub fn new() -> io::Result<Self> {
            let (tx, rx) = channel::bounded(NOTIFY_QUEUE_CAPACITY);

            let watcher = notify::recommended_watcher(
                move |result: Result<notify::Event, notify::Error>| {
                    let message = match result {
                        Ok(event) => Ok(normalize_event(event)),
                        Err(err) => Err(io::Error::other(err)),
                    };
                    // Overflow drops the event; the bounded queue protects
                    // against event storms (branch switches, build output).
                    if tx.try_send(message).is_err() {
                        let _ = tx.try_send(Ok(WatchEvent::Rescan));
                        tracing::warn!(
                            target = "trellis.vfs",
                            "watcher queue overflow; emitted rescan"
                        );
                    }
                },
            )
            .map_err(io::Error::other)?;

            Ok(Self { watcher, rx })
        }
    }

    fn normalize_event(event: notify::Event) -> WatchEvent {
        use notify::EventKind;

        if event.need_rescan() {
            return WatchEvent::Rescan;
        }

        let kind = match event.kind {
            EventKind::Create(_) => FileChangeKind::Created,
            EventKind::Remove(_) => FileChangeKind::Deleted,
            EventKind::Modify(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {
                FileChangeKind::Modified
            }
        };

        WatchEvent::Changes {
            changes: event
                .paths
                .into_iter()
                .map(|path| FileChange::new(path, kind))
                .collect(),
        }
    }

    impl FileWatcher for NotifyWatcher {
        fn watch_root(&mut self, root: &Path) -> io::Result<()> {
            self.watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(io::Error::other)
        }

        fn unwatch_root(&mut self, root: &Path) -> io::Result<()> {
            self.watcher.unwatch(root).map_err(io::Error::other)
        }

        fn receiver(&self) -> &channel::Receiver<WatchMessage> {
            &self.rx
        }
    }
}
