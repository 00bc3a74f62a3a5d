//! Derived indices over the Trellis target graph.
//!
//! Each index is an independent service owning its own persisted stores,
//! updated incrementally from the target-level diff of a sync pass:
//!
//! - [`FileTargetIndex`]: source-file path ↔ target id.
//! - [`TargetTreeIndex`]: per-target display metadata for universe targets.
//! - [`ExecutableTargetIndex`]: the current set of executable target ids.
//! - [`TransitiveClosureIndex`]: reverse transitive closure over the
//!   executable universe, rebuilt in full each sync.
//!
//! All derived indices are pure functions of the vertex/edge set; they can
//! always be rebuilt from the graph and are never the source of truth.

mod closure;
mod context;
mod executable;
mod file_index;
mod target_tree;
mod updater;

pub use closure::{TransitiveClosureIndex, TransitiveClosureSnapshot, TransitiveClosureSnapshotCodec};
pub use context::{
    BuildTargetInfo, PathResolver, SyncColdDiff, SyncContext, SyncScope, TargetRef,
    TargetResolver, WorkspacePathResolver,
};
pub use executable::ExecutableTargetIndex;
pub use file_index::FileTargetIndex;
pub use target_tree::{TargetTreeEntry, TargetTreeEntryCodec, TargetTreeIndex};
pub use updater::SyncIndexUpdater;
