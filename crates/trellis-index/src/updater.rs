use crate::context::{SyncColdDiff, SyncContext};

/// An independent service owning one derived index.
///
/// Updaters are driven by the sync orchestrator with the diff for the
/// current pass. Each updater processes the removal half of its diff
/// before the addition half (an id can be removed and re-added with new
/// content in the same diff), skips unresolvable items, and is idempotent
/// per diff. Relative ordering *between* updaters is unconstrained; they
/// own disjoint indices.
pub trait SyncIndexUpdater {
    fn update_indexes(
        &mut self,
        ctx: &SyncContext<'_>,
        diff: &SyncColdDiff,
    ) -> anyhow::Result<()>;
}
