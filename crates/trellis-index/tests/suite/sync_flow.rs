//! End-to-end flow: all four updaters driven the way the sync
//! orchestrator drives them, across a full sync and a follow-up partial
//! sync.

use std::path::Path;

use trellis_core::TargetTags;
use trellis_index::{
    ExecutableTargetIndex, FileTargetIndex, SyncColdDiff, SyncIndexUpdater, SyncScope,
    TargetTreeIndex, TransitiveClosureIndex,
};

use super::fixture::Fixture;

struct Indices {
    files: FileTargetIndex,
    tree: TargetTreeIndex,
    executable: ExecutableTargetIndex,
    closure: TransitiveClosureIndex,
}

impl Indices {
    fn open(fixture: &Fixture) -> Self {
        Self {
            files: FileTargetIndex::open(&fixture.storage).unwrap(),
            tree: TargetTreeIndex::open(&fixture.storage).unwrap(),
            executable: ExecutableTargetIndex::open(&fixture.storage).unwrap(),
            closure: TransitiveClosureIndex::open(&fixture.storage).unwrap(),
        }
    }

    fn sync(&mut self, fixture: &Fixture, scope: SyncScope, diff: &SyncColdDiff) {
        let ctx = fixture.ctx(scope);
        // The file/tree/executable updaters own disjoint indices and can
        // run in any order; the closure rebuild needs the finalized
        // executable set.
        self.files.update_indexes(&ctx, diff).unwrap();
        self.tree.update_indexes(&ctx, diff).unwrap();
        self.executable.update_indexes(&ctx, diff).unwrap();
        self.closure.update_indexes(&ctx, &self.executable).unwrap();
    }
}

#[test]
fn full_sync_then_partial_removal_keeps_indices_consistent() {
    let mut fixture = Fixture::new();
    let core = fixture.add_target("//lib:core", TargetTags::LIBRARY, &["lib/core.rs"]);
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &["app/main.rs"]);
    let test = fixture.add_target(
        "//app:main_test",
        TargetTags::TEST.with(TargetTags::EXECUTABLE),
        &["app/main_test.rs"],
    );
    fixture.add_dep(app, core);
    fixture.add_dep(test, core);

    let mut indices = Indices::open(&fixture);
    let diff = fixture.changed_diff(&["//lib:core", "//app:main", "//app:main_test"]);
    indices.sync(&fixture, SyncScope::Full, &diff);

    let mut dependents = indices
        .closure
        .all_reverse_transitive_executable_target_ids(core, &indices.executable);
    dependents.sort_unstable();
    let mut expected = vec![app, test];
    expected.sort_unstable();
    assert_eq!(dependents, expected);
    assert_eq!(
        indices.files.targets_for_source(Path::new("/ws/lib/core.rs")).unwrap(),
        vec![core]
    );
    assert_eq!(indices.tree.entries_cached().unwrap().len(), 3);

    // Partial sync: the test target goes away.
    let removed = fixture.remove_target("//app:main_test");
    let diff = SyncColdDiff {
        changed: Vec::new(),
        removed: vec![removed],
    };
    indices.sync(&fixture, SyncScope::Partial, &diff);

    assert_eq!(
        indices
            .closure
            .all_reverse_transitive_executable_target_ids(core, &indices.executable),
        vec![app]
    );
    assert!(!indices.executable.contains(test));
    assert!(indices
        .files
        .targets_for_source(Path::new("/ws/app/main_test.rs"))
        .unwrap()
        .is_empty());
    assert_eq!(indices.tree.entries_cached().unwrap().len(), 2);
}
