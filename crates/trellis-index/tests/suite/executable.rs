use trellis_core::TargetTags;
use trellis_index::{BuildTargetInfo, ExecutableTargetIndex, SyncColdDiff, SyncIndexUpdater, SyncScope};

use super::fixture::Fixture;

#[test]
fn tracks_executable_targets_from_diff() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);
    let lib = fixture.add_target("//lib:core", TargetTags::LIBRARY, &[]);

    let mut index = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main", "//lib:core"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    assert!(index.contains(app));
    assert!(!index.contains(lib));
    assert_eq!(index.len(), 1);
}

#[test]
fn removal_is_unconditional() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);

    let mut index = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    assert!(index.contains(app));

    let removed = fixture.remove_target("//app:main");
    let diff = SyncColdDiff {
        changed: Vec::new(),
        removed: vec![removed],
    };
    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();
    assert!(!index.contains(app));
}

#[test]
fn changed_target_that_lost_the_tag_is_dropped() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);

    let mut index = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    assert!(index.contains(app));

    // The target is still present but no longer tagged executable.
    fixture.set_target_info(
        "//app:main",
        BuildTargetInfo {
            tags: TargetTags::LIBRARY,
            sources: Vec::new(),
            display_name: None,
            in_universe: true,
        },
    );
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();
    assert!(!index.contains(app));
}

#[test]
fn unresolvable_items_are_skipped_not_fatal() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);
    let ghost = fixture.add_target("//app:ghost", TargetTags::EXECUTABLE, &[]);
    // The resolver loses the target while it stays in the diff.
    fixture.resolver.remove(&trellis_core::Label::parse("//app:ghost").unwrap());

    let mut index = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main", "//app:ghost"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    // The resolvable half of the diff is still applied.
    assert!(index.contains(app));
    assert!(!index.contains(ghost));
}

#[test]
fn applying_the_same_diff_twice_is_idempotent() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);

    let mut index = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);

    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    let first: Vec<_> = {
        let mut ids: Vec<_> = index.ids().iter().copied().collect();
        ids.sort_unstable();
        ids
    };

    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();
    let mut second: Vec<_> = index.ids().iter().copied().collect();
    second.sort_unstable();

    assert_eq!(first, second);
    assert!(index.contains(app));
}

#[test]
fn full_sync_resets_stale_state() {
    let mut fixture = Fixture::new();
    let old = fixture.add_target("//app:old", TargetTags::EXECUTABLE, &[]);
    let new = fixture.add_target("//app:new", TargetTags::EXECUTABLE, &[]);

    let mut index = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:old", "//app:new"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    assert!(index.contains(old));

    // A full sync whose diff no longer mentions //app:old starts from an
    // empty set.
    let diff = fixture.changed_diff(&["//app:new"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    assert!(!index.contains(old));
    assert!(index.contains(new));
}
