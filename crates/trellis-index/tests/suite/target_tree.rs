use trellis_core::{TargetTags, TreeFlag};
use trellis_index::{BuildTargetInfo, SyncColdDiff, SyncIndexUpdater, SyncScope, TargetTreeIndex};

use super::fixture::Fixture;

#[test]
fn indexes_universe_targets_with_derived_flags() {
    let mut fixture = Fixture::new();
    fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);
    fixture.add_target("//app:main_test", TargetTags::TEST.with(TargetTags::EXECUTABLE), &[]);
    fixture.add_target("//gen:stubs", TargetTags::NO_BUILD, &[]);
    fixture.add_target("//lib:core", TargetTags::LIBRARY, &[]);

    let mut index = TargetTreeIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main", "//app:main_test", "//gen:stubs", "//lib:core"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    let entries = index.entries_cached().unwrap();
    assert_eq!(entries.len(), 4);

    let flag_of = |label: &str| {
        let label = trellis_core::Label::parse(label).unwrap();
        index.entry(&label).unwrap().expect("entry present").flag
    };
    assert_eq!(flag_of("//app:main"), Some(TreeFlag::Runnable));
    // TEST wins over EXECUTABLE.
    assert_eq!(flag_of("//app:main_test"), Some(TreeFlag::Testable));
    assert_eq!(flag_of("//gen:stubs"), Some(TreeFlag::NoBuild));
    assert_eq!(flag_of("//lib:core"), None);
}

#[test]
fn non_universe_targets_are_not_indexed() {
    let mut fixture = Fixture::new();
    fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);
    fixture.set_target_info(
        "//app:main",
        BuildTargetInfo {
            tags: TargetTags::EXECUTABLE,
            sources: Vec::new(),
            display_name: None,
            in_universe: false,
        },
    );

    let mut index = TargetTreeIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    assert!(index.entries_cached().unwrap().is_empty());
}

#[test]
fn cache_is_invalidated_by_updates() {
    let mut fixture = Fixture::new();
    fixture.add_target("//app:main", TargetTags::EXECUTABLE, &[]);

    let mut index = TargetTreeIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    let before = index.entries_cached().unwrap();
    assert_eq!(before.len(), 1);

    let removed = fixture.remove_target("//app:main");
    let diff = SyncColdDiff {
        changed: Vec::new(),
        removed: vec![removed],
    };
    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();

    // The earlier snapshot is untouched; the next read recomputes from the
    // authoritative store.
    assert_eq!(before.len(), 1);
    assert!(index.entries_cached().unwrap().is_empty());
}

#[test]
fn entries_are_sorted_by_label() {
    let mut fixture = Fixture::new();
    fixture.add_target("//zeta:z", TargetTags::LIBRARY, &[]);
    fixture.add_target("//alpha:a", TargetTags::LIBRARY, &[]);
    fixture.add_target("//mid:m", TargetTags::LIBRARY, &[]);

    let mut index = TargetTreeIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//zeta:z", "//alpha:a", "//mid:m"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    let entries = index.entries_cached().unwrap();
    let labels: Vec<String> = entries.iter().map(|entry| entry.label.to_string()).collect();
    let mut sorted = labels.clone();
    sorted.sort();
    assert_eq!(labels, sorted);
}

#[test]
fn display_name_falls_back_to_short_label() {
    let mut fixture = Fixture::new();
    fixture.add_target("//lib/net:net", TargetTags::LIBRARY, &[]);

    let mut index = TargetTreeIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//lib/net:net"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    let label = trellis_core::Label::parse("//lib/net:net").unwrap();
    let entry = index.entry(&label).unwrap().unwrap();
    assert_eq!(entry.display_name, "//lib/net");
}
