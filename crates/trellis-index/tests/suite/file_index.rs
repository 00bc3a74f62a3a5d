use std::path::{Path, PathBuf};

use trellis_core::TargetTags;
use trellis_index::{BuildTargetInfo, FileTargetIndex, SyncColdDiff, SyncIndexUpdater, SyncScope};

use super::fixture::Fixture;

#[test]
fn maps_sources_to_targets_and_back() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target(
        "//app:main",
        TargetTags::EXECUTABLE,
        &["app/main.rs", "app/args.rs"],
    );

    let mut index = FileTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    // Declared references resolve against the workspace root.
    assert_eq!(
        index.targets_for_source(Path::new("/ws/app/main.rs")).unwrap(),
        vec![app]
    );
    let label = trellis_core::Label::parse("//app:main").unwrap();
    let mut sources = index.sources_for_target(&label).unwrap();
    sources.sort();
    assert_eq!(
        sources,
        vec![PathBuf::from("/ws/app/args.rs"), PathBuf::from("/ws/app/main.rs")]
    );
}

#[test]
fn removing_a_target_leaves_shared_buckets_intact() {
    let mut fixture = Fixture::new();
    // Two targets declare the same source, so they share one hash bucket.
    let gen = fixture.add_target("//proto:gen", TargetTags::LIBRARY, &["proto/api.rs"]);
    let lib = fixture.add_target("//proto:lib", TargetTags::LIBRARY, &["proto/api.rs", "proto/ext.rs"]);

    let mut index = FileTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//proto:gen", "//proto:lib"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();

    let mut owners = index.targets_for_source(Path::new("/ws/proto/api.rs")).unwrap();
    owners.sort_unstable();
    let mut expected = vec![gen, lib];
    expected.sort_unstable();
    assert_eq!(owners, expected);

    let removed = fixture.remove_target("//proto:gen");
    let diff = SyncColdDiff {
        changed: Vec::new(),
        removed: vec![removed],
    };
    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();

    // The shared bucket keeps the surviving owner; the removed target's
    // private association is gone entirely.
    assert_eq!(
        index.targets_for_source(Path::new("/ws/proto/api.rs")).unwrap(),
        vec![lib]
    );
    assert_eq!(
        index.targets_for_source(Path::new("/ws/proto/ext.rs")).unwrap(),
        vec![lib]
    );
    let gen_label = trellis_core::Label::parse("//proto:gen").unwrap();
    assert!(index.sources_for_target(&gen_label).unwrap().is_empty());
}

#[test]
fn changed_target_replaces_its_source_set() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &["app/old.rs"]);

    let mut index = FileTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    assert_eq!(
        index.targets_for_source(Path::new("/ws/app/old.rs")).unwrap(),
        vec![app]
    );

    fixture.set_target_info(
        "//app:main",
        BuildTargetInfo {
            tags: TargetTags::EXECUTABLE,
            sources: vec![PathBuf::from("app/new.rs")],
            display_name: None,
            in_universe: true,
        },
    );
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();

    assert!(index
        .targets_for_source(Path::new("/ws/app/old.rs"))
        .unwrap()
        .is_empty());
    assert_eq!(
        index.targets_for_source(Path::new("/ws/app/new.rs")).unwrap(),
        vec![app]
    );
}

#[test]
fn applying_the_same_diff_twice_is_idempotent() {
    let mut fixture = Fixture::new();
    let app = fixture.add_target("//app:main", TargetTags::EXECUTABLE, &["app/main.rs"]);

    let mut index = FileTargetIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//app:main"]);
    index
        .update_indexes(&fixture.ctx(SyncScope::Full), &diff)
        .unwrap();
    index
        .update_indexes(&fixture.ctx(SyncScope::Partial), &diff)
        .unwrap();

    assert_eq!(
        index.targets_for_source(Path::new("/ws/app/main.rs")).unwrap(),
        vec![app]
    );
}
