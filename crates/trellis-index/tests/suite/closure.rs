use trellis_core::{TargetTags, VertexId};
use trellis_index::{ExecutableTargetIndex, SyncIndexUpdater, SyncScope, TransitiveClosureIndex};
use trellis_storage::StorageContext;

use super::fixture::Fixture;

/// Runs the executable updater and then the closure rebuild, in the order
/// the sync driver guarantees.
fn sync(
    fixture: &Fixture,
    scope: SyncScope,
    diff: &trellis_index::SyncColdDiff,
    executable: &mut ExecutableTargetIndex,
    closure: &mut TransitiveClosureIndex,
) {
    let ctx = fixture.ctx(scope);
    executable.update_indexes(&ctx, diff).unwrap();
    closure.update_indexes(&ctx, executable).unwrap();
}

#[test]
fn chain_reports_executable_dependent() {
    let mut fixture = Fixture::new();

    // c depends on b depends on a; only c is executable.
    let a = fixture.add_target("//lib:a", TargetTags::LIBRARY, &[]);
    let b = fixture.add_target("//lib:b", TargetTags::LIBRARY, &[]);
    let c = fixture.add_target("//app:c", TargetTags::EXECUTABLE, &[]);
    fixture.add_dep(c, b);
    fixture.add_dep(b, a);

    let mut executable = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let mut closure = TransitiveClosureIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//lib:a", "//lib:b", "//app:c"]);
    sync(&fixture, SyncScope::Full, &diff, &mut executable, &mut closure);

    for vertex in [a, b, c] {
        assert_eq!(
            closure.all_reverse_transitive_executable_target_ids(vertex, &executable),
            vec![c],
            "vertex {vertex}"
        );
    }
}

#[test]
fn isolated_executable_includes_itself_only() {
    let mut fixture = Fixture::new();
    let d = fixture.add_target("//tools:d", TargetTags::EXECUTABLE, &[]);
    let plain = fixture.add_target("//lib:plain", TargetTags::LIBRARY, &[]);

    let mut executable = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let mut closure = TransitiveClosureIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//tools:d", "//lib:plain"]);
    sync(&fixture, SyncScope::Full, &diff, &mut executable, &mut closure);

    assert_eq!(
        closure.all_reverse_transitive_executable_target_ids(d, &executable),
        vec![d]
    );

    // A vertex with no dependents and no executable tag stores nothing and
    // answers with an empty result, not an error.
    assert!(closure
        .all_reverse_transitive_executable_target_ids(plain, &executable)
        .is_empty());
    assert!(!closure.snapshot().closures.contains_key(&plain));
}

#[test]
fn unknown_vertex_has_empty_result() {
    let fixture = Fixture::new();
    let executable = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let closure = TransitiveClosureIndex::open(&fixture.storage).unwrap();

    assert!(closure
        .all_reverse_transitive_executable_target_ids(VertexId::new(999), &executable)
        .is_empty());
    assert!(closure
        .all_reverse_transitive_target_ids(VertexId::new(999))
        .is_empty());
}

#[test]
fn diamond_merges_dependents() {
    let mut fixture = Fixture::new();

    // Two executables fan in to one shared library.
    let shared = fixture.add_target("//lib:shared", TargetTags::LIBRARY, &[]);
    let left = fixture.add_target("//app:left", TargetTags::EXECUTABLE, &[]);
    let right = fixture.add_target("//app:right", TargetTags::EXECUTABLE, &[]);
    let mid = fixture.add_target("//lib:mid", TargetTags::LIBRARY, &[]);
    fixture.add_dep(left, mid);
    fixture.add_dep(right, mid);
    fixture.add_dep(mid, shared);

    let mut executable = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let mut closure = TransitiveClosureIndex::open(&fixture.storage).unwrap();
    let diff = fixture.changed_diff(&["//lib:shared", "//app:left", "//app:right", "//lib:mid"]);
    sync(&fixture, SyncScope::Full, &diff, &mut executable, &mut closure);

    let mut dependents =
        closure.all_reverse_transitive_executable_target_ids(shared, &executable);
    dependents.sort_unstable();
    let mut expected = vec![left, right];
    expected.sort_unstable();
    assert_eq!(dependents, expected);
}

#[test]
fn full_rebuild_matches_incremental_syncs() {
    // One full sync over the final graph...
    let mut full = Fixture::new();
    let a_full = full.add_target("//lib:a", TargetTags::LIBRARY, &[]);
    let b_full = full.add_target("//app:b", TargetTags::EXECUTABLE, &[]);
    full.add_dep(b_full, a_full);

    let mut full_exec = ExecutableTargetIndex::open(&full.storage).unwrap();
    let mut full_closure = TransitiveClosureIndex::open(&full.storage).unwrap();
    let diff = full.changed_diff(&["//lib:a", "//app:b"]);
    sync(&full, SyncScope::Full, &diff, &mut full_exec, &mut full_closure);

    // ...versus incremental partial syncs reaching the same state.
    let mut incremental = Fixture::new();
    let a_inc = incremental.add_target("//lib:a", TargetTags::LIBRARY, &[]);
    let mut inc_exec = ExecutableTargetIndex::open(&incremental.storage).unwrap();
    let mut inc_closure = TransitiveClosureIndex::open(&incremental.storage).unwrap();
    let diff = incremental.changed_diff(&["//lib:a"]);
    sync(
        &incremental,
        SyncScope::Partial,
        &diff,
        &mut inc_exec,
        &mut inc_closure,
    );

    let b_inc = incremental.add_target("//app:b", TargetTags::EXECUTABLE, &[]);
    incremental.add_dep(b_inc, a_inc);
    let diff = incremental.changed_diff(&["//app:b"]);
    sync(
        &incremental,
        SyncScope::Partial,
        &diff,
        &mut inc_exec,
        &mut inc_closure,
    );

    // Vertex ids allocate identically in both fixtures, so the snapshots
    // must be bit-for-bit equivalent.
    assert_eq!(a_full, a_inc);
    assert_eq!(b_full, b_inc);
    assert_eq!(full_closure.snapshot(), inc_closure.snapshot());
}

#[test]
fn snapshot_persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();

    let (a, b);
    {
        let mut fixture =
            Fixture::with_storage(StorageContext::on_disk(dir.path()).unwrap());
        a = fixture.add_target("//lib:a", TargetTags::LIBRARY, &[]);
        b = fixture.add_target("//app:b", TargetTags::EXECUTABLE, &[]);
        fixture.add_dep(b, a);

        let mut executable = ExecutableTargetIndex::open(&fixture.storage).unwrap();
        let mut closure = TransitiveClosureIndex::open(&fixture.storage).unwrap();
        let diff = fixture.changed_diff(&["//lib:a", "//app:b"]);
        sync(&fixture, SyncScope::Full, &diff, &mut executable, &mut closure);
        fixture.graph.flush().unwrap();
    }

    let storage = StorageContext::on_disk(dir.path()).unwrap();
    let executable = ExecutableTargetIndex::open(&storage).unwrap();
    let closure = TransitiveClosureIndex::open(&storage).unwrap();

    assert!(executable.contains(b));
    assert_eq!(
        closure.all_reverse_transitive_executable_target_ids(a, &executable),
        vec![b]
    );
}

#[test]
fn deep_chain_does_not_overflow() {
    // The traversal must hold its own stack; a linear chain a few tens of
    // thousands deep would blow the call stack if it recursed.
    let mut fixture = Fixture::new();

    const DEPTH: usize = 50_000;
    let mut previous: Option<VertexId> = None;
    let mut labels = Vec::with_capacity(DEPTH);
    for n in 0..DEPTH {
        let label = format!("//deep:t{n}");
        let tags = if n == DEPTH - 1 {
            TargetTags::EXECUTABLE
        } else {
            TargetTags::LIBRARY
        };
        let id = fixture.add_target(&label, tags, &[]);
        if let Some(previous) = previous {
            // Each vertex depends on the one added before it.
            fixture.add_dep(id, previous);
        }
        previous = Some(id);
        labels.push(label);
    }

    let mut executable = ExecutableTargetIndex::open(&fixture.storage).unwrap();
    let mut closure = TransitiveClosureIndex::open(&fixture.storage).unwrap();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let diff = fixture.changed_diff(&label_refs);
    sync(&fixture, SyncScope::Full, &diff, &mut executable, &mut closure);

    let root = fixture.target_ref("//deep:t0").vertex_id;
    let top = fixture.target_ref(&format!("//deep:t{}", DEPTH - 1)).vertex_id;
    assert_eq!(
        closure.all_reverse_transitive_executable_target_ids(root, &executable),
        vec![top]
    );
}
