use nodeflow_core::db::{open_db, open_db_in_memory, DbError};
use nodeflow_core::repo::workspace_repo::DEFAULT_HISTORY_CAPACITY;
use nodeflow_core::{
    SqliteWorkspaceRepository, StoreError, Workspace, WorkspaceRepository, WorkspaceSnapshot,
};
use rusqlite::Connection;

fn snapshot_with_counter(next_node_id: u64) -> WorkspaceSnapshot {
    WorkspaceSnapshot {
        next_node_id,
        ..WorkspaceSnapshot::default()
    }
}

#[test]
fn save_then_load_reproduces_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    assert!(repo.load_snapshot().unwrap().is_none());

    let mut workspace = Workspace::with_default_page();
    let root = workspace.active_page().unwrap().nodes[0].id;
    let child = workspace.add_child(root).unwrap();
    workspace.set_notes(child, "kept");
    let snapshot = workspace.snapshot();

    repo.save_snapshot(&snapshot).unwrap();
    let loaded = repo.load_snapshot().unwrap().expect("snapshot should be stored");
    assert_eq!(loaded, snapshot);

    let restored = Workspace::from_snapshot(loaded);
    assert_eq!(restored, workspace);
}

#[test]
fn save_overwrites_single_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();

    repo.save_snapshot(&snapshot_with_counter(2)).unwrap();
    repo.save_snapshot(&snapshot_with_counter(7)).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM workspace_records;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(repo.load_snapshot().unwrap().unwrap().next_node_id, 7);
}

#[test]
fn pending_changes_drain_in_insertion_order_and_clear_by_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();

    let first = repo.enqueue_pending_change(&snapshot_with_counter(2)).unwrap();
    let second = repo.enqueue_pending_change(&snapshot_with_counter(3)).unwrap();
    let third = repo.enqueue_pending_change(&snapshot_with_counter(4)).unwrap();

    let drained = repo.drain_pending_changes().unwrap();
    let ids: Vec<i64> = drained.entries.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![first, second, third]);
    assert_eq!(drained.entries[2].payload.next_node_id, 4);

    // Draining only reads.
    assert_eq!(repo.drain_pending_changes().unwrap().len(), 3);

    repo.clear_pending_change(second).unwrap();
    repo.clear_pending_change(9_999).unwrap();
    let ids: Vec<i64> = repo
        .drain_pending_changes()
        .unwrap()
        .all_ids();
    assert_eq!(ids, vec![first, third]);
}

#[test]
fn corrupt_pending_entry_is_reported_by_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let valid = repo.enqueue_pending_change(&snapshot_with_counter(2)).unwrap();
    conn.execute(
        "INSERT INTO pending_changes (workspace_id, payload) VALUES ('default', 'garbage');",
        [],
    )
    .unwrap();
    let corrupt = conn.last_insert_rowid();

    let drained = repo.drain_pending_changes().unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained.entries.len(), 1);
    assert_eq!(drained.entries[0].payload.next_node_id, 2);
    assert_eq!(drained.corrupt_ids, vec![corrupt]);
    assert_eq!(drained.all_ids(), vec![valid, corrupt]);
    // A corrupt row written last hides the older valid entry.
    assert!(drained.latest_valid().is_none());
}

#[test]
fn corrupt_history_entry_is_skipped() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    repo.push_history_snapshot(&snapshot_with_counter(2)).unwrap();
    conn.execute(
        "INSERT INTO history_snapshots (workspace_id, payload) VALUES ('default', 'garbage');",
        [],
    )
    .unwrap();
    repo.push_history_snapshot(&snapshot_with_counter(3)).unwrap();

    let counters: Vec<u64> = repo
        .list_history()
        .unwrap()
        .iter()
        .map(|entry| entry.payload.next_node_id)
        .collect();
    assert_eq!(counters, vec![2, 3]);
}

#[test]
fn history_ring_keeps_newest_entries() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    assert_eq!(repo.history_capacity(), DEFAULT_HISTORY_CAPACITY);

    for counter in 1..=25 {
        repo.push_history_snapshot(&snapshot_with_counter(counter)).unwrap();
    }

    let history = repo.list_history().unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].payload.next_node_id, 6);
    assert_eq!(history[19].payload.next_node_id, 25);
}

#[test]
fn custom_history_capacity_is_honored() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default")
        .unwrap()
        .with_history_capacity(3);

    for counter in 1..=5 {
        repo.push_history_snapshot(&snapshot_with_counter(counter)).unwrap();
    }
    let counters: Vec<u64> = repo
        .list_history()
        .unwrap()
        .iter()
        .map(|entry| entry.payload.next_node_id)
        .collect();
    assert_eq!(counters, vec![3, 4, 5]);
}

#[test]
fn workspace_keys_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let left = SqliteWorkspaceRepository::try_new(&conn, "left").unwrap();
    let right = SqliteWorkspaceRepository::try_new(&conn, "right").unwrap();

    left.save_snapshot(&snapshot_with_counter(5)).unwrap();
    left.enqueue_pending_change(&snapshot_with_counter(5)).unwrap();

    assert!(right.load_snapshot().unwrap().is_none());
    assert!(right.drain_pending_changes().unwrap().is_empty());
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
        repo.save_snapshot(&Workspace::with_default_page().snapshot())
            .unwrap();
        repo.enqueue_pending_change(&snapshot_with_counter(3)).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let loaded = repo.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded.pages.len(), 1);
    assert_eq!(repo.drain_pending_changes().unwrap().len(), 1);
}

#[test]
fn unmigrated_connection_is_rejected() {
    let conn = Connection::open_in_memory().unwrap();
    let err = match SqliteWorkspaceRepository::try_new(&conn, "default") {
        Ok(_) => panic!("unmigrated connection should be rejected"),
        Err(err) => err,
    };
    assert!(matches!(
        err,
        StoreError::Db(DbError::NotMigrated { found: 0, .. })
    ));
}

#[test]
fn legacy_record_loads_with_documented_defaults() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO workspace_records (id, data) VALUES ('default', ?1);",
        [r#"{"pages":[{"id":4,"name":"Old","nodes":[{"id":9,"label":"Old","x":1,"y":2,"isRoot":true}],"edges":[]}],"activePageId":4}"#],
    )
    .unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();

    let workspace = Workspace::from_snapshot(repo.load_snapshot().unwrap().unwrap());
    let node = workspace.node(9).expect("legacy node should load");
    assert_eq!(node.notes, "");
    assert!(!node.collapsed);
    assert!(!node.manual_position);
    assert_eq!(node.status, nodeflow_core::NodeStatus::None);
    assert!(workspace.next_node_id() > 9);
    assert!(workspace.next_page_id() > 4);
}
