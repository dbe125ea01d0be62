use nodeflow_core::db::{open_db, open_db_in_memory};
use nodeflow_core::{
    BootSource, EngineConfig, InMemoryRemote, LegacyJsonFile, LegacySource, NoRemote, Point,
    RemoteStore, Session, SqliteWorkspaceRepository, Workspace, WorkspaceRepository,
    WorkspaceSnapshot,
};
use std::time::Instant;

fn named_snapshot(name: &str) -> WorkspaceSnapshot {
    let mut workspace = Workspace::new();
    workspace.add_page(Some(name), Point::ORIGIN);
    workspace.snapshot()
}

fn active_name<R, S>(session: &Session<R, S>) -> String
where
    R: WorkspaceRepository,
    S: RemoteStore,
{
    session.workspace().active_page().unwrap().name.clone()
}

#[test]
fn local_data_wins_over_remote_and_remote_is_left_alone() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    repo.save_snapshot(&named_snapshot("Local")).unwrap();
    let remote = InMemoryRemote::new();
    remote.seed("default", named_snapshot("Remote"));

    let mut session = Session::new(EngineConfig::default(), &repo, &remote, Instant::now());
    assert_eq!(session.boot(None), BootSource::Local);
    assert_eq!(active_name(&session), "Local");
    assert_eq!(remote.upsert_count(), 0);
    assert_eq!(
        remote.fetch("default").unwrap().unwrap().data.pages[0].name,
        "Remote"
    );
}

#[test]
fn remote_is_adopted_when_local_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let remote = InMemoryRemote::new();
    remote.seed("default", named_snapshot("Remote"));

    let mut session = Session::new(EngineConfig::default(), &repo, &remote, Instant::now());
    assert_eq!(session.boot(None), BootSource::Remote);
    assert_eq!(active_name(&session), "Remote");
    // Adopted state is written locally at boot.
    assert_eq!(repo.load_snapshot().unwrap().unwrap().pages[0].name, "Remote");
}

#[test]
fn legacy_file_beats_remote_and_is_consumed() {
    let dir = tempfile::tempdir().unwrap();
    let legacy_path = dir.path().join("nodeflow-v2.json");
    std::fs::write(
        &legacy_path,
        serde_json::to_string(&named_snapshot("Legacy")).unwrap(),
    )
    .unwrap();
    let legacy = LegacyJsonFile::new(&legacy_path);

    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let remote = InMemoryRemote::new();
    remote.seed("default", named_snapshot("Remote"));

    let mut session = Session::new(EngineConfig::default(), &repo, &remote, Instant::now());
    assert_eq!(
        session.boot(Some(&legacy as &dyn LegacySource)),
        BootSource::Legacy
    );
    assert_eq!(active_name(&session), "Legacy");
    assert!(!legacy_path.exists());
}

#[test]
fn nothing_anywhere_yields_default_page() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let remote = InMemoryRemote::new();
    remote.set_available(false);

    let mut session = Session::new(EngineConfig::default(), &repo, &remote, Instant::now());
    assert_eq!(session.boot(None), BootSource::Fresh);
    assert_eq!(active_name(&session), "My Notes");
    let root = session.workspace().active_page().unwrap().flagged_root().unwrap();
    assert_eq!((root.x, root.y), (0.0, 0.0));
}

#[test]
fn reload_from_file_store_never_regresses_counters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodeflow.db");
    let (pages, next_node_id, next_page_id) = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
        let now = Instant::now();
        let mut session = Session::new(EngineConfig::default(), &repo, NoRemote, now);
        session.boot(None);
        let root = session.workspace().active_page().unwrap().nodes[0].id;
        let child = session.workspace_mut().add_child(root).unwrap();
        session.workspace_mut().delete_node(child);
        session.workspace_mut().add_page(None, Point::ORIGIN);
        session.relayout();
        session.mark_dirty(true, now);
        let workspace = session.workspace();
        (
            workspace.pages().to_vec(),
            workspace.next_node_id(),
            workspace.next_page_id(),
        )
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let mut session = Session::new(EngineConfig::default(), &repo, NoRemote, Instant::now());
    assert_eq!(session.boot(None), BootSource::Local);
    assert_eq!(session.workspace().pages(), pages.as_slice());
    assert_eq!(session.workspace().next_node_id(), next_node_id);
    assert_eq!(session.workspace().next_page_id(), next_page_id);
}

#[test]
fn export_then_import_round_trips_and_empty_import_falls_back() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteWorkspaceRepository::try_new(&conn, "default").unwrap();
    let now = Instant::now();
    let mut session = Session::new(EngineConfig::default(), &repo, NoRemote, now);
    session.boot(None);
    let root = session.workspace().active_page().unwrap().nodes[0].id;
    session.workspace_mut().add_child(root);
    session.relayout();

    let exported = session.export_json().unwrap();
    let before = session.workspace().clone();
    session.import_json(&exported, now).unwrap();
    assert_eq!(session.workspace(), &before);

    session.import_json(r#"{"pages":[]}"#, now).unwrap();
    assert_eq!(session.workspace().pages().len(), 1);
    assert_eq!(active_name(&session), "My Notes");

    assert!(session.import_json("not json", now).is_err());
    assert_eq!(session.workspace().pages().len(), 1);
}
