use followpath::{
    FollowPathError, GraphStore, NodeId, PathFinder, SearchConfig, StoreConnector, Username,
    bench_utils::{GraphShape, generate_graph},
    schema::{ensure_schema, insert_follow, upsert_profile},
    store::{SqliteConnector, SqliteFollowStore},
};
use rusqlite::Connection;
use tempfile::TempDir;

fn diamond_db(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("follows.db");
    let conn = Connection::open(&path).unwrap();
    ensure_schema(&conn).unwrap();
    let ana = upsert_profile(&conn, "ana").unwrap();
    let bia = upsert_profile(&conn, "bia").unwrap();
    let caio = upsert_profile(&conn, "caio").unwrap();
    let duda = upsert_profile(&conn, "duda").unwrap();
    insert_follow(&conn, ana, bia).unwrap();
    insert_follow(&conn, bia, caio).unwrap();
    insert_follow(&conn, ana, duda).unwrap();
    insert_follow(&conn, duda, caio).unwrap();
    path
}

#[tokio::test]
async fn test_sqlite_store_lookups() {
    let dir = TempDir::new().unwrap();
    let store = SqliteFollowStore::open(diamond_db(&dir)).unwrap();
    store.ping().await.unwrap();
    let ana = store.lookup_id("ana").await.unwrap().unwrap();
    assert_eq!(
        store.lookup_username(ana).await.unwrap(),
        Some(Username::from("ana"))
    );
    assert_eq!(store.lookup_id("nobody").await.unwrap(), None);
    assert_eq!(store.lookup_username(NodeId(999)).await.unwrap(), None);

    let rows = store.fetch_following(&[ana]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|(follower, _)| *follower == ana));
}

#[tokio::test]
async fn test_sqlite_fetch_spans_chunks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("line.db");
    let data = generate_graph(GraphShape::Line, 1200, 0);
    data.write_sqlite(&Connection::open(&path).unwrap()).unwrap();

    let store = SqliteFollowStore::open(&path).unwrap();
    let ids: Vec<NodeId> = (0..1200).map(NodeId).collect();
    let rows = store.fetch_following(&ids).await.unwrap();
    assert_eq!(rows.len(), 1199);
    assert_eq!(rows[0], (NodeId(0), NodeId(1)));
    assert_eq!(store.fetch_following(&[]).await.unwrap(), Vec::new());
}

#[tokio::test]
async fn test_missing_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let connector = SqliteConnector::new(dir.path().join("absent.db"));
    match connector.connect().await {
        Err(FollowPathError::StoreUnavailable(msg)) => assert!(msg.contains("does not exist")),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("missing database opened"),
    }
}

#[tokio::test]
async fn test_database_without_schema_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE other(x INTEGER);")
        .unwrap();
    assert!(matches!(
        SqliteFollowStore::open(&path),
        Err(FollowPathError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_path_finder_over_sqlite() {
    let dir = TempDir::new().unwrap();
    let finder = PathFinder::new(SqliteConnector::new(diamond_db(&dir)), SearchConfig::default());
    let response = finder.find_shortest_paths("ana", "caio", 3).await;
    assert_eq!(response.count, 2);
    let mut paths = response.paths;
    paths.sort();
    assert_eq!(paths[0], vec!["ana", "bia", "caio"]);
    assert_eq!(paths[1], vec!["ana", "duda", "caio"]);

    let missing = finder.find_all_paths("ana", "zeca", 3).await;
    assert_eq!(missing.error.as_deref(), Some("user(s) not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_generated_grid_has_expected_shortest_count() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid.db");
    let data = generate_graph(GraphShape::Grid2D { width: 3, height: 3 }, 9, 0);
    data.write_sqlite(&Connection::open(&path).unwrap()).unwrap();
    let finder = PathFinder::new(SqliteConnector::new(&path), SearchConfig::default());
    // Corner to corner on a 3x3 grid: C(4, 2) monotone routes of 5 nodes.
    let response = finder.find_shortest_paths("user0", "user8", 5).await;
    assert_eq!(response.count, 6);
}
