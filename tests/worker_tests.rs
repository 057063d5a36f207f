mod common;

use std::time::Duration;

use common::diamond_connector;
use followpath::{
    FollowPathError, NodeId, PathFinder, RetryPolicy, SearchAlgorithm, SearchConfig, SearchOptions,
    SearchWorker, StoreConnector, Username,
    fault_injection::FaultPoint,
    store::{FollowGraph, MemoryConnector},
};
use tokio_util::sync::CancellationToken;

fn names(raw: &[&str]) -> Vec<Username> {
    raw.iter().map(|name| Username::from(*name)).collect()
}

#[tokio::test]
async fn test_worker_resolves_paths_to_usernames() {
    let worker = SearchWorker::new(diamond_connector(), RetryPolicy::fixed(), SearchOptions::default());
    let outcome = worker.run("ana", "caio", 3).await;
    assert_eq!(outcome.source, "ana");
    assert!(outcome.error.is_none());
    let mut paths = outcome.paths.unwrap();
    paths.sort();
    assert_eq!(
        paths,
        vec![names(&["ana", "bia", "caio"]), names(&["ana", "duda", "caio"])]
    );
}

#[tokio::test]
async fn test_worker_opens_private_connection_per_run() {
    let connector = diamond_connector();
    let worker = SearchWorker::new(connector.clone(), RetryPolicy::fixed(), SearchOptions::default());
    worker.run("ana", "caio", 3).await;
    worker.run("bia", "caio", 3).await;
    assert_eq!(connector.connections(), 2);
}

#[tokio::test]
async fn test_unknown_user_yields_not_found() {
    let worker = SearchWorker::new(diamond_connector(), RetryPolicy::fixed(), SearchOptions::default());
    let outcome = worker.run("ghost", "caio", 3).await;
    assert!(outcome.paths.is_none());
    assert!(matches!(outcome.error, Some(FollowPathError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_store_fails_only_that_run() {
    let connector = diamond_connector();
    connector.faults().set_unreachable(true);
    let worker = SearchWorker::new(connector.clone(), RetryPolicy::fixed(), SearchOptions::default());
    let outcome = worker.run("ana", "caio", 3).await;
    assert!(matches!(
        outcome.error,
        Some(FollowPathError::StoreUnavailable(_))
    ));

    connector.faults().set_unreachable(false);
    let outcome = worker.run("ana", "caio", 3).await;
    assert_eq!(outcome.path_count(), 2);
}

#[tokio::test]
async fn test_cancelled_worker_reports_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let worker = SearchWorker::new(diamond_connector(), RetryPolicy::fixed(), SearchOptions::default())
        .with_cancel(cancel);
    let outcome = worker.run("ana", "caio", 3).await;
    assert!(outcome.error.unwrap().is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_path_when_username_lookup_degrades() {
    let mut graph = FollowGraph::new();
    graph
        .add_profile(NodeId(1), "ana")
        .add_profile(NodeId(2), "bia")
        .add_profile(NodeId(3), "caio");
    graph.add_follow(NodeId(1), NodeId(2)).add_follow(NodeId(2), NodeId(3));
    let connector = MemoryConnector::new(graph);
    // Three failures exhaust the retries for the first id of the only path.
    connector.faults().configure(FaultPoint::LookupUsername, 3);
    let worker = SearchWorker::new(connector, RetryPolicy::fixed(), SearchOptions::default());
    let outcome = worker.run("ana", "caio", 3).await;
    assert!(outcome.error.is_none());
    assert_eq!(outcome.paths, Some(Vec::new()));
}

#[tokio::test]
async fn test_find_shortest_paths_response_shape() {
    let finder = PathFinder::new(diamond_connector(), SearchConfig::default());
    let response = finder.find_shortest_paths("ana", "caio", 5).await;
    assert_eq!(response.origin, "ana");
    assert_eq!(response.target, "caio");
    assert_eq!(response.count, 2);
    assert!(response.error.is_none());
    assert!(response.paths.contains(&vec![
        "ana".to_string(),
        "bia".to_string(),
        "caio".to_string()
    ]));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["count"], 2);
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_find_paths_not_found_is_a_diagnostic() {
    let finder = PathFinder::new(diamond_connector(), SearchConfig::default());
    let response = finder.find_all_paths("ana", "nobody", 5).await;
    assert!(response.paths.is_empty());
    assert_eq!(response.count, 0);
    assert_eq!(response.error.as_deref(), Some("user(s) not found"));
}

#[tokio::test]
async fn test_find_all_paths_includes_longer_chains() {
    let graph = FollowGraph::from_edges(&[(1, 2), (2, 3), (1, 4), (4, 5), (5, 3)]);
    let finder = PathFinder::new(MemoryConnector::new(graph), SearchConfig::default());
    let shortest = finder.find_shortest_paths("user1", "user3", 5).await;
    let all = finder.find_all_paths("user1", "user3", 5).await;
    assert_eq!(shortest.count, 1);
    assert_eq!(all.count, 2);
}

#[tokio::test]
async fn test_shortest_uses_level_parallel_when_configured() {
    let graph = FollowGraph::from_edges(&[(1, 2), (1, 3), (2, 4), (3, 4), (4, 5)]);
    let complete = PathFinder::new(MemoryConnector::new(graph.clone()), SearchConfig::default());
    let parallel = PathFinder::new(
        MemoryConnector::new(graph),
        SearchConfig::default().with_algorithm(SearchAlgorithm::LevelParallel),
    );
    assert_eq!(complete.find_shortest_paths("user1", "user5", 5).await.count, 2);
    assert_eq!(parallel.find_shortest_paths("user1", "user5", 5).await.count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_down_response_has_error_not_panic() {
    let connector = diamond_connector();
    connector.faults().set_unreachable(true);
    let finder = PathFinder::new(connector, SearchConfig::default());
    let response = finder.find_shortest_paths("ana", "caio", 5).await;
    assert!(response.paths.is_empty());
    assert!(response.error.unwrap().contains("store unavailable"));
}

#[tokio::test(start_paused = true)]
async fn test_query_cancel_stops_slow_search() {
    let connector = diamond_connector();
    connector.faults().set_latency(Some(Duration::from_secs(10)));
    let finder = PathFinder::new(connector.clone(), SearchConfig::default());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        trigger.cancel();
    });
    let response = finder
        .query("ana", "caio", 5, SearchAlgorithm::Shortest, cancel)
        .await;
    assert!(response.paths.is_empty());
    assert!(response.error.unwrap().contains("cancelled"));
    // A fresh connection is unaffected by the cancelled one.
    assert!(connector.connect().await.is_ok());
}
