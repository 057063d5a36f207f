#![allow(dead_code)]

use followpath::{
    GraphAdapter, NodeId, RetryPolicy,
    store::{FollowGraph, MemoryConnector, MemoryFollowStore},
};
use tokio_util::sync::CancellationToken;

pub const A: NodeId = NodeId(1);
pub const B: NodeId = NodeId(2);
pub const C: NodeId = NodeId(3);
pub const D: NodeId = NodeId(4);

/// a→b, b→c, a→d, d→c
pub fn diamond() -> FollowGraph {
    let mut graph = FollowGraph::new();
    graph
        .add_profile(A, "ana")
        .add_profile(B, "bia")
        .add_profile(C, "caio")
        .add_profile(D, "duda");
    graph
        .add_follow(A, B)
        .add_follow(B, C)
        .add_follow(A, D)
        .add_follow(D, C);
    graph
}

pub fn ids(raw: &[i64]) -> Vec<NodeId> {
    raw.iter().copied().map(NodeId).collect()
}

pub async fn adapter_over(graph: FollowGraph) -> GraphAdapter<MemoryFollowStore> {
    GraphAdapter::connect(
        MemoryFollowStore::new(graph),
        RetryPolicy::fixed(),
        CancellationToken::new(),
    )
    .await
    .expect("adapter")
}

pub async fn adapter_from_edges(edges: &[(i64, i64)]) -> GraphAdapter<MemoryFollowStore> {
    adapter_over(FollowGraph::from_edges(edges)).await
}

pub fn diamond_connector() -> MemoryConnector {
    MemoryConnector::new(diamond())
}

pub fn sorted(mut paths: Vec<Vec<NodeId>>) -> Vec<Vec<NodeId>> {
    paths.sort();
    paths
}
