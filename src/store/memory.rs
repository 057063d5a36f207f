use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use ahash::AHashMap;
use async_trait::async_trait;

use super::{GraphStore, StoreConnector};
use crate::{
    errors::FollowPathError,
    fault_injection::{FaultPlan, FaultPoint},
    types::{NodeId, Username},
};

/// Immutable snapshot of profiles and follow edges.
#[derive(Clone, Debug, Default)]
pub struct FollowGraph {
    ids: AHashMap<String, NodeId>,
    usernames: AHashMap<NodeId, Username>,
    following: AHashMap<NodeId, Vec<NodeId>>,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph whose accounts are named `user{id}`.
    pub fn from_edges(edges: &[(i64, i64)]) -> Self {
        let mut graph = Self::new();
        for &(from, to) in edges {
            graph.add_profile(NodeId(from), format!("user{from}"));
            graph.add_profile(NodeId(to), format!("user{to}"));
            graph.add_follow(NodeId(from), NodeId(to));
        }
        graph
    }

    pub fn add_profile<T: Into<String>>(&mut self, id: NodeId, username: T) -> &mut Self {
        let username = username.into();
        self.ids.insert(username.clone(), id);
        self.usernames.insert(id, Username(username));
        self
    }

    /// Records "`follower` follows `followed`".
    pub fn add_follow(&mut self, follower: NodeId, followed: NodeId) -> &mut Self {
        let list = self.following.entry(follower).or_default();
        if !list.contains(&followed) {
            list.push(followed);
        }
        self
    }

    pub fn profile_count(&self) -> usize {
        self.usernames.len()
    }

    pub fn follow_count(&self) -> usize {
        self.following.values().map(Vec::len).sum()
    }

    pub fn following_of(&self, id: NodeId) -> &[NodeId] {
        self.following.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCounters {
    pub pings: usize,
    pub id_lookups: usize,
    pub username_lookups: usize,
    /// Round trips to `fetch_following`, regardless of how many ids each carried.
    pub following_fetches: usize,
}

#[derive(Default)]
struct AtomicCounters {
    pings: AtomicUsize,
    id_lookups: AtomicUsize,
    username_lookups: AtomicUsize,
    following_fetches: AtomicUsize,
}

/// In-process store over a shared [`FollowGraph`], with call counters and
/// injectable faults.
pub struct MemoryFollowStore {
    graph: Arc<FollowGraph>,
    faults: Arc<FaultPlan>,
    counters: AtomicCounters,
}

impl MemoryFollowStore {
    pub fn new(graph: FollowGraph) -> Self {
        Self::shared(Arc::new(graph), Arc::new(FaultPlan::new()))
    }

    pub fn shared(graph: Arc<FollowGraph>, faults: Arc<FaultPlan>) -> Self {
        Self {
            graph,
            faults,
            counters: AtomicCounters::default(),
        }
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    pub fn graph(&self) -> &FollowGraph {
        &self.graph
    }

    pub fn counters(&self) -> StoreCounters {
        StoreCounters {
            pings: self.counters.pings.load(Ordering::Relaxed),
            id_lookups: self.counters.id_lookups.load(Ordering::Relaxed),
            username_lookups: self.counters.username_lookups.load(Ordering::Relaxed),
            following_fetches: self.counters.following_fetches.load(Ordering::Relaxed),
        }
    }

    async fn enter(&self, point: FaultPoint, counter: &AtomicUsize) -> Result<(), FollowPathError> {
        counter.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.faults.latency() {
            tokio::time::sleep(latency).await;
        }
        self.faults.check(point)
    }
}

#[async_trait]
impl GraphStore for MemoryFollowStore {
    async fn ping(&self) -> Result<(), FollowPathError> {
        self.enter(FaultPoint::Ping, &self.counters.pings).await
    }

    async fn lookup_id(&self, username: &str) -> Result<Option<NodeId>, FollowPathError> {
        self.enter(FaultPoint::LookupId, &self.counters.id_lookups)
            .await?;
        Ok(self.graph.ids.get(username).copied())
    }

    async fn lookup_username(&self, id: NodeId) -> Result<Option<Username>, FollowPathError> {
        self.enter(FaultPoint::LookupUsername, &self.counters.username_lookups)
            .await?;
        Ok(self.graph.usernames.get(&id).cloned())
    }

    async fn fetch_following(
        &self,
        ids: &[NodeId],
    ) -> Result<Vec<(NodeId, NodeId)>, FollowPathError> {
        self.enter(FaultPoint::FetchFollowing, &self.counters.following_fetches)
            .await?;
        let mut rows = Vec::new();
        for &id in ids {
            for &followed in self.graph.following_of(id) {
                rows.push((id, followed));
            }
        }
        Ok(rows)
    }
}

/// Hands out independent [`MemoryFollowStore`] connections over one snapshot.
/// Connections share the snapshot and fault plan but count calls separately.
#[derive(Clone)]
pub struct MemoryConnector {
    graph: Arc<FollowGraph>,
    faults: Arc<FaultPlan>,
    connections: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new(graph: FollowGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            faults: Arc::new(FaultPlan::new()),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Connections opened so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Store = MemoryFollowStore;

    async fn connect(&self) -> Result<Self::Store, FollowPathError> {
        self.connections.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryFollowStore::shared(
            Arc::clone(&self.graph),
            Arc::clone(&self.faults),
        ))
    }
}
