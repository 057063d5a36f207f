//! Graph store adapter: id/username resolution and follow-edge lookups
//! with a per-instance neighbor cache and retry/backoff.
//!
//! Lookups that still fail after the retry budget degrade to "not found" /
//! "no neighbors" so one unreachable node only thins out a search. Two
//! conditions do surface as errors: an unreachable store at construction
//! ([`FollowPathError::StoreUnavailable`]) and cancellation
//! ([`FollowPathError::Cancelled`]), which every call checks first.

use std::time::Duration;

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cache::AdjacencyCache,
    errors::FollowPathError,
    retry::{RetryOutcome, RetryPolicy, retry_with_backoff},
    store::GraphStore,
    types::{Neighbors, NodeId, Username},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Store calls issued, retries included.
    pub remote_calls: usize,
    pub cache_hits: usize,
    /// Lookups answered with an empty result after retries ran out.
    pub degraded_calls: usize,
    pub backoff_waited: Duration,
}

pub struct GraphAdapter<S> {
    store: S,
    cache: AdjacencyCache,
    policy: RetryPolicy,
    cancel: CancellationToken,
    stats: Mutex<AdapterStats>,
}

impl<S: GraphStore> GraphAdapter<S> {
    /// Probes the store before handing out an adapter. A store that stays
    /// unreachable through the retry budget is fatal.
    pub async fn connect(
        store: S,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Result<Self, FollowPathError> {
        let adapter = Self {
            store,
            cache: AdjacencyCache::new(),
            policy,
            cancel,
            stats: Mutex::new(AdapterStats::default()),
        };
        let outcome =
            retry_with_backoff(&adapter.policy, "ping", &adapter.cancel, || adapter.store.ping())
                .await;
        adapter.record(&outcome);
        match outcome.value {
            Ok(()) => Ok(adapter),
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => Err(FollowPathError::store_unavailable(format!(
                "graph store unreachable: {err}"
            ))),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cache(&self) -> &AdjacencyCache {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> AdapterStats {
        *self.stats.lock()
    }

    /// Fails fast once the search has been cancelled.
    pub fn ensure_active(&self) -> Result<(), FollowPathError> {
        if self.cancel.is_cancelled() {
            return Err(FollowPathError::cancelled("search cancelled"));
        }
        Ok(())
    }

    pub async fn resolve_id(&self, username: &str) -> Result<Option<NodeId>, FollowPathError> {
        self.ensure_active()?;
        let outcome = retry_with_backoff(&self.policy, "lookup_id", &self.cancel, || {
            self.store.lookup_id(username)
        })
        .await;
        self.record(&outcome);
        self.degrade(outcome.value, "lookup_id", None)
    }

    pub async fn resolve_username(&self, id: NodeId) -> Result<Option<Username>, FollowPathError> {
        self.ensure_active()?;
        let outcome = retry_with_backoff(&self.policy, "lookup_username", &self.cancel, || {
            self.store.lookup_username(id)
        })
        .await;
        self.record(&outcome);
        self.degrade(outcome.value, "lookup_username", None)
    }

    /// Resolves every id of `path`; `None` if any of them is unknown.
    pub async fn resolve_usernames(
        &self,
        path: &[NodeId],
    ) -> Result<Option<Vec<Username>>, FollowPathError> {
        let mut names = Vec::with_capacity(path.len());
        for &id in path {
            match self.resolve_username(id).await? {
                Some(name) => names.push(name),
                None => return Ok(None),
            }
        }
        Ok(Some(names))
    }

    /// Accounts `id` follows. Cache hits never touch the store.
    pub async fn neighbors(&self, id: NodeId) -> Result<Neighbors, FollowPathError> {
        self.ensure_active()?;
        if let Some(cached) = self.cache.get(id) {
            self.stats.lock().cache_hits += 1;
            return Ok(cached);
        }
        let ids = [id];
        let outcome = retry_with_backoff(&self.policy, "fetch_following", &self.cancel, || {
            self.store.fetch_following(&ids)
        })
        .await;
        self.record(&outcome);
        match outcome.value {
            Ok(rows) => {
                let neighbors = collect_neighbors(id, &rows);
                self.cache.insert(id, neighbors.clone());
                Ok(neighbors)
            }
            // Failed fetches are not cached; a later call may still succeed.
            Err(err) => self.degrade(Err(err), "fetch_following", Vec::new()),
        }
    }

    /// Neighbors of every id in `ids`: cached ids are answered locally, the
    /// rest with one store round trip whose rows are cached before returning.
    pub async fn neighbors_batch(
        &self,
        ids: &[NodeId],
    ) -> Result<AHashMap<NodeId, Neighbors>, FollowPathError> {
        self.ensure_active()?;
        let (hits, misses) = self.cache.partition(ids);
        let mut result: AHashMap<NodeId, Neighbors> = AHashMap::with_capacity(hits.len() + misses.len());
        if !hits.is_empty() {
            self.stats.lock().cache_hits += hits.len();
        }
        result.extend(hits);
        if misses.is_empty() {
            return Ok(result);
        }
        let outcome = retry_with_backoff(&self.policy, "fetch_following", &self.cancel, || {
            self.store.fetch_following(&misses)
        })
        .await;
        self.record(&outcome);
        match outcome.value {
            Ok(rows) => {
                let mut grouped: AHashMap<NodeId, Neighbors> =
                    misses.iter().map(|id| (*id, Vec::new())).collect();
                for (follower, followed) in rows {
                    if let Some(list) = grouped.get_mut(&follower) {
                        list.push(followed);
                    }
                }
                for (id, mut list) in grouped {
                    list.sort_unstable();
                    list.dedup();
                    self.cache.insert(id, list.clone());
                    result.insert(id, list);
                }
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                self.stats.lock().degraded_calls += 1;
                warn!(ids = misses.len(), error = %err, "batch neighbor fetch degraded to empty");
                for id in misses {
                    result.insert(id, Vec::new());
                }
            }
        }
        Ok(result)
    }

    /// Releases the store connection.
    pub fn close(self) -> AdapterStats {
        let stats = self.stats();
        debug!(
            remote_calls = stats.remote_calls,
            cache_hits = stats.cache_hits,
            cached_nodes = self.cache.len(),
            "adapter closed"
        );
        stats
    }

    fn record<T>(&self, outcome: &RetryOutcome<T>) {
        let mut stats = self.stats.lock();
        stats.remote_calls += outcome.attempts as usize;
        stats.backoff_waited += outcome.waited;
    }

    fn degrade<T>(
        &self,
        value: Result<T, FollowPathError>,
        operation: &str,
        fallback: T,
    ) -> Result<T, FollowPathError> {
        match value {
            Ok(value) => Ok(value),
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                self.stats.lock().degraded_calls += 1;
                warn!(operation, error = %err, "store lookup degraded to empty result");
                Ok(fallback)
            }
        }
    }
}

fn collect_neighbors(id: NodeId, rows: &[(NodeId, NodeId)]) -> Neighbors {
    let mut neighbors: Neighbors = rows
        .iter()
        .filter(|(follower, _)| *follower == id)
        .map(|(_, followed)| *followed)
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
}
