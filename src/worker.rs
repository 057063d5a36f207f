//! One search request as an isolated unit of work.
//!
//! Every run opens its own store connection and adapter, so the cache and
//! connection of one task are never visible to another. Errors never escape
//! [`SearchWorker::run`]; they come back inside the [`WorkerOutcome`].

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    adapter::GraphAdapter,
    errors::FollowPathError,
    retry::RetryPolicy,
    search::{SearchOptions, run_search},
    store::{GraphStore, StoreConnector},
    types::{SearchRequest, Username},
};

pub const USERS_NOT_FOUND: &str = "user(s) not found";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub source: String,
    pub paths: Option<Vec<Vec<Username>>>,
    pub error: Option<FollowPathError>,
}

impl WorkerOutcome {
    pub fn succeeded(source: &str, paths: Vec<Vec<Username>>) -> Self {
        Self {
            source: source.to_string(),
            paths: Some(paths),
            error: None,
        }
    }

    pub fn failed(source: &str, error: FollowPathError) -> Self {
        Self {
            source: source.to_string(),
            paths: None,
            error: Some(error),
        }
    }

    pub fn path_count(&self) -> usize {
        self.paths.as_ref().map_or(0, Vec::len)
    }
}

pub struct SearchWorker<C> {
    connector: C,
    policy: RetryPolicy,
    options: SearchOptions,
    cancel: CancellationToken,
}

impl<C: StoreConnector> SearchWorker<C> {
    pub fn new(connector: C, policy: RetryPolicy, options: SearchOptions) -> Self {
        Self {
            connector,
            policy,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn run(&self, source: &str, target: &str, max_depth: usize) -> WorkerOutcome {
        match self.execute(source, target, max_depth).await {
            Ok(paths) => WorkerOutcome::succeeded(source, paths),
            Err(err) => {
                if !matches!(err, FollowPathError::NotFound(_)) {
                    warn!(source, target, error = %err, "search task failed");
                }
                WorkerOutcome::failed(source, err)
            }
        }
    }

    async fn execute(
        &self,
        source: &str,
        target: &str,
        max_depth: usize,
    ) -> Result<Vec<Vec<Username>>, FollowPathError> {
        let store = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(FollowPathError::cancelled("cancelled before connecting"));
            }
            store = self.connector.connect() => store?,
        };
        let adapter = GraphAdapter::connect(store, self.policy.clone(), self.cancel.clone()).await?;
        let result = search_usernames(&adapter, source, target, max_depth, &self.options).await;
        let stats = adapter.close();
        debug!(
            source,
            remote_calls = stats.remote_calls,
            cache_hits = stats.cache_hits,
            degraded = stats.degraded_calls,
            "search task released its store"
        );
        result
    }
}

/// Resolves both endpoints, runs the configured search and maps the paths
/// back to usernames. Paths with an id that no longer resolves are dropped.
pub async fn search_usernames<S: GraphStore>(
    adapter: &GraphAdapter<S>,
    origin: &str,
    target: &str,
    max_depth: usize,
    options: &SearchOptions,
) -> Result<Vec<Vec<Username>>, FollowPathError> {
    let origin_id = adapter.resolve_id(origin).await?;
    let target_id = adapter.resolve_id(target).await?;
    let (Some(start), Some(goal)) = (origin_id, target_id) else {
        return Err(FollowPathError::not_found(USERS_NOT_FOUND));
    };
    let request = SearchRequest::new(start, goal, max_depth);
    let paths = run_search(adapter, &request, options).await?;
    let mut named = Vec::with_capacity(paths.len());
    for path in &paths {
        if let Some(names) = adapter.resolve_usernames(path).await? {
            named.push(names);
        }
    }
    Ok(named)
}
