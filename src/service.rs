//! Username-level path queries for the API layer.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    config::SearchConfig,
    errors::FollowPathError,
    store::StoreConnector,
    types::SearchAlgorithm,
    worker::{SearchWorker, WorkerOutcome},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQueryResponse {
    pub origin: String,
    pub target: String,
    pub paths: Vec<Vec<String>>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathQueryResponse {
    fn from_outcome(origin: &str, target: &str, outcome: WorkerOutcome) -> Self {
        let paths: Vec<Vec<String>> = outcome
            .paths
            .unwrap_or_default()
            .into_iter()
            .map(|path| path.into_iter().map(|name| name.0).collect())
            .collect();
        Self {
            origin: origin.to_string(),
            target: target.to_string(),
            count: paths.len(),
            paths,
            error: outcome.error.as_ref().map(FollowPathError::diagnostic),
        }
    }
}

/// Entry point for shortest-path and all-path queries between two accounts.
/// Each query runs in its own [`SearchWorker`], so nothing is cached across
/// queries.
pub struct PathFinder<C> {
    connector: C,
    config: SearchConfig,
}

impl<C: StoreConnector + Clone> PathFinder<C> {
    pub fn new(connector: C, config: SearchConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Minimal-length paths. Uses the level-parallel search when the config
    /// selects it, the complete breadth-first search otherwise.
    pub async fn find_shortest_paths(
        &self,
        origin: &str,
        target: &str,
        max_depth: usize,
    ) -> PathQueryResponse {
        let algorithm = match self.config.algorithm {
            SearchAlgorithm::LevelParallel => SearchAlgorithm::LevelParallel,
            _ => SearchAlgorithm::Shortest,
        };
        self.query(origin, target, max_depth, algorithm, CancellationToken::new())
            .await
    }

    /// Every simple path within `max_depth` nodes. Exponential; meant for
    /// debugging and small depths.
    pub async fn find_all_paths(
        &self,
        origin: &str,
        target: &str,
        max_depth: usize,
    ) -> PathQueryResponse {
        self.query(
            origin,
            target,
            max_depth,
            SearchAlgorithm::Exhaustive,
            CancellationToken::new(),
        )
        .await
    }

    /// Like the two finders above, with the algorithm and cancellation
    /// chosen by the caller.
    pub async fn query(
        &self,
        origin: &str,
        target: &str,
        max_depth: usize,
        algorithm: SearchAlgorithm,
        cancel: CancellationToken,
    ) -> PathQueryResponse {
        let options = self.config.search_options().with_algorithm(algorithm);
        let worker = SearchWorker::new(self.connector.clone(), self.config.retry.clone(), options)
            .with_cancel(cancel);
        let outcome = worker.run(origin, target, max_depth).await;
        let response = PathQueryResponse::from_outcome(origin, target, outcome);
        info!(
            origin,
            target,
            max_depth,
            %algorithm,
            count = response.count,
            failed = response.error.is_some(),
            "path query answered"
        );
        response
    }
}
