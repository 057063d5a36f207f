//! Path search over the follow graph.
//!
//! Three traversals share one contract: paths are simple, start at
//! `request.start`, end at `request.target` and carry at most
//! `request.max_depth` nodes.
//!
//! | algorithm | returns |
//! |-----------|---------|
//! | [`all_shortest_paths`] | every minimal-length path |
//! | [`all_simple_paths`] | every path within the depth bound |
//! | [`level_parallel_shortest_paths`] | minimal-length paths under single visitation (may omit some) |

mod exhaustive;
mod level_parallel;
mod shortest;

use std::time::Instant;

use tracing::debug;

use crate::{
    adapter::GraphAdapter,
    errors::FollowPathError,
    store::GraphStore,
    types::{Path, SearchAlgorithm, SearchRequest, SearchResult},
};

pub use exhaustive::{ExhaustiveOptions, all_simple_paths};
pub use level_parallel::level_parallel_shortest_paths;
pub use shortest::all_shortest_paths;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    pub algorithm: SearchAlgorithm,
    /// Concurrent neighbor fetches per layer for the level-parallel search.
    pub fan_out: usize,
    pub exhaustive: ExhaustiveOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::default(),
            fan_out: default_fan_out(),
            exhaustive: ExhaustiveOptions::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }
}

/// Host parallelism, at least 1.
pub fn default_fan_out() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub async fn run_search<S: GraphStore>(
    adapter: &GraphAdapter<S>,
    request: &SearchRequest,
    options: &SearchOptions,
) -> Result<Vec<Path>, FollowPathError> {
    let started = Instant::now();
    let paths = match options.algorithm {
        SearchAlgorithm::Shortest => all_shortest_paths(adapter, request).await?,
        SearchAlgorithm::Exhaustive => {
            all_simple_paths(adapter, request, options.exhaustive).await?
        }
        SearchAlgorithm::LevelParallel => {
            level_parallel_shortest_paths(adapter, request, options.fan_out).await?
        }
    };
    debug!(
        algorithm = %options.algorithm,
        start = %request.start,
        target = %request.target,
        max_depth = request.max_depth,
        paths = paths.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search finished"
    );
    Ok(paths)
}

/// [`run_search`] with the error folded into the result's diagnostic.
pub async fn search_result<S: GraphStore>(
    adapter: &GraphAdapter<S>,
    request: &SearchRequest,
    options: &SearchOptions,
) -> SearchResult {
    match run_search(adapter, request, options).await {
        Ok(paths) => SearchResult::found(paths),
        Err(err) => SearchResult::empty_with(err.diagnostic()),
    }
}
