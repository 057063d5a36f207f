use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    errors::FollowPathError,
    retry::RetryPolicy,
    search::{ExhaustiveOptions, SearchOptions, default_fan_out},
    types::SearchAlgorithm,
};

pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_BATCH_MAX_DEPTH: usize = 3;
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 2000;
pub const DEFAULT_TASK_TIMEOUT_MS: u64 = DEFAULT_TASK_TIMEOUT_SECS * 1000;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 11;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_batch_max_depth() -> usize {
    DEFAULT_BATCH_MAX_DEPTH
}

fn default_task_timeout_ms() -> u64 {
    DEFAULT_TASK_TIMEOUT_MS
}

fn default_batch_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}

fn default_expand_past_target() -> bool {
    true
}

/// Tunables shared by interactive queries and batch runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Node-count bound for interactive queries.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_batch_max_depth")]
    pub batch_max_depth: usize,
    /// Per-row budget in batch mode, in milliseconds.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
    #[serde(default = "default_expand_past_target")]
    pub expand_past_target: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            batch_max_depth: DEFAULT_BATCH_MAX_DEPTH,
            task_timeout_ms: DEFAULT_TASK_TIMEOUT_MS,
            fan_out: default_fan_out(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            algorithm: SearchAlgorithm::default(),
            expand_past_target: true,
            retry: RetryPolicy::fixed(),
        }
    }
}

impl SearchConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_batch_max_depth(mut self, max_depth: usize) -> Self {
        self.batch_max_depth = max_depth;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_expand_past_target(mut self, expand: bool) -> Self {
        self.expand_past_target = expand;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            algorithm: self.algorithm,
            fan_out: self.fan_out,
            exhaustive: ExhaustiveOptions {
                expand_past_target: self.expand_past_target,
            },
        }
    }

    pub fn validate(&self) -> Result<(), FollowPathError> {
        if self.max_depth == 0 || self.batch_max_depth == 0 {
            return Err(FollowPathError::invalid_input(
                "search depth must be at least 1",
            ));
        }
        if self.fan_out == 0 {
            return Err(FollowPathError::invalid_input("fan_out must be at least 1"));
        }
        if self.batch_concurrency == 0 {
            return Err(FollowPathError::invalid_input(
                "batch_concurrency must be at least 1",
            ));
        }
        if self.task_timeout_ms == 0 {
            return Err(FollowPathError::invalid_input(
                "task timeout must be positive",
            ));
        }
        self.retry.validate()
    }
}
