//! Connection-path search over a social follow graph.
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod adapter;
pub mod batch;
pub mod bench_utils;
pub mod cache;
pub mod config;
pub mod errors;
pub mod fault_injection;
pub mod retry;
pub mod schema;
pub mod search;
pub mod service;
pub mod store;
pub mod types;
pub mod worker;

pub use crate::adapter::{AdapterStats, GraphAdapter};
pub use crate::batch::{BatchOrchestrator, BatchOutcomeRow, BatchReport, BatchRow, BatchSummary};
pub use crate::config::SearchConfig;
pub use crate::errors::FollowPathError;
pub use crate::retry::RetryPolicy;
pub use crate::search::{SearchOptions, run_search, search_result};
pub use crate::service::{PathFinder, PathQueryResponse};
pub use crate::store::{GraphStore, StoreConnector};
pub use crate::types::{NodeId, Path, SearchAlgorithm, SearchRequest, SearchResult, Username};
pub use crate::worker::{SearchWorker, WorkerOutcome};
