use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::FollowPathError;

/// Account id assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        NodeId(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Username(value.to_string())
    }
}

/// Start-to-target node sequence, never repeating a node.
pub type Path = Vec<NodeId>;

/// Outgoing follow edges of one node, sorted and deduplicated.
pub type Neighbors = Vec<NodeId>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub start: NodeId,
    pub target: NodeId,
    /// Maximum node count per path (hop count is one less).
    pub max_depth: usize,
}

impl SearchRequest {
    pub fn new(start: NodeId, target: NodeId, max_depth: usize) -> Self {
        Self {
            start,
            target,
            max_depth,
        }
    }

    pub fn validate(&self) -> Result<(), FollowPathError> {
        if self.max_depth == 0 {
            return Err(FollowPathError::invalid_input(
                "max_depth must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub paths: Vec<Path>,
    pub error: Option<String>,
}

impl SearchResult {
    pub fn found(paths: Vec<Path>) -> Self {
        Self { paths, error: None }
    }

    pub fn empty_with<T: Into<String>>(diagnostic: T) -> Self {
        Self {
            paths: Vec::new(),
            error: Some(diagnostic.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Which traversal answers a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    /// Every minimal-length path (breadth-first with depth-aware pruning).
    #[default]
    Shortest,
    /// Every simple path up to the depth bound (depth-first).
    Exhaustive,
    /// Shortest-length paths under single visitation, fetched layer by layer
    /// with concurrent fan-out. Faster, but may miss some minimal paths.
    LevelParallel,
}

impl FromStr for SearchAlgorithm {
    type Err = FollowPathError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "shortest" | "bfs" => Ok(SearchAlgorithm::Shortest),
            "exhaustive" | "dfs" | "all" => Ok(SearchAlgorithm::Exhaustive),
            "level_parallel" | "level-parallel" | "parallel" => {
                Ok(SearchAlgorithm::LevelParallel)
            }
            other => Err(FollowPathError::invalid_input(format!(
                "unknown algorithm {other}"
            ))),
        }
    }
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchAlgorithm::Shortest => "shortest",
            SearchAlgorithm::Exhaustive => "exhaustive",
            SearchAlgorithm::LevelParallel => "level_parallel",
        };
        f.write_str(name)
    }
}

/// True when `path` never repeats a node.
pub fn is_simple_path(path: &[NodeId]) -> bool {
    let mut seen = ahash::AHashSet::with_capacity(path.len());
    path.iter().all(|node| seen.insert(*node))
}
