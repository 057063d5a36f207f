use serde::{Deserialize, Serialize};

use crate::{
    adapter::GraphAdapter,
    errors::FollowPathError,
    store::GraphStore,
    types::{Path, SearchRequest},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustiveOptions {
    /// Keep expanding a branch after it reached the target, until the depth
    /// bound. Such branches can never record another path (the target is
    /// already on them), so turning this off only saves neighbor fetches.
    pub expand_past_target: bool,
}

impl Default for ExhaustiveOptions {
    fn default() -> Self {
        Self {
            expand_past_target: true,
        }
    }
}

/// Every simple path from `start` to `target` with at most `max_depth`
/// nodes, in depth-first order.
///
/// Iterative: each stack frame owns its path, so sibling branches never
/// share a buffer. Cost is exponential in the branching factor; the depth
/// bound is the only limit.
pub async fn all_simple_paths<S: GraphStore>(
    adapter: &GraphAdapter<S>,
    request: &SearchRequest,
    options: ExhaustiveOptions,
) -> Result<Vec<Path>, FollowPathError> {
    request.validate()?;
    let SearchRequest {
        start,
        target,
        max_depth,
    } = *request;
    let mut found = Vec::new();
    let mut stack: Vec<Path> = vec![vec![start]];

    while let Some(path) = stack.pop() {
        adapter.ensure_active()?;
        let Some(&current) = path.last() else {
            return Err(FollowPathError::internal("empty frame on dfs stack"));
        };
        if current == target {
            found.push(path.clone());
            if !options.expand_past_target {
                continue;
            }
        }
        if path.len() >= max_depth {
            continue;
        }
        let neighbors = adapter.neighbors(current).await?;
        // Reverse push keeps neighbor order on pop.
        for &neighbor in neighbors.iter().rev() {
            if path.contains(&neighbor) {
                continue;
            }
            let mut next = Vec::with_capacity(path.len() + 1);
            next.extend_from_slice(&path);
            next.push(neighbor);
            stack.push(next);
        }
    }
    Ok(found)
}
