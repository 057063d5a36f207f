use std::time::Instant;

use ahash::AHashSet;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use crate::{
    adapter::GraphAdapter,
    errors::FollowPathError,
    store::GraphStore,
    types::{Neighbors, NodeId, Path, SearchRequest},
};

/// Shortest-length paths found layer by layer, with the neighbor fetches of
/// each layer running concurrently (at most `fan_out` in flight).
///
/// Every node except the target is expanded at most once, so unlike
/// [`super::all_shortest_paths`] this can miss minimal paths that reach an
/// intermediate node by a second route at the same depth. Every returned
/// path does have the minimal length. All parents in the first layer that
/// touches the target contribute a path.
pub async fn level_parallel_shortest_paths<S: GraphStore>(
    adapter: &GraphAdapter<S>,
    request: &SearchRequest,
    fan_out: usize,
) -> Result<Vec<Path>, FollowPathError> {
    request.validate()?;
    let SearchRequest {
        start,
        target,
        max_depth,
    } = *request;
    if start == target {
        return Ok(vec![vec![start]]);
    }
    let fan_out = fan_out.max(1);
    let started = Instant::now();
    let mut visited = AHashSet::new();
    visited.insert(start);
    let mut layer: Vec<Path> = vec![vec![start]];
    let mut depth = 1;

    while !layer.is_empty() && depth < max_depth {
        adapter.ensure_active()?;
        let frontier = layer
            .iter()
            .map(|path| {
                path.last()
                    .copied()
                    .ok_or_else(|| FollowPathError::internal("empty path in layer"))
            })
            .collect::<Result<Vec<NodeId>, _>>()?;
        let expansions: Vec<(usize, Neighbors)> = stream::iter(frontier.into_iter().enumerate())
            .map(|(idx, node)| async move {
                adapter.neighbors(node).await.map(|neighbors| (idx, neighbors))
            })
            .buffered(fan_out)
            .try_collect()
            .await?;

        // Layer barrier: visitation is updated only after every fetch landed.
        let mut found = Vec::new();
        let mut next_layer = Vec::new();
        for (idx, neighbors) in expansions {
            let path = &layer[idx];
            for neighbor in neighbors {
                if neighbor == target {
                    found.push(extend(path, neighbor));
                } else if visited.insert(neighbor) {
                    next_layer.push(extend(path, neighbor));
                }
            }
        }
        depth += 1;
        debug!(
            depth,
            expanded = layer.len(),
            next = next_layer.len(),
            found = found.len(),
            "level-parallel layer complete"
        );
        if !found.is_empty() {
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                paths = found.len(),
                "level-parallel search reached target"
            );
            return Ok(found);
        }
        layer = next_layer;
    }
    Ok(Vec::new())
}

fn extend(path: &Path, node: NodeId) -> Path {
    let mut next = Vec::with_capacity(path.len() + 1);
    next.extend_from_slice(path);
    next.push(node);
    next
}
