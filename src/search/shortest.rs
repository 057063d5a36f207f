use std::collections::VecDeque;

use ahash::AHashMap;

use crate::{
    adapter::GraphAdapter,
    errors::FollowPathError,
    store::GraphStore,
    types::{NodeId, Path, SearchRequest},
};

/// Every simple path of minimal length from `start` to `target` with at most
/// `max_depth` nodes.
///
/// A neighbor is enqueued only at the shallowest depth it has been seen at,
/// so routes reaching a node at the same minimal depth all survive while
/// longer detours are pruned. Cycle checks are per path. Paths leave the
/// queue in non-decreasing length, so draining stops at the first path
/// longer than the first hit.
pub async fn all_shortest_paths<S: GraphStore>(
    adapter: &GraphAdapter<S>,
    request: &SearchRequest,
) -> Result<Vec<Path>, FollowPathError> {
    request.validate()?;
    let SearchRequest {
        start,
        target,
        max_depth,
    } = *request;
    let mut queue: VecDeque<Path> = VecDeque::new();
    let mut best_depth: AHashMap<NodeId, usize> = AHashMap::new();
    let mut found = Vec::new();
    let mut min_length: Option<usize> = None;
    queue.push_back(vec![start]);
    best_depth.insert(start, 1);

    while let Some(path) = queue.pop_front() {
        adapter.ensure_active()?;
        if let Some(min) = min_length
            && path.len() > min
        {
            break;
        }
        let Some(&current) = path.last() else {
            return Err(FollowPathError::internal("empty partial path in queue"));
        };
        if current == target {
            min_length.get_or_insert(path.len());
            found.push(path);
            continue;
        }
        if path.len() >= max_depth {
            continue;
        }
        let next_depth = path.len() + 1;
        for neighbor in adapter.neighbors(current).await? {
            if path.contains(&neighbor) {
                continue;
            }
            if let Some(&seen) = best_depth.get(&neighbor)
                && seen < next_depth
            {
                continue;
            }
            best_depth.insert(neighbor, next_depth);
            let mut next = Vec::with_capacity(next_depth);
            next.extend_from_slice(&path);
            next.push(neighbor);
            queue.push_back(next);
        }
    }
    Ok(found)
}
