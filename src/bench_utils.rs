//! Deterministic synthetic follow graphs for benches and tests.

use rand::{Rng, SeedableRng, rngs::StdRng};
use rusqlite::Connection;

use crate::{
    errors::FollowPathError,
    schema::{ensure_schema, insert_follow, insert_profile_with_id},
    store::FollowGraph,
    types::NodeId,
};

#[derive(Clone, Debug)]
pub struct FollowDataset {
    /// `(id, username)`, ids dense from 0.
    pub profiles: Vec<(NodeId, String)>,
    /// `(follower, followed)`, sorted.
    pub follows: Vec<(NodeId, NodeId)>,
}

impl FollowDataset {
    pub fn node_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn edge_count(&self) -> usize {
        self.follows.len()
    }

    pub fn username(&self, idx: usize) -> &str {
        &self.profiles[idx].1
    }

    pub fn out_degrees(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.profiles.len()];
        for (follower, _) in &self.follows {
            counts[follower.0 as usize] += 1;
        }
        counts
    }

    /// Account following the most others.
    pub fn hub_index(&self) -> usize {
        let mut best = (0usize, 0usize);
        for (idx, deg) in self.out_degrees().into_iter().enumerate() {
            if deg > best.0 {
                best = (deg, idx);
            }
        }
        best.1
    }

    pub fn to_follow_graph(&self) -> FollowGraph {
        let mut graph = FollowGraph::new();
        for (id, name) in &self.profiles {
            graph.add_profile(*id, name.clone());
        }
        for &(follower, followed) in &self.follows {
            graph.add_follow(follower, followed);
        }
        graph
    }

    /// Loads the dataset into `conn` in one transaction, creating the schema
    /// if needed.
    pub fn write_sqlite(&self, conn: &Connection) -> Result<(), FollowPathError> {
        ensure_schema(conn)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| FollowPathError::query(e.to_string()))?;
        for (id, name) in &self.profiles {
            insert_profile_with_id(&tx, id.0, name)?;
        }
        for (follower, followed) in &self.follows {
            insert_follow(&tx, follower.0, followed.0)?;
        }
        tx.commit()
            .map_err(|e| FollowPathError::query(e.to_string()))
    }
}

#[derive(Clone, Debug)]
pub enum GraphShape {
    /// 0 → 1 → … → n-1
    Line,
    /// Account 0 follows everyone else.
    Star,
    /// Each cell follows its right and lower neighbor.
    Grid2D { width: usize, height: usize },
    /// `edges` distinct pairs, each followed in a random direction.
    RandomErdosRenyi { edges: usize },
    /// Preferential attachment: every newcomer follows `m` popular accounts.
    ScaleFree { m: usize },
}

pub fn generate_graph(shape: GraphShape, node_count: usize, seed: u64) -> FollowDataset {
    assert!(node_count > 1, "node_count must exceed 1");
    let profiles = build_profiles(node_count);
    let mut follows = match shape {
        GraphShape::Line => generate_line_edges(node_count),
        GraphShape::Star => generate_star_edges(node_count),
        GraphShape::Grid2D { width, height } => generate_grid_edges(width, height, node_count),
        GraphShape::RandomErdosRenyi { edges } => generate_random_edges(node_count, edges, seed),
        GraphShape::ScaleFree { m } => generate_scale_free_edges(node_count, m, seed),
    };
    follows.sort_unstable();
    follows.dedup();
    FollowDataset { profiles, follows }
}

fn build_profiles(count: usize) -> Vec<(NodeId, String)> {
    (0..count)
        .map(|idx| (NodeId(idx as i64), format!("user{idx}")))
        .collect()
}

fn generate_line_edges(count: usize) -> Vec<(NodeId, NodeId)> {
    (0..count - 1).map(|idx| follow(idx, idx + 1)).collect()
}

fn generate_star_edges(count: usize) -> Vec<(NodeId, NodeId)> {
    (1..count).map(|leaf| follow(0, leaf)).collect()
}

fn generate_grid_edges(width: usize, height: usize, node_count: usize) -> Vec<(NodeId, NodeId)> {
    assert_eq!(
        width * height,
        node_count,
        "grid dimensions must match node count"
    );
    let mut edges = Vec::with_capacity(width * height * 2);
    for y in 0..height {
        for x in 0..width {
            let base = grid_index(x, y, width);
            if x + 1 < width {
                edges.push(follow(base, grid_index(x + 1, y, width)));
            }
            if y + 1 < height {
                edges.push(follow(base, grid_index(x, y + 1, width)));
            }
        }
    }
    edges
}

fn generate_random_edges(node_count: usize, edge_count: usize, seed: u64) -> Vec<(NodeId, NodeId)> {
    let total_pairs = pair_count(node_count);
    assert!(
        edge_count as u128 <= total_pairs,
        "edge_count exceeds possible pairs"
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(edge_count);
    let mut idx = 0u64;
    let mut remaining_edges = edge_count as u64;
    while remaining_edges > 0 && idx < total_pairs as u64 {
        let remaining_pairs = total_pairs as u64 - idx;
        let p = remaining_edges as f64 / remaining_pairs as f64;
        idx += sample_geometric(&mut rng, p);
        if idx >= total_pairs as u64 {
            break;
        }
        let (a, b) = pair_from_index(idx, node_count as u64);
        let (from, to) = if rng.gen_bool(0.5) { (a, b) } else { (b, a) };
        edges.push(follow(from as usize, to as usize));
        idx += 1;
        remaining_edges -= 1;
    }
    edges
}

fn generate_scale_free_edges(node_count: usize, m: usize, seed: u64) -> Vec<(NodeId, NodeId)> {
    assert!(m > 0, "m must be positive");
    assert!(node_count > m + 1, "node_count must exceed m + 1");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut degrees = vec![0usize; node_count];
    let mut edges = Vec::new();
    let seed_nodes = m + 1;
    // Seed accounts all follow each other.
    for u in 0..seed_nodes {
        for v in 0..seed_nodes {
            if u != v {
                edges.push(follow(u, v));
                degrees[v] += 1;
            }
        }
    }
    let mut total_degree: usize = degrees.iter().sum();
    for newcomer in seed_nodes..node_count {
        let mut targets = Vec::with_capacity(m);
        while targets.len() < m {
            let pick = rng.gen_range(0..total_degree);
            let mut cumulative = 0usize;
            for candidate in 0..newcomer {
                cumulative += degrees[candidate];
                if pick < cumulative {
                    if !targets.contains(&candidate) {
                        targets.push(candidate);
                    }
                    break;
                }
            }
        }
        for target in targets {
            edges.push(follow(newcomer, target));
            degrees[target] += 1;
            total_degree += 1;
        }
        // Newcomers sometimes get followed back, so paths run both ways.
        if rng.gen_bool(0.3) {
            let fan = rng.gen_range(0..newcomer);
            edges.push(follow(fan, newcomer));
            degrees[newcomer] += 1;
            total_degree += 1;
        }
    }
    edges
}

fn follow(from: usize, to: usize) -> (NodeId, NodeId) {
    (NodeId(from as i64), NodeId(to as i64))
}

fn grid_index(x: usize, y: usize, width: usize) -> usize {
    y * width + x
}

fn pair_count(nodes: usize) -> u128 {
    let n = nodes as u128;
    n * (n - 1) / 2
}

fn sample_geometric(rng: &mut StdRng, p: f64) -> u64 {
    let u = rng.r#gen::<f64>().max(f64::MIN_POSITIVE);
    ((u.ln() / (1.0 - p).ln()).floor().max(0.0)) as u64
}

fn pair_from_index(idx: u64, nodes: u64) -> (u64, u64) {
    let mut left = 0;
    let mut start = 0u64;
    while left < nodes - 1 {
        let remaining = nodes - left - 1;
        if idx < start + remaining {
            return (left, left + 1 + (idx - start));
        }
        start += remaining;
        left += 1;
    }
    (nodes - 2, nodes - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_graph() {
        let a = generate_graph(GraphShape::RandomErdosRenyi { edges: 40 }, 20, 7);
        let b = generate_graph(GraphShape::RandomErdosRenyi { edges: 40 }, 20, 7);
        assert_eq!(a.follows, b.follows);
        assert_eq!(a.edge_count(), 40);
    }

    #[test]
    fn star_hub_is_zero() {
        let data = generate_graph(GraphShape::Star, 10, 0);
        assert_eq!(data.hub_index(), 0);
        assert_eq!(data.edge_count(), 9);
        assert_eq!(data.username(3), "user3");
    }

    #[test]
    fn scale_free_has_no_self_follows() {
        let data = generate_graph(GraphShape::ScaleFree { m: 2 }, 50, 11);
        assert!(data.follows.iter().all(|(a, b)| a != b));
        let graph = data.to_follow_graph();
        assert_eq!(graph.profile_count(), 50);
        assert_eq!(graph.follow_count(), data.edge_count());
    }

    #[test]
    fn sqlite_load_matches_counts() {
        let data = generate_graph(GraphShape::Grid2D { width: 3, height: 3 }, 9, 0);
        let conn = Connection::open_in_memory().unwrap();
        data.write_sqlite(&conn).unwrap();
        let counts = crate::schema::graph_counts(&conn).unwrap();
        assert_eq!(counts.profiles, 9);
        assert_eq!(counts.follows, 12);
    }
}
