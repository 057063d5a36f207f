use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use followpath::{
    GraphAdapter, NodeId, RetryPolicy, SearchAlgorithm, SearchOptions, SearchRequest,
    StoreConnector, run_search,
    bench_utils::{GraphShape, generate_graph},
    store::MemoryConnector,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

const ER_SEED: u64 = 0xEE45;
const SF_SEED: u64 = 0xFF89;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

struct PreparedGraph {
    connector: MemoryConnector,
    request: SearchRequest,
    label: &'static str,
}

fn bench_scale() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        1_000
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        10_000
    }
}

fn prepared_graphs(max_depth: usize) -> Vec<PreparedGraph> {
    let nodes = bench_scale();
    let random = generate_graph(
        GraphShape::RandomErdosRenyi {
            edges: nodes.saturating_mul(3),
        },
        nodes,
        ER_SEED,
    );
    let sf = generate_graph(GraphShape::ScaleFree { m: 3 }, nodes, SF_SEED);
    vec![
        PreparedGraph {
            request: SearchRequest::new(NodeId(random.hub_index() as i64), NodeId(nodes as i64 - 1), max_depth),
            connector: MemoryConnector::new(random.to_follow_graph()),
            label: "er",
        },
        PreparedGraph {
            request: SearchRequest::new(NodeId(nodes as i64 - 1), NodeId(0), max_depth),
            connector: MemoryConnector::new(sf.to_follow_graph()),
            label: "scalefree",
        },
    ]
}

/// One cold-cache search, the way a worker runs it.
async fn search_once(prepared: &PreparedGraph, options: &SearchOptions) -> usize {
    let store = prepared.connector.connect().await.expect("connect");
    let adapter = GraphAdapter::connect(store, RetryPolicy::none(), CancellationToken::new())
        .await
        .expect("adapter");
    run_search(&adapter, &prepared.request, options)
        .await
        .expect("search")
        .len()
}

fn bench_algorithm(c: &mut Criterion, group_name: &str, algorithm: SearchAlgorithm, max_depth: usize) {
    let runtime = Runtime::new().expect("runtime");
    let graphs = prepared_graphs(max_depth);
    let options = SearchOptions::default().with_algorithm(algorithm);
    let mut group = c.benchmark_group(group_name);
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        group.bench_function(prepared.label, |b| {
            b.to_async(&runtime).iter(|| search_once(prepared, &options));
        });
    }
    group.finish();
}

fn bench_shortest(c: &mut Criterion) {
    bench_algorithm(c, "shortest", SearchAlgorithm::Shortest, 5);
}

fn bench_level_parallel(c: &mut Criterion) {
    bench_algorithm(c, "level_parallel", SearchAlgorithm::LevelParallel, 5);
}

fn bench_exhaustive(c: &mut Criterion) {
    bench_algorithm(c, "exhaustive", SearchAlgorithm::Exhaustive, 4);
}

criterion_group!(benches, bench_shortest, bench_level_parallel, bench_exhaustive);
criterion_main!(benches);
