use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use quire::application::provider::{CreatePostInput, PostFilter, PostLookup};
use quire::application::queries::{BlogQueries, QueryConfig};
use quire::infra::memory::MemoryProvider;

#[tokio::test]
async fn query_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let provider = Arc::new(MemoryProvider::seeded().expect("seed"));
    let queries = BlogQueries::for_provider(
        provider,
        QueryConfig {
            capacity: NonZeroUsize::new(1).expect("non-zero"),
            stale_after: Duration::from_secs(60),
            tag_page_size: 2,
        },
    );

    // miss, hit
    queries.posts(&PostFilter::default()).await.expect("list");
    queries.posts(&PostFilter::default()).await.expect("list");

    // evicts the listing
    queries
        .post("hello-world", &PostLookup::default())
        .await
        .expect("detail");

    queries.tags().await.expect("tags");

    queries
        .create_post(CreatePostInput::new("metrics-post", "Metrics post"))
        .await
        .expect("create");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "quire_query_cache_hit_total",
        "quire_query_cache_miss_total",
        "quire_query_cache_evict_total",
        "quire_query_cache_invalidate_total",
        "quire_tag_aggregation_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
