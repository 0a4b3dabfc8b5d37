//! Reprojection journeys: cluster assignments, coordinate bounds, and the
//! visualisation feed.

use engram_e2e_tests::harness::{export_html, TestEnv};

fn five_conversation_bundle() -> String {
    export_html(&[
        ("Python basics", &[("user", "python lists and dicts"), ("assistant", "python collections")]),
        ("Rust ownership", &[("user", "rust borrow checker"), ("assistant", "rust lifetimes")]),
        ("Sourdough bread", &[("user", "sourdough hydration"), ("assistant", "bread flour ratios")]),
        ("Python asyncio", &[("user", "python async await"), ("assistant", "python event loop")]),
        ("Trip to Lisbon", &[("user", "lisbon in may"), ("assistant", "pastel de nata")]),
    ])
}

#[tokio::test]
async fn test_reproject_assigns_clusters_within_bounds() {
    let env = TestEnv::new();

    let (status, report) = env
        .upload("bundle.html", &five_conversation_bundle(), false)
        .await;
    assert_eq!(status, 200);
    assert_eq!(report["successful"], 5);

    let (status, outcome) = env.post_empty("/api/ingest/reproject").await;
    assert_eq!(status, 200);
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["conversations_processed"], 5);
    assert_eq!(outcome["conversations_updated"], 5);
    let n_clusters = outcome["n_clusters"].as_i64().unwrap();
    assert_eq!(n_clusters, 5);

    // Every conversation now carries a cluster id in [0, K) and a label
    let (_, listed) = env.get("/api/chats").await;
    for conversation in listed.as_array().unwrap() {
        let cluster_id = conversation["cluster_id"].as_i64().unwrap();
        assert!(cluster_id >= 0 && cluster_id < n_clusters);
        assert!(conversation["cluster_label"].is_string());
    }

    // And a finite 3-D point inside the visualisation box
    let (status, feed) = env.get("/api/chats/visualization").await;
    assert_eq!(status, 200);
    assert_eq!(feed["total_nodes"], 5);
    for node in feed["nodes"].as_array().unwrap() {
        let position = node["position"].as_array().unwrap();
        assert_eq!(position.len(), 3);
        for coord in position {
            let value = coord.as_f64().unwrap();
            assert!(value.is_finite());
            assert!(value.abs() <= 10.0 + 1e-3);
        }
        let start = node["start_position"].as_array().unwrap();
        assert!(start.iter().all(|v| v.as_f64().unwrap() == 0.0));
    }

    let cluster_total: i64 = feed["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["count"].as_i64().unwrap())
        .sum();
    assert_eq!(cluster_total, 5);
}

#[tokio::test]
async fn test_reproject_with_single_conversation_is_422() {
    let env = TestEnv::new();

    let html = export_html(&[("Lonely", &[("user", "just me")])]);
    let (status, _) = env.upload("export.html", &html, false).await;
    assert_eq!(status, 200);

    let (status, body) = env.post_empty("/api/ingest/reproject").await;
    assert_eq!(status, 422);
    assert!(body["detail"].as_str().unwrap().contains("2"));
}

#[tokio::test]
async fn test_reproject_empty_corpus_is_422() {
    let env = TestEnv::new();
    let (status, _) = env.post_empty("/api/ingest/reproject").await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn test_small_corpus_caps_cluster_count() {
    let env = TestEnv::new();

    let html = export_html(&[
        ("One", &[("user", "alpha topic")]),
        ("Two", &[("user", "beta topic")]),
        ("Three", &[("user", "gamma topic")]),
    ]);
    let (_, report) = env.upload("bundle.html", &html, false).await;
    assert_eq!(report["successful"], 3);

    let (status, outcome) = env.post_empty("/api/ingest/reproject").await;
    assert_eq!(status, 200);
    // K = min(5, M) = 3
    assert_eq!(outcome["n_clusters"], 3);
}

#[tokio::test]
async fn test_stats_reflect_indexed_corpus() {
    let env = TestEnv::new();

    env.upload("bundle.html", &five_conversation_bundle(), false)
        .await;

    let (status, stats) = env.get("/api/search/stats").await;
    assert_eq!(status, 200);
    assert_eq!(stats["document_count"], 5);
    assert_eq!(stats["conversation_count"], 5);
    assert_eq!(stats["dimensions"], 768);
}
