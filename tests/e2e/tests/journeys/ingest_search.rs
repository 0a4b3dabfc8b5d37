//! Ingest and search journeys: upload transcripts, read them back, search
//! the corpus, delete, and verify failure isolation.

use std::sync::Arc;

use engram_e2e_tests::harness::{export_html, TestEnv};
use engram_e2e_tests::mocks::{FailingEmbeddings, ScriptedChat};

#[tokio::test]
async fn test_single_conversation_round_trip() {
    let env = TestEnv::new();

    let html = export_html(&[("Greeting", &[("user", "hi"), ("assistant", "hello")])]);
    let (status, report) = env.upload("export.html", &html, false).await;

    assert_eq!(status, 200);
    assert_eq!(report["success"], true);
    assert_eq!(report["message_count"], 2);
    assert_eq!(report["total_processed"], 1);
    assert_eq!(report["successful"], 1);
    let id = report["conversation_id"].as_str().expect("new id").to_string();

    let (status, conversation) = env.get(&format!("/api/chats/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(conversation["title"], "Greeting");
    assert_eq!(conversation["message_count"], 2);

    let messages = conversation["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[0]["sequence_number"], 0);
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["sequence_number"], 1);
}

#[tokio::test]
async fn test_bundle_isolates_empty_conversation() {
    let env = TestEnv::new();

    let html = export_html(&[
        ("First", &[("user", "alpha"), ("assistant", "beta")]),
        ("Empty", &[]),
        ("Third", &[("user", "gamma")]),
    ]);
    let (status, report) = env.upload("bundle.html", &html, false).await;

    assert_eq!(status, 200);
    assert_eq!(report["total_processed"], 3);
    assert_eq!(report["successful"], 2);
    assert_eq!(report["failed"], 1);

    let items = report["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["success"], true);
    assert_eq!(items[1]["success"], false);
    assert!(items[1]["error"].as_str().unwrap().contains("messages"));
    assert_eq!(items[2]["success"], true);
}

#[tokio::test]
async fn test_non_html_rejected() {
    let env = TestEnv::new();
    let (status, body) = env.upload("export.txt", "whatever", false).await;
    assert_eq!(status, 400);
    assert!(body["detail"].as_str().unwrap().contains("HTML"));
}

#[tokio::test]
async fn test_undetectable_format_rejected() {
    let env = TestEnv::new();
    let html = "<html><body><p>Just a blog post.</p></body></html>";
    let (status, body) = env.upload("export.html", html, false).await;
    assert_eq!(status, 422);
    assert!(body["detail"].as_str().unwrap().contains("format"));
}

#[tokio::test]
async fn test_all_empty_conversations_rejected_without_persisting() {
    let env = TestEnv::new();
    let html = export_html(&[("A", &[]), ("B", &[])]);
    let (status, _) = env.upload("export.html", &html, false).await;
    assert_eq!(status, 422);

    let (_, listed) = env.get("/api/chats").await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_on_empty_corpus() {
    let env = TestEnv::new();
    let (status, body) = env
        .post_json("/api/search", serde_json::json!({"query": "x", "limit": 10}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["total_results"], 0);
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_ranks_matching_vocabulary_first() {
    let env = TestEnv::new();

    let html = export_html(&[
        (
            "Python decorators",
            &[
                ("user", "how do python decorators work in python"),
                ("assistant", "python decorators wrap python functions"),
            ],
        ),
        (
            "Sourdough starter",
            &[
                ("user", "my sourdough starter smells odd"),
                ("assistant", "feed the sourdough starter more flour"),
            ],
        ),
    ]);
    let (status, report) = env.upload("bundle.html", &html, false).await;
    assert_eq!(status, 200);
    assert_eq!(report["successful"], 2);

    let (status, body) = env
        .post_json(
            "/api/search",
            serde_json::json!({"query": "python decorators", "limit": 5, "min_score": 0.0}),
        )
        .await;
    assert_eq!(status, 200);

    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["title"], "Python decorators");

    // Scores are non-increasing and ids are unique
    let scores: Vec<f64> = results.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    let mut ids: Vec<&str> = results
        .iter()
        .map(|r| r["conversation_id"].as_str().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), results.len());
}

#[tokio::test]
async fn test_topic_filter_applies() {
    let env = TestEnv::new();

    // The scripted summariser tags everything ["testing", "mocks"]
    let html = export_html(&[("Python", &[("user", "python stuff")])]);
    env.upload("export.html", &html, false).await;

    let (status, body) = env
        .post_json(
            "/api/search",
            serde_json::json!({
                "query": "python",
                "min_score": 0.0,
                "topic_filter": ["testing"],
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["total_results"], 1);

    let (status, body) = env
        .post_json(
            "/api/search",
            serde_json::json!({
                "query": "python",
                "min_score": 0.0,
                "topic_filter": ["cooking"],
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["total_results"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_embedder_outage_is_a_per_item_failure_not_a_502() {
    let env = TestEnv::with_backends(
        Arc::new(FailingEmbeddings),
        Arc::new(ScriptedChat::summarizer()),
        false,
    );

    let html = export_html(&[("Doomed", &[("user", "hello")])]);
    let (status, report) = env.upload("export.html", &html, false).await;

    assert_eq!(status, 200);
    assert_eq!(report["success"], false);
    assert_eq!(report["successful"], 0);
    assert_eq!(report["failed"], 1);
    let items = report["items"].as_array().unwrap();
    assert!(items[0]["error"].as_str().unwrap().contains("embedding"));

    // Nothing persisted for the failed item
    let (_, listed) = env.get("/api/chats").await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_delete_cascades_and_drops_from_search() {
    let env = TestEnv::new();

    let html = export_html(&[("Python things", &[("user", "python python python")])]);
    let (_, report) = env.upload("export.html", &html, false).await;
    let id = report["conversation_id"].as_str().unwrap().to_string();

    let (status, body) = env.delete(&format!("/api/chats/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let (status, _) = env.get(&format!("/api/chats/{id}")).await;
    assert_eq!(status, 404);

    let (status, _) = env.delete(&format!("/api/chats/{id}")).await;
    assert_eq!(status, 404);

    let (_, search) = env
        .post_json(
            "/api/search",
            serde_json::json!({"query": "python", "min_score": 0.0}),
        )
        .await;
    assert_eq!(search["total_results"], 0);
}

#[tokio::test]
async fn test_batch_upload_reports_per_file() {
    let env = TestEnv::new();

    let good = export_html(&[("Good", &[("user", "fine")])]);
    let bad = "<html><body>not an export</body></html>".to_string();
    let (status, report) = env
        .upload_batch(&[("good.html", &good), ("bad.html", &bad)], false)
        .await;

    assert_eq!(status, 200);
    assert_eq!(report["total_processed"], 2);
    assert_eq!(report["successful"], 1);
    assert_eq!(report["failed"], 1);
    let conversations = report["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0]["success"], true);
    assert_eq!(conversations[1]["success"], false);
}

#[tokio::test]
async fn test_unknown_conversation_is_404() {
    let env = TestEnv::new();
    let (status, body) = env.get("/api/chats/no-such-id").await;
    assert_eq!(status, 404);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}
