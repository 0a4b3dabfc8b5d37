//! Journey smoke checks: the harness boots a full application.

use engram_e2e_tests::harness::TestEnv;

#[tokio::test]
async fn test_service_descriptor() {
    let env = TestEnv::new();
    let (status, body) = env.get("/").await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Engram API");
    assert_eq!(body["health"], "/health");
}

#[tokio::test]
async fn test_health_reports_dependencies() {
    let env = TestEnv::new();
    let (status, body) = env.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database_connected"], true);
    assert_eq!(body["embedding_ready"], true);
    assert_eq!(body["chat_ready"], true);
    assert!(body["embedding_provider"].is_string());
    assert!(body["chat_provider"].is_string());
}
