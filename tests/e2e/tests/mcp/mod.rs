//! Tool-endpoint smoke checks.

use engram_e2e_tests::harness::TestEnv;

#[tokio::test]
async fn test_ping() {
    let env = TestEnv::new();
    let (status, body) = env.rpc("ping", serde_json::json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["jsonrpc"], "2.0");
    assert!(body["result"].is_object());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_unknown_method_is_32601() {
    let env = TestEnv::new();
    let (status, body) = env.rpc("resources/list", serde_json::json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32601);
}
