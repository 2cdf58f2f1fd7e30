//! User-facing bridge operations against the mock API.

use std::collections::BTreeMap;

use orderwise_bridge::audit::LogLevel;
use orderwise_bridge::config::schema::keys;
use serde_json::json;

mod common;

use common::Harness;

#[tokio::test]
async fn test_connection_success() {
    let h = Harness::start().await;

    let result = h.bridge().test_connection().await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.data.unwrap()["success"], json!(true));

    let ok = h.events("CONNECTION_TEST_SUCCESS").await;
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].level, LogLevel::Success);
}

#[tokio::test]
async fn test_connection_failure_is_normalized() {
    let h = Harness::start().await;
    h.config()
        .set(keys::ORDERWISE_BASE_URL, &common::refused_url().await)
        .await;
    h.config().set(keys::RETRY_MAX_ATTEMPTS, "1").await;

    let result = h.bridge().test_connection().await;
    assert!(!result.success);
    assert!(result.message.starts_with("Connection to Orderwise API failed"));

    assert_eq!(h.events("ApiClientRetry").await.len(), 1);
    assert_eq!(h.events("CONNECTION_TEST_FAILED").await.len(), 1);
}

#[tokio::test]
async fn test_send_test_payload_reaches_webhook_without_token() {
    let h = Harness::start().await;

    let result = h.bridge().send_test_payload().await;
    assert!(result.success, "{}", result.message);

    let received = h.mock.state.webhook_payloads().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["eventType"], json!("test"));

    let sent = h.events("ApiClientRequestSent").await;
    let headers = &sent[0].data.as_ref().unwrap()["headers"];
    assert!(headers.get("authorization").is_none());
    assert_eq!(h.events("TEST_PAYLOAD_SENT").await.len(), 1);
}

#[tokio::test]
async fn test_sync_now_forwards_new_orders() {
    let h = Harness::start().await;

    let result = h.bridge().sync_now().await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.data.unwrap(), json!({ "fetched": 2, "forwarded": 2 }));

    let received = h.mock.state.webhook_payloads().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["eventType"], json!("orders.sync"));
    assert_eq!(received[0]["count"], json!(2));
    assert_eq!(received[0]["orders"][0]["product"], json!("Widget"));

    let completed = h.events("SYNC_COMPLETED").await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].level, LogLevel::Success);
}

#[tokio::test]
async fn test_sync_now_reports_fetch_failure() {
    let h = Harness::start().await;
    h.config()
        .set(keys::ORDERWISE_BASE_URL, &common::refused_url().await)
        .await;
    h.config().set(keys::RETRY_MAX_ATTEMPTS, "0").await;

    let result = h.bridge().sync_now().await;
    assert!(!result.success);
    assert!(result.message.contains("fetch"));

    let failed = h.events("SYNC_FAILED").await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].data.as_ref().unwrap()["stage"], json!("fetch"));
    assert!(h.mock.state.webhook_payloads().await.is_empty());
}

#[tokio::test]
async fn test_invalid_config_falls_back_and_warns() {
    let h = Harness::start().await;
    let values = BTreeMap::from([
        (keys::RETRY_MAX_ATTEMPTS.to_string(), "lots".to_string()),
        (keys::ORDERWISE_BASE_URL.to_string(), "not-a-url".to_string()),
    ]);

    let saved = h.bridge().save_config(values).await;
    assert!(saved.success);

    let api = h.config().get_api_config().await;
    assert_eq!(api.retry_max_attempts, 3);
    assert_eq!(api.base_url.as_str(), "http://localhost:3001/api/orderwise");

    // One warning per invalid key for each of the two reads.
    let numeric = h.events("CONFIG_VALIDATION_INVALID").await;
    let urls = h.events("CONFIG_VALIDATION_INVALID_URL").await;
    assert_eq!(numeric.len(), 2);
    assert_eq!(urls.len(), 2);
    assert_eq!(
        urls[0].data.as_ref().unwrap(),
        &json!({
            "key": keys::ORDERWISE_BASE_URL,
            "value": "not-a-url",
            "usingDefault": "http://localhost:3001/api/orderwise",
        })
    );
}

#[tokio::test]
async fn test_get_logs_returns_newest_first() {
    let h = Harness::start().await;
    h.bridge().heartbeat().await;
    h.bridge().test_connection().await;

    let result = h.bridge().get_logs(3).await;
    assert!(result.success);
    let logs = result.data.unwrap();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0]["event"], json!("CONNECTION_TEST_SUCCESS"));
    assert!(logs[0]["id"].as_i64() > logs[1]["id"].as_i64());
}
