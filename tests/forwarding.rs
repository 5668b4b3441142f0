//! End-to-end forwarding through the gateway.

use serde_json::Value;

mod common;

#[tokio::test]
async fn test_get_rewrites_path_and_host() {
    let backend = common::start_echo_backend("values").await;
    let config = common::single_service_config("/", "/api/v1/values", "", "", &[backend]);
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .get(gateway.url("/orders/5?x=1"))
        .header("x-custom", "kept")
        .send()
        .await
        .expect("Gateway unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-backend"], "values");

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["path"], "/api/v1/values/orders/5?x=1");
    assert_eq!(echo["host"], backend.to_string());
    assert_eq!(echo["forwarded_prefix"], "");
    assert_eq!(echo["custom"], "kept");
    assert_eq!(echo["body"], "");
}

#[tokio::test]
async fn test_post_forwards_body() {
    let backend = common::start_echo_backend("values").await;
    let config = common::single_service_config("/", "", "", "", &[backend]);
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/orders"))
        .header("content-type", "application/json")
        .body(r#"{"id": 12345, "qty": 2}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/orders");
    assert_eq!(echo["content_type"], "application/json");
    assert_eq!(echo["body"], r#"{"id": 12345, "qty": 2}"#);
}

#[tokio::test]
async fn test_delete_does_not_forward_body() {
    let backend = common::start_echo_backend("values").await;
    let config = common::single_service_config("/", "", "", "", &[backend]);
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .delete(gateway.url("/orders/5"))
        .header("content-type", "text/plain")
        .body("should not arrive")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "DELETE");
    assert_eq!(echo["body"], "");
    assert_eq!(echo["content_type"], Value::Null);
}

#[tokio::test]
async fn test_mount_becomes_path_base() {
    let backend = common::start_echo_backend("values").await;
    let config = common::single_service_config("/gateway", "", "", "", &[backend]);
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .get(gateway.url("/gateway/items/7"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["path"], "/items/7");
    assert_eq!(echo["forwarded_prefix"], "/gateway");
}

#[tokio::test]
async fn test_backend_status_is_forwarded() {
    let backend = common::start_programmable_backend(|| async { (404, "missing".into()) }).await;
    let config = common::single_service_config("/", "", "", "", &[backend]);
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .get(gateway.url("/nothing-here"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "missing");
}

#[tokio::test]
async fn test_request_id_is_forwarded_and_echoed() {
    let backend = common::start_echo_backend("values").await;
    let config = common::single_service_config("/", "", "", "", &[backend]);
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .get(gateway.url("/ping"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-42");

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["request_id"], "req-42");
}

#[tokio::test]
async fn test_routes_by_partition_key() {
    let negative = common::start_echo_backend("negative").await;
    let positive = common::start_echo_backend("positive").await;

    let config = common::parse_valid(&format!(
        r#"
        [observability]
        metrics_enabled = false

        [[routes]]
        name = "partitioned"
        service_uri = "fabric:/Test/Partitioned"
        partition_key = {{ kind = "first_segment_hash" }}

        [[services]]
        service_uri = "fabric:/Test/Partitioned"

        [[services.partitions]]
        kind = "int64_range"
        low = -9223372036854775808
        high = -1
        replicas = [{{ role = "primary", endpoints = {{ "" = "http://{negative}/" }} }}]

        [[services.partitions]]
        kind = "int64_range"
        low = 0
        high = 9223372036854775807
        replicas = [{{ role = "primary", endpoints = {{ "" = "http://{positive}/" }} }}]
        "#
    ));
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    // FNV-1a("a") has the sign bit set; FNV-1a("users") does not.
    let res = client.get(gateway.url("/a/profile")).send().await.unwrap();
    assert_eq!(res.headers()["x-backend"], "negative");

    let res = client.get(gateway.url("/users/1")).send().await.unwrap();
    assert_eq!(res.headers()["x-backend"], "positive");
}
