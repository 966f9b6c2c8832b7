//! Consul 健康 API 客户端测试
//!
//! 使用 wiremock 模拟 Consul HTTP 接口。

use flare_cloud_core::discovery::{CheckStatus, ConsulHealthClient, HealthRegistry};
use flare_cloud_core::{Config, ConsulConfig, DiscoveryClient, ErrorCode, RegistryError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 指向模拟服务器的客户端
fn consul_client(server: &MockServer) -> ConsulHealthClient {
    consul_client_with(server, None, None)
}

fn consul_client_with(
    server: &MockServer,
    token: Option<&str>,
    datacenter: Option<&str>,
) -> ConsulHealthClient {
    let config = ConsulConfig {
        url: server.uri(),
        token: token.map(str::to_string),
        datacenter: datacenter.map(str::to_string),
    };
    ConsulHealthClient::new(&config).expect("Failed to create consul client")
}

fn passing_body() -> serde_json::Value {
    json!([
        {
            "Node": "node-1",
            "CheckID": "service:orders-1",
            "Name": "Service 'orders-api' check",
            "Status": "passing",
            "ServiceID": "orders-1",
            "ServiceName": "orders-api"
        },
        {
            "Node": "node-1",
            "CheckID": "serfHealth",
            "Name": "Serf Health Status",
            "Status": "passing",
            "ServiceID": "",
            "ServiceName": ""
        }
    ])
}

fn service_body() -> serde_json::Value {
    json!([
        {
            "Node": { "Node": "node-1", "Address": "192.168.1.10" },
            "Service": {
                "ID": "orders-1",
                "Service": "orders-api",
                "Address": "10.0.0.5",
                "Port": 8080,
                "Tags": ["v1"],
                "Meta": { "zone": "a" }
            },
            "Checks": [
                { "Node": "node-1", "CheckID": "serfHealth", "Name": "Serf", "Status": "passing", "ServiceID": "", "ServiceName": "" },
                { "Node": "node-1", "CheckID": "service:orders-1", "Name": "http", "Status": "passing", "ServiceID": "orders-1", "ServiceName": "orders-api" }
            ]
        },
        {
            "Node": { "Node": "node-2", "Address": "192.168.1.11" },
            "Service": {
                "ID": "orders-2",
                "Service": "orders-api",
                "Address": "",
                "Port": 8080,
                "Tags": null,
                "Meta": null
            },
            "Checks": [
                { "Node": "node-2", "CheckID": "service:orders-2", "Name": "http", "Status": "passing", "ServiceID": "orders-2", "ServiceName": "orders-api" }
            ]
        }
    ])
}

/// 测试：阻塞查询携带 index 和 wait 参数，并解析 X-Consul-Index
#[tokio::test]
async fn test_passing_checks_blocking_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/state/passing"))
        .and(query_param("index", "41"))
        .and(query_param("wait", "5s"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "42")
                .set_body_json(passing_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = consul_client(&server);
    let response = client
        .passing_checks(41, Duration::from_secs(5))
        .await
        .expect("Failed to query passing checks");

    assert_eq!(response.index, 42);
    assert_eq!(response.value.len(), 2);
    assert_eq!(response.value[0].service_name, "orders-api");
    assert_eq!(response.value[0].status, CheckStatus::Passing);
    assert!(response.value[1].service_name.is_empty());
}

/// 测试：按服务查询只请求 passing 实例并转换为实例
#[tokio::test]
async fn test_service_health_passing_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders-api"))
        .and(query_param("passing", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "100")
                .set_body_json(service_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = consul_client(&server);
    let response = client
        .service_health("orders-api", true)
        .await
        .expect("Failed to query service health");

    assert_eq!(response.index, 100);
    let instances: Vec<_> = response
        .value
        .iter()
        .filter_map(|entry| entry.to_instance())
        .collect();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].host, "10.0.0.5");
    assert_eq!(instances[0].metadata.get("zone").map(String::as_str), Some("a"));
    // 服务地址为空，回退到节点地址
    assert_eq!(instances[1].host, "192.168.1.11");
    assert!(instances[1].tags.is_empty());
}

/// 测试：缺少索引头时报错
#[tokio::test]
async fn test_missing_index_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/state/passing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = consul_client(&server);
    let err = client
        .passing_checks(0, Duration::from_secs(1))
        .await
        .expect_err("missing index should fail");
    assert_eq!(err, RegistryError::MissingIndex);
    assert_eq!(err.code(), ErrorCode::RegistryIndexMissing);
}

/// 测试：响应体无法解析时报解析错误
#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/state/passing"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "3")
                .set_body_string("{not json"),
        )
        .mount(&server)
        .await;

    let client = consul_client(&server);
    let err = client
        .passing_checks(0, Duration::from_secs(1))
        .await
        .expect_err("malformed body should fail");
    assert!(matches!(err, RegistryError::Decode(_)));
    assert_eq!(err.code(), ErrorCode::DeserializationError);
}

/// 测试：非 2xx 状态码转换为状态错误
#[tokio::test]
async fn test_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders-api"))
        .respond_with(ResponseTemplate::new(500).set_body_string("No cluster leader"))
        .mount(&server)
        .await;

    let client = consul_client(&server);
    let err = client
        .service_health("orders-api", true)
        .await
        .expect_err("500 should fail");
    assert_eq!(
        err,
        RegistryError::Status {
            status: 500,
            body: "No cluster leader".to_string()
        }
    );
    assert!(err.code().is_retryable());
}

/// 测试：配置的 ACL token 和数据中心随请求发送
#[tokio::test]
async fn test_token_and_datacenter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders-api"))
        .and(header("X-Consul-Token", "secret-token"))
        .and(query_param("dc", "dc2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "9")
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = consul_client_with(&server, Some("secret-token"), Some("dc2"));
    let response = client
        .service_health("orders-api", true)
        .await
        .expect("Failed to query service health");
    assert_eq!(response.index, 9);
    assert!(response.value.is_empty());
}

/// 测试：连接失败转换为传输错误
#[tokio::test]
async fn test_unreachable_consul() {
    let config = ConsulConfig {
        url: "http://127.0.0.1:1".to_string(),
        token: None,
        datacenter: None,
    };
    let client = ConsulHealthClient::new(&config).expect("Failed to create consul client");
    let err = client
        .service_health("orders-api", true)
        .await
        .expect_err("connection should fail");
    assert!(matches!(err, RegistryError::Transport(_)));
}

/// 测试：客户端端到端读取与缓存
#[tokio::test]
async fn test_discovery_client_against_consul() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/state/passing"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "1")
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders-api"))
        .and(query_param("passing", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "100")
                .set_body_json(service_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.consul.url = server.uri();
    config.watcher.wait_secs = 1;
    let client = DiscoveryClient::new(&config).expect("Failed to create discovery client");
    assert_eq!(client.description(), "Flare Cloud Consul Client");

    let first = client
        .get_instances("orders-api")
        .await
        .expect("Failed to get instances");
    let second = client
        .get_instances("Orders-API")
        .await
        .expect("Failed to get instances");
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);

    client.shutdown().await;
}
