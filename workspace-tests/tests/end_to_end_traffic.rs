use monitor_core::{MonitorConfig, ScopeConfig, TrafficRecord};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use workspace_tests::{wait_until, RunningMonitor};

fn sample(method: &str, url: &str, status: Option<u16>) -> TrafficRecord {
    let record = TrafficRecord::new(method, url)
        .add_request_header("Accept", "application/json")
        .add_request_header("Accept", "text/plain")
        .with_client_addr("10.0.0.5:51234")
        .with_tls_version("TLS 1.3");
    match status {
        Some(code) => record
            .with_response(code, "status")
            .with_content_type("application/json")
            .with_response_body("{}")
            .with_duration(Duration::from_millis(12)),
        None => record,
    }
}

#[tokio::test]
async fn test_end_to_end_traffic_flow() {
    let monitor = RunningMonitor::start(MonitorConfig {
        capacity: 50,
        ..Default::default()
    })
    .await
    .expect("monitor should start");
    let client = reqwest::Client::new();

    // 1. Producer captures through the sink
    assert!(monitor.sink.capture(sample("GET", "https://a.example/users", Some(200))));
    assert!(monitor.sink.capture(sample("GET", "https://b.example/missing", Some(404))));
    assert!(monitor.sink.capture(sample("POST", "https://a.example/login", None)));
    assert!(wait_until(|| monitor.buffer.len() == 3).await, "records should be ingested");

    // 2. List is newest first
    let entries: Vec<Value> = client
        .get(monitor.url("/api/entries"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<u64> = entries.iter().map(|e| e["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(entries[0]["method"], "POST");
    assert_eq!(entries[0]["statusCode"], 0);

    // 3. Single entry keeps multi-valued headers and wire formats
    let entry: Value = client
        .get(monitor.url("/api/entry/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["host"], "a.example");
    assert_eq!(entry["path"], "/users");
    assert_eq!(
        entry["requestHeaders"]["Accept"],
        serde_json::json!(["application/json", "text/plain"])
    );
    assert_eq!(entry["duration"], 12_000_000u64);
    assert_eq!(entry["clientAddr"], "10.0.0.5:51234");
    assert!(entry["timestamp"].as_str().unwrap().contains('T'));

    let resp = client.get(monitor.url("/api/entry/77")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = client.get(monitor.url("/api/entry/xyz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // 4. Stats
    let stats: Value = client
        .get(monitor.url("/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["methods"], serde_json::json!({"GET": 2, "POST": 1}));
    assert_eq!(stats["statusCodes"], serde_json::json!({"200": 1, "404": 1}));
    assert_eq!(
        stats["hosts"],
        serde_json::json!([
            {"host": "a.example", "count": 2},
            {"host": "b.example", "count": 1}
        ])
    );

    // 5. Clear is POST only and keeps the id counter
    let resp = client.get(monitor.url("/api/clear")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(monitor.buffer.len(), 3);

    let resp = client.post(monitor.url("/api/clear")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok"}));

    let entries: Vec<Value> = client
        .get(monitor.url("/api/entries"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(entries.is_empty());

    assert!(monitor.sink.capture(sample("GET", "https://c.example/", Some(200))));
    assert!(wait_until(|| monitor.buffer.len() == 1).await);
    let entry: Value = client
        .get(monitor.url("/api/entry/4"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["host"], "c.example");

    // 6. Health and metrics
    let health: Value = client
        .get(monitor.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let metrics: Value = client
        .get(monitor.url("/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["recordsAdded"], 4);
    assert_eq!(metrics["recordsCleared"], 3);
    assert_eq!(metrics["capacity"], 50);

    monitor.stop().await.expect("monitor should stop cleanly");
}

#[tokio::test]
async fn test_eviction_over_http() {
    let monitor = RunningMonitor::start(MonitorConfig {
        capacity: 5,
        ..Default::default()
    })
    .await
    .unwrap();

    for i in 0..12 {
        monitor.buffer.add(sample("GET", &format!("https://h{}.example/", i), Some(200)));
    }

    let entries: Vec<Value> = reqwest::get(monitor.url("/api/entries"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<u64> = entries.iter().map(|e| e["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![12, 11, 10, 9, 8]);

    let resp = reqwest::get(monitor.url("/api/entry/3")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "evicted entries are gone");

    monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_scope_filters_ingest() {
    let monitor = RunningMonitor::start(MonitorConfig {
        scope: ScopeConfig {
            allow: vec!["*.shop.test".to_string()],
            block: vec!["ads.shop.test".to_string()],
        },
        ..Default::default()
    })
    .await
    .unwrap();

    monitor.sink.capture(sample("GET", "https://www.shop.test/", Some(200)));
    monitor.sink.capture(sample("GET", "https://ads.shop.test/pixel", Some(200)));
    monitor.sink.capture(sample("GET", "https://elsewhere.test/", Some(200)));
    monitor.sink.capture(sample("GET", "https://api.shop.test:8443/cart", Some(201)));

    assert!(
        wait_until(|| monitor.buffer.metrics_snapshot().scope_filtered == 2).await,
        "two records are out of scope"
    );
    assert!(wait_until(|| monitor.buffer.len() == 2).await);

    let stats: Value = reqwest::get(monitor.url("/api/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["statusCodes"], serde_json::json!({"200": 1, "201": 1}));

    monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_drains_queued_captures() {
    let monitor = RunningMonitor::start(MonitorConfig::default()).await.unwrap();
    let sink = monitor.sink.clone();
    let buffer = monitor.buffer.clone();

    for i in 0..20 {
        assert!(sink.capture(sample("GET", &format!("https://q{}.example/", i), Some(200))));
    }
    monitor.stop().await.unwrap();

    assert_eq!(buffer.len(), 20, "records queued before stop are kept");
    assert!(!sink.capture(sample("GET", "https://late.example/", None)));

    let metrics = buffer.metrics_snapshot();
    assert_eq!(metrics.records_added, 20);
    assert_eq!(metrics.ingest_dropped, 1);
}
