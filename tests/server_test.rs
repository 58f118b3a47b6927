//! HTTP front end tests, driving the axum router directly.
#![cfg(feature = "server")]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use bifrost::capability::{BackendCapability, CapabilityRole};
use bifrost::ingest::MemoryObjectStore;
use bifrost::{Bifrost, Gateway, Result};

struct Fixed(&'static str, Value);

#[async_trait]
impl BackendCapability for Fixed {
    fn name(&self) -> &str {
        self.0
    }

    async fn invoke(&self, _capability_id: &str, _payload: &Value) -> Result<Value> {
        Ok(self.1.clone())
    }
}

fn gateway() -> Gateway {
    Bifrost::builder()
        .http_backends(false)
        .capability(
            CapabilityRole::SentimentPrimary,
            Arc::new(Fixed(
                "sagemaker",
                json!({"predictions": [{"sentiment": "positive", "confidence": 0.9}]}),
            )),
        )
        .capability(
            CapabilityRole::Generation,
            Arc::new(Fixed("bedrock", json!({"results": [{"outputText": "Hello!"}]}))),
        )
        .object_store(Arc::new(MemoryObjectStore::new()))
        .build()
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn analyze_sentiment_route() {
    let response = bifrost::server::router(gateway())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/analyze-sentiment")
                .body(Body::from(r#"{"text": "great"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-bifrost-degraded"], "false");
    assert_eq!(response.headers()["x-bifrost-backend"], "sagemaker");
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(
        body_json(response).await,
        json!({
            "sentiment": "positive",
            "confidence": 0.9,
            "modelVersion": "unknown",
            "processingTimeMs": "unknown"
        })
    );
}

#[tokio::test]
async fn unknown_route_returns_discovery() {
    let response = bifrost::server::router(gateway())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["availableEndpoints"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn generate_route_reads_query_prompt() {
    let response = bifrost::server::router(gateway())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate?prompt=Greet%20me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["prompt"], "Greet me");
    assert_eq!(body["output"], "Hello!");
}

#[tokio::test]
async fn stream_route_acknowledges_batch() {
    let batch = json!({
        "Records": [
            {"kinesis": {"data": "aGVsbG8="}},
            {"kinesis": {"data": "not base64!"}}
        ]
    });
    let response = bifrost::server::router(gateway())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/stream")
                .header("content-type", "application/json")
                .body(Body::from(batch.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"statusCode": 200, "processed": 1})
    );
}

#[tokio::test]
async fn stream_route_tolerates_garbage() {
    let response = bifrost::server::router(gateway())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/stream")
                .body(Body::from("nonsense"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        body_json(response).await,
        json!({"statusCode": 200, "processed": 0})
    );
}

#[tokio::test]
async fn health_lists_capabilities() {
    let response = bifrost::server::router(gateway())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["capabilities"]["sentiment_primary"], "sagemaker");
    assert_eq!(body["capabilities"]["generation"], "bedrock");
    assert_eq!(body["streamDestination"], true);
}
