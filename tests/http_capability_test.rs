//! Wiremock integration tests for HttpCapability.
//!
//! These tests verify request layout and error mapping against mocked runtimes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bifrost::capability::{BackendCapability, CapabilityRole, HttpCapability};
use bifrost::config::Config;
use bifrost::{Bifrost, BifrostError, InboundRequest};

#[tokio::test]
async fn test_invoke_posts_payload() {
    let mock_server = MockServer::start().await;
    let payload = json!({"instances": [{"text": "hello"}]});

    Mock::given(method("POST"))
        .and(path("/endpoints/customer-sentiment-analyzer/invocations"))
        .and(header("Content-Type", "application/json"))
        .and(header("Authorization", "Bearer test_key"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"predictions": [{"sentiment": "positive"}]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let capability =
        HttpCapability::endpoint_runtime("sagemaker", mock_server.uri()).with_api_key("test_key");
    let reply = capability
        .invoke("customer-sentiment-analyzer", &payload)
        .await
        .expect("invoke should succeed");

    assert_eq!(reply["predictions"][0]["sentiment"], "positive");
}

#[tokio::test]
async fn test_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/model/m/invoke"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::model_runtime("bedrock", mock_server.uri());
    let err = capability.invoke("m", &json!({})).await.unwrap_err();

    assert!(matches!(err, BifrostError::AuthenticationFailed));
    assert!(err.is_capability_error());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_not_found_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::endpoint_runtime("sagemaker", mock_server.uri());
    let err = capability.invoke("gone", &json!({})).await.unwrap_err();

    assert!(matches!(err, BifrostError::CapabilityNotFound(ref id) if id == "gone"));
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::model_runtime("bedrock", mock_server.uri());
    let err = capability.invoke("m", &json!({})).await.unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::model_runtime("bedrock", mock_server.uri());
    let err = capability.invoke("m", &json!({})).await.unwrap_err();

    assert!(matches!(err, BifrostError::Api { status: 502, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_empty_and_malformed_bodies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/model/empty/invoke"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/model/garbled/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::model_runtime("bedrock", mock_server.uri());

    let err = capability.invoke("empty", &json!({})).await.unwrap_err();
    assert!(matches!(err, BifrostError::EmptyResponse));

    let err = capability.invoke("garbled", &json!({})).await.unwrap_err();
    assert!(matches!(err, BifrostError::MalformedResponse { .. }));
    assert!(err.is_capability_error());
}

#[tokio::test]
async fn test_unreachable_host_is_http_error() {
    let capability = HttpCapability::model_runtime("bedrock", "http://127.0.0.1:1");
    let err = capability.invoke("m", &json!({})).await.unwrap_err();
    assert!(matches!(err, BifrostError::Http(_)));
}

#[tokio::test]
async fn test_timeout_is_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::model_runtime("bedrock", mock_server.uri())
        .with_timeout(Duration::from_millis(50))
        .unwrap();
    let err = capability.invoke("m", &json!({})).await.unwrap_err();
    assert!(matches!(err, BifrostError::Http(_)));
}

/// The whole stack wired from configuration: endpoint down, text model up.
#[tokio::test]
async fn test_configured_gateway_falls_back_over_http() {
    let endpoint_runtime = MockServer::start().await;
    let model_runtime = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/endpoints/customer-sentiment-analyzer/invocations"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&endpoint_runtime)
        .await;
    Mock::given(method("POST"))
        .and(path("/model/amazon.titan-text-express-v1/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"outputText": "{\"sentiment\": \"positive\", \"confidence\": 0.91}"}]
        })))
        .expect(1)
        .mount(&model_runtime)
        .await;

    let mut config = Config::default();
    config.backends.endpoint_runtime_url = endpoint_runtime.uri();
    config.backends.model_runtime_url = model_runtime.uri();

    let gateway = Bifrost::builder().config(config).build().unwrap();
    let response = gateway
        .handle_request(
            InboundRequest::new("POST", "/analyze-sentiment").with_body(r#"{"text": "nice"}"#),
        )
        .await;

    assert_eq!(
        response.json().unwrap(),
        json!({"sentiment": "positive", "confidence": 0.91, "modelVersion": "bedrock-fallback"})
    );
    assert_eq!(response.headers["x-bifrost-backend"], "bedrock");
}

/// A transient primary failure is not retried: the router moves straight
/// to the secondary capability.
#[tokio::test]
async fn test_transient_primary_failure_is_called_once() {
    let endpoint_runtime = MockServer::start().await;
    let model_runtime = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&endpoint_runtime)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sentiment": "neutral", "confidence": 0.8})),
        )
        .expect(1)
        .mount(&model_runtime)
        .await;

    let gateway = Bifrost::builder()
        .http_backends(false)
        .capability(
            CapabilityRole::SentimentPrimary,
            Arc::new(HttpCapability::endpoint_runtime("sagemaker", endpoint_runtime.uri())),
        )
        .capability(
            CapabilityRole::SentimentFallback,
            Arc::new(HttpCapability::model_runtime("bedrock", model_runtime.uri())),
        )
        .build()
        .unwrap();

    let response = gateway
        .handle_request(InboundRequest::new("POST", "/analyze-sentiment").with_body("{}"))
        .await;

    assert_eq!(response.headers["x-bifrost-degraded"], "true");
    assert_eq!(response.headers["x-bifrost-backend"], "bedrock");
}

#[tokio::test]
async fn test_endpoint_headers_are_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amzn-SageMaker-Model-Version", "v12")
                .insert_header("x-amzn-SageMaker-Processing-Time", "37")
                .set_body_json(json!({"predictions": [{"sentiment": "positive", "confidence": 0.9}]})),
        )
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::endpoint_runtime("sagemaker", mock_server.uri());
    let reply = capability.invoke("e", &json!({})).await.unwrap();
    assert_eq!(reply["_meta"]["x-amzn-sagemaker-model-version"], "v12");
    assert_eq!(reply["_meta"]["x-amzn-sagemaker-processing-time"], "37");

    let gateway = Bifrost::builder()
        .http_backends(false)
        .capability(CapabilityRole::SentimentPrimary, Arc::new(capability))
        .build()
        .unwrap();
    let response = gateway
        .handle_request(InboundRequest::new("POST", "/analyze-sentiment").with_body("{}"))
        .await;
    assert_eq!(
        response.json().unwrap(),
        json!({
            "sentiment": "positive",
            "confidence": 0.9,
            "modelVersion": "v12",
            "processingTimeMs": "37"
        })
    );
}

#[tokio::test]
async fn test_model_runtime_forwards_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amzn-SageMaker-Model-Version", "v12")
                .set_body_json(json!({"results": []})),
        )
        .mount(&mock_server)
        .await;

    let capability = HttpCapability::model_runtime("bedrock", mock_server.uri());
    let reply = capability.invoke("m", &json!({})).await.unwrap();
    assert_eq!(reply, json!({"results": []}));
}
