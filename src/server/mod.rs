//! HTTP front end for the gateway.
//!
//! Translates real HTTP requests into [`InboundRequest`] events and the
//! returned [`ResponseEnvelope`] back into HTTP responses:
//!
//! - `GET /health` reports build metadata and registered capabilities
//! - `/generate`, any method, goes to the one-shot generation handler
//! - `POST /stream` accepts a stream batch (`{"Records": [...]}`)
//! - everything else goes to the three-route dispatcher

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::warn;

use crate::dispatch::{InboundRequest, ResponseEnvelope};
use crate::gateway::Gateway;
use crate::types::{BatchResponse, StreamEvent};
use crate::version;

/// Build the router for a gateway.
pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/health", get(health).fallback(dispatch))
        .route("/generate", any(generate))
        .route("/stream", post(stream).fallback(dispatch))
        .fallback(dispatch)
        .with_state(gateway)
}

async fn health(State(gateway): State<Gateway>) -> Json<Value> {
    let capabilities: HashMap<&'static str, String> = gateway
        .dispatcher()
        .router()
        .capabilities()
        .names()
        .into_iter()
        .map(|(role, name)| (role.as_str(), name))
        .collect();
    Json(json!({
        "status": "ok",
        "build": version::build_info(),
        "capabilities": capabilities,
        "streamDestination": gateway.ingestor().has_destination(),
    }))
}

async fn generate(
    State(gateway): State<Gateway>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let request = inbound(&method, &uri, &body);
    into_response(gateway.handle_generation(request).await)
}

async fn stream(State(gateway): State<Gateway>, body: Bytes) -> Json<BatchResponse> {
    let event = serde_json::from_slice::<StreamEvent>(&body).unwrap_or_else(|e| {
        warn!(error = %e, "unreadable stream batch, treating as empty");
        StreamEvent::default()
    });
    Json(gateway.handle_stream_event(event).await)
}

async fn dispatch(
    State(gateway): State<Gateway>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let request = inbound(&method, &uri, &body);
    into_response(gateway.handle_request(request).await)
}

/// Convert an HTTP request into a dispatcher event. Non-UTF-8 bodies are
/// passed through base64-encoded.
pub fn inbound(method: &Method, uri: &Uri, body: &[u8]) -> InboundRequest {
    let query_string_parameters = Query::<HashMap<String, String>>::try_from_uri(uri)
        .ok()
        .map(|Query(params)| params)
        .filter(|params| !params.is_empty());
    let (body, is_base64_encoded) = if body.is_empty() {
        (None, false)
    } else {
        match std::str::from_utf8(body) {
            Ok(text) => (Some(text.to_string()), false),
            Err(_) => (Some(STANDARD.encode(body)), true),
        }
    };
    InboundRequest {
        http_method: method.as_str().to_string(),
        path: uri.path().to_string(),
        body,
        is_base64_encoded,
        query_string_parameters,
    }
}

/// Convert a response envelope into an HTTP response.
pub fn into_response(envelope: ResponseEnvelope) -> Response {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    for (name, value) in &envelope.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
    }
    (status, headers, envelope.body).into_response()
}
