//! API route handlers for the gateway.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use coursecast_core::types::ConnectionState;
use serde::Deserialize;

use crate::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "coursecast-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Current pairing challenge as an image data URL, or the session state when
/// no challenge is available.
pub async fn pairing_challenge(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.session.current_state() == ConnectionState::Ready {
        return (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready" })),
        );
    }
    match state.session.latest_challenge() {
        Some(challenge) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "qr_code_url": challenge.image_data_url,
                "generation": challenge.generation,
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "status": "pending" })),
        ),
    }
}

/// Session readiness probe.
pub async fn session_status(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let connection = state.session.current_state();
    if connection == ConnectionState::Ready {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready" })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "status": connection.to_string() })),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Forward a one-off message synchronously through the transport.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (Some(target), Some(message)) = (request.target, request.message) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "target and message are required" })),
        );
    };
    if target.is_empty() || message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "target and message are required" })),
        );
    }

    let transport = match state.session.transport() {
        Ok(transport) => transport,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": e.to_string() })),
            );
        }
    };

    // Give the receiving side time to resolve link previews before delivery.
    tokio::time::sleep(state.send_preview_delay).await;

    match transport.send_text(&target, &message).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": "Message sent successfully" })),
        ),
        Err(e) => {
            tracing::error!(error = %e, target, "gateway send failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to send message" })),
            )
        }
    }
}
