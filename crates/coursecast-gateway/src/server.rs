//! Gateway server state and router.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use coursecast_core::error::Result;
use coursecast_transport::SessionManager;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes;

pub struct AppState {
    pub session: Arc<SessionManager>,
    /// Pause before a forwarded send, so link previews resolve.
    pub send_preview_delay: Duration,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(session: Arc<SessionManager>, send_preview_delay: Duration) -> Self {
        Self {
            session,
            send_preview_delay,
            start_time: Instant::now(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/pairing-challenge", get(routes::pairing_challenge))
        .route("/session-status", get(routes::session_status))
        .route("/send", post(routes::send_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process shuts down.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "gateway listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
