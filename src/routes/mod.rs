//! Route configuration.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, live};
use crate::state::AppState;

/// Create the live proxy WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for the Gemini Live session proxy
///
/// # Authentication
///
/// The identity token travels as a `?token=` query parameter (browser
/// WebSocket clients cannot set headers) or an `Authorization: Bearer`
/// header; verification happens inside the connection gate so refusals can
/// use the application close codes.
pub fn create_live_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(live::live_handler))
        .layer(TraceLayer::new_for_http())
}

/// Create the REST API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(api::health_check))
        .layer(TraceLayer::new_for_http())
}

/// Assemble the complete application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(create_live_router())
        .merge(create_api_router())
        .with_state(state)
}
