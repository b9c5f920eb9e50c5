//! Axum router configuration with middleware.
//!
//! Read-only history endpoints live under `/api/`; the realtime socket is
//! at `/ws`. Middleware: CORS (the browser frontend is served separately)
//! and request tracing.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/channels", get(handlers::channel::list_channels))
        .route(
            "/api/channels/{id}/messages",
            get(handlers::message::channel_messages),
        )
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
