//! Route configuration: the six exposed operations plus a health check, with
//! the usual middleware layering order (CORS, request id, security headers,
//! trace, body limit) ambient to every route rather than wired per-handler.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use repurposer_core::PipelineConfig;
use repurposer_infra::{request_id_middleware, security_headers_middleware};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn setup_routes(config: &PipelineConfig, state: Arc<AppState>) -> Router<()> {
    let cors = setup_cors();

    let router = Router::new()
        .route(
            "/accounts/{account_id}/content",
            post(handlers::generate::generate),
        )
        .route(
            "/accounts/{account_id}/content/active",
            get(handlers::status::get_active_status),
        )
        .route(
            "/accounts/{account_id}/content/latest",
            get(handlers::status::get_latest_status),
        )
        .route(
            "/accounts/{account_id}/content/history",
            get(handlers::status::get_history),
        )
        .route(
            "/accounts/{account_id}/events",
            get(handlers::events::stream_events),
        )
        .route(
            "/accounts/{account_id}/sync",
            post(handlers::sync::sync_posts),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(ConcurrencyLimitLayer::new(config.db_max_connections as usize * 4));

    router
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}
