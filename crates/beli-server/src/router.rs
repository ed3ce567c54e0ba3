//! Axum router construction for the canvas API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with request IDs, tracing, CORS, and a per-request timeout.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// How long CORS preflight responses may be cached, in seconds.
const CORS_MAX_AGE_SECS: u64 = 300;

/// Build the complete Axum router for the canvas server.
///
/// The router includes:
/// - `GET /` -- plain-text banner
/// - `GET /healthz` -- store health
/// - `GET /ws` -- `WebSocket` change stream
/// - `POST /v1/draw` -- set one cell
/// - `GET /v1/info` -- read one cell
/// - `GET /v1/board` -- raw board bytes
///
/// CORS allows any origin. Requests that take longer than
/// `request_timeout` are answered with `408`.
pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS));

    let v1 = Router::new()
        .route("/draw", post(handlers::draw_tile))
        .route("/info", get(handlers::get_tile))
        .route("/board", get(handlers::get_board));

    Router::new()
        // Banner and health
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_changes))
        // REST API
        .nest("/v1", v1)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
