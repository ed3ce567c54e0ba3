//! REST endpoint handlers for the canvas API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text banner |
//! | `GET` | `/healthz` | Store reachability and observer count |
//! | `POST` | `/v1/draw` | Set one cell from a `{x, y, color}` body |
//! | `GET` | `/v1/info?x=&y=` | Read one cell as `{x, y, color}` |
//! | `GET` | `/v1/board` | Raw packed board, `application/octet-stream` |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Banner served at `GET /`.
pub const BANNER: &str = "B E L I\nE L I  \nL I     \nI\n";

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// A cell and its color, used both as the draw body and the info reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBody {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
    /// Color value.
    pub color: i64,
}

/// Query parameters for `GET /v1/info`.
#[derive(Debug, Deserialize)]
pub struct TileQuery {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
}

// ---------------------------------------------------------------------------
// GET / -- banner
// ---------------------------------------------------------------------------

/// Serve the plain-text banner.
pub async fn index() -> &'static str {
    BANNER
}

// ---------------------------------------------------------------------------
// GET /healthz -- store reachability
// ---------------------------------------------------------------------------

/// Report whether the board store answers, which backend is in use, and
/// how many observers are connected.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.board.store();
    let observers = state.hub.observer_count();
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "backend": store.backend_name(),
                "observers": observers,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "backend": store.backend_name(),
                    "observers": observers,
                })),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/draw -- set one cell
// ---------------------------------------------------------------------------

/// Validate and store one cell, then queue the change notification.
///
/// Replies with the accepted body. The notification is sent after the
/// reply is produced and never delays it.
pub async fn draw_tile(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TileBody>, JsonRejection>,
) -> Result<Json<TileBody>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    state.board.draw(body.x, body.y, body.color).await?;
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// GET /v1/info -- read one cell
// ---------------------------------------------------------------------------

/// Read the color at `?x=&y=`.
pub async fn get_tile(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TileQuery>, QueryRejection>,
) -> Result<Json<TileBody>, ApiError> {
    let Query(TileQuery { x, y }) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let color = state.board.tile(x, y).await?;
    Ok(Json(TileBody {
        x,
        y,
        color: i64::from(color),
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/board -- whole board
// ---------------------------------------------------------------------------

/// Return the packed board bytes in offset order.
pub async fn get_board(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.board.board().await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
