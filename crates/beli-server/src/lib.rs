//! Canvas API server for Beli.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Write endpoint** (`POST /v1/draw`) that validates a `{x, y, color}`
//!   body, stores the cell, and queues a change notification
//! - **Read endpoints** (`GET /v1/info`, `GET /v1/board`) for a single cell
//!   or the raw packed board
//! - **`WebSocket` change stream** (`GET /ws`) pushing one
//!   `"<offset>,<color>"` text frame per committed write
//! - **Banner and health** (`GET /`, `GET /healthz`)
//!
//! # Architecture
//!
//! Handlers call [`BoardService`], which owns the board store handle and
//! the producer side of the change queue. A write's response never waits
//! on notification fan-out: the event is queued and the dispatch loop in
//! `beli-events` delivers it to every connected socket.
//!
//! [`BoardService`]: service::BoardService

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod service;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use service::BoardService;
pub use state::AppState;
