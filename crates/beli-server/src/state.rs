//! Shared application state for the canvas API server.
//!
//! [`AppState`] holds the [`BoardService`] used by the REST handlers and
//! the [`NotificationHub`] that `WebSocket` connections register with.
//! It is wrapped in [`Arc`] and injected via Axum's `State` extractor.
//!
//! The state also carries a shutdown flag. Upgraded sockets outlive the
//! HTTP server's graceful shutdown, so they watch the flag and close
//! themselves once it is raised.

use std::sync::Arc;

use beli_events::NotificationHub;
use tokio::sync::watch;

use crate::service::BoardService;

/// Default number of undelivered frames a single socket may buffer before
/// it is considered too slow and dropped.
pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// Canvas operations (store + change queue).
    pub board: BoardService,
    /// Registry of connected change-stream observers.
    pub hub: Arc<NotificationHub>,
    /// Per-socket frame buffer size.
    pub observer_buffer: usize,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Create the application state.
    pub fn new(board: BoardService, hub: Arc<NotificationHub>, observer_buffer: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            board,
            hub,
            observer_buffer,
            shutdown,
        }
    }

    /// Tell every open `WebSocket` to close.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// A receiver that changes when shutdown begins.
    pub fn shutdown_watch(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
