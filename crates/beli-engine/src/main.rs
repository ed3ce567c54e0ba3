//! Beli canvas server binary.
//!
//! Wires the board store, the notification hub, and the HTTP server
//! together, then serves until Ctrl-C or `SIGTERM`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `beli-config.yaml` (or `$BELI_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the board geometry
//! 4. Open the board store (Dragonfly or in-memory)
//! 5. Start the change dispatcher
//! 6. Serve HTTP and `WebSocket` traffic until a shutdown signal
//! 7. Drain the dispatcher and close the store

mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use beli_db::BoardStore;
use beli_events::{NotificationHub, spawn_dispatcher};
use beli_server::{AppState, BoardService};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{BeliConfig, LogFormat, LoggingConfig, StoreBackendKind};
use crate::error::EngineError;

const DEFAULT_CONFIG_PATH: &str = "beli-config.yaml";

/// How long the dispatcher gets to flush queued notifications on shutdown.
const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let config = load_config()?;
    init_tracing(&config.logging)?;

    info!(
        dimension = config.board.dimension,
        bit_width = config.board.bit_width,
        backend = ?config.store.backend,
        port = config.server.port,
        "Configuration loaded"
    );

    let grid = config.grid()?;
    let hub_settings = config.hub_settings()?;

    let store = match config.store.backend {
        StoreBackendKind::Dragonfly => {
            info!(url = config.store.url, key = config.board.key, "Connecting to Dragonfly");
            BoardStore::connect_dragonfly(&config.store.url, &config.board.key, grid).await?
        }
        StoreBackendKind::Memory => {
            warn!("Using in-memory board, contents are lost on restart");
            BoardStore::in_memory(grid)?
        }
    };

    info!(
        backend = store.backend_name(),
        key = store.key(),
        cells = grid.cell_count(),
        bytes = grid.buffer_len(),
        "Board store opened"
    );

    let hub = Arc::new(NotificationHub::new());
    let (changes, mut dispatcher) = spawn_dispatcher(Arc::clone(&hub), hub_settings.queue_capacity)?;

    let state = Arc::new(AppState::new(
        BoardService::new(store.clone(), changes),
        hub,
        hub_settings.observer_buffer,
    ));

    let shutdown = {
        let state = Arc::clone(&state);
        async move {
            shutdown_signal().await;
            state.begin_shutdown();
        }
    };
    let served =
        beli_server::start_server(&config.server_config(), Arc::clone(&state), shutdown).await;

    // Open sockets were told to close when the signal arrived. Once they
    // and this handle release the state, the last ChangeQueue is gone and
    // the dispatcher drains and exits. A socket stuck on a dead peer is
    // covered by the drain timeout.
    state.begin_shutdown();
    drop(state);
    match tokio::time::timeout(DISPATCH_DRAIN_TIMEOUT, &mut dispatcher).await {
        Ok(Ok(stats)) => info!(
            dispatched = stats.dispatched,
            dropped = stats.dropped,
            "Change dispatcher drained"
        ),
        Ok(Err(e)) => warn!(error = %e, "Change dispatcher task failed"),
        Err(_) => {
            warn!("Change dispatcher did not drain in time, aborting");
            dispatcher.abort();
        }
    }

    if let Err(e) = store.close().await {
        warn!(error = %e, "Board store did not close cleanly");
    }

    served?;
    info!("beli shutdown complete");
    Ok(())
}

/// Load configuration from `$BELI_CONFIG` or `beli-config.yaml`.
///
/// A missing file is not an error; defaults plus environment overrides
/// are used instead.
fn load_config() -> Result<BeliConfig, EngineError> {
    let path = std::env::var_os("BELI_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(BeliConfig::from_file(&path)?)
    } else {
        let mut config = BeliConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

/// Resolve when the process receives Ctrl-C or, on Unix, `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
