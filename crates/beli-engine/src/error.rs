//! Error types for the canvas server binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup and shutdown.

/// Top-level error for the canvas server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// The board store could not be opened or closed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: beli_db::StoreError,
    },

    /// The notification hub could not be started.
    #[error("hub error: {source}")]
    Hub {
        /// The underlying hub error.
        #[from]
        source: beli_events::HubError,
    },

    /// The HTTP server failed to start or crashed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: beli_server::ServerError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
