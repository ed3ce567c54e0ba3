//! Configuration loading and typed config structures for the canvas server.
//!
//! Configuration lives in `beli-config.yaml` next to the binary's working
//! directory. Every field has a default, so an empty or missing file yields
//! a usable 10x10, 8-bit board backed by a local Dragonfly.

use std::path::Path;
use std::time::Duration;

use beli_db::DEFAULT_BOARD_KEY;
use beli_events::{MAX_OBSERVER_BUFFER, MAX_QUEUE_CAPACITY};
use beli_server::ServerConfig;
use beli_types::GridSpec;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Env {
        /// Name of the variable.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The board geometry is unusable.
    #[error("invalid board settings: {0}")]
    Board(String),

    /// A notification queue size is out of range.
    #[error("invalid hub settings: {0}")]
    Hub(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `beli-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BeliConfig {
    /// Canvas geometry and storage key.
    #[serde(default)]
    pub board: BoardConfig,

    /// Which store backend to use and where it lives.
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Notification queue sizing.
    #[serde(default)]
    pub hub: HubConfig,

    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BeliConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// Recognized variables: `PORT`, `HOST`, `REDIS_URL`, `BOARD_KEY`,
    /// `STORE_BACKEND`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment lookups.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable holds an unusable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable holds an unusable value.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PORT") {
            self.server.port = val
                .trim()
                .parse()
                .map_err(|_e| ConfigError::Env { var: "PORT", value: val })?;
        }
        if let Some(val) = lookup("HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("REDIS_URL") {
            self.store.url = val;
        }
        if let Some(val) = lookup("BOARD_KEY") {
            self.board.key = val;
        }
        if let Some(val) = lookup("STORE_BACKEND") {
            self.store.backend = match val.trim().to_ascii_lowercase().as_str() {
                "dragonfly" | "redis" => StoreBackendKind::Dragonfly,
                "memory" => StoreBackendKind::Memory,
                _ => {
                    return Err(ConfigError::Env {
                        var: "STORE_BACKEND",
                        value: val,
                    });
                }
            };
        }
        Ok(())
    }

    /// Build and validate the board geometry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Board`] for an unsupported dimension or bit
    /// width.
    pub fn grid(&self) -> Result<GridSpec, ConfigError> {
        GridSpec::new(self.board.dimension, self.board.bit_width)
            .map_err(|e| ConfigError::Board(e.to_string()))
    }

    /// Validate the notification queue sizes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Hub`] if `queue_capacity` is outside
    /// `1..=`[`MAX_QUEUE_CAPACITY`] or `observer_buffer` is outside
    /// `1..=`[`MAX_OBSERVER_BUFFER`].
    pub fn hub_settings(&self) -> Result<HubConfig, ConfigError> {
        let HubConfig {
            queue_capacity,
            observer_buffer,
        } = self.hub;
        if !(1..=MAX_QUEUE_CAPACITY).contains(&queue_capacity) {
            return Err(ConfigError::Hub(format!(
                "queue_capacity {queue_capacity} is outside 1..={MAX_QUEUE_CAPACITY}"
            )));
        }
        if !(1..=MAX_OBSERVER_BUFFER).contains(&observer_buffer) {
            return Err(ConfigError::Hub(format!(
                "observer_buffer {observer_buffer} is outside 1..={MAX_OBSERVER_BUFFER}"
            )));
        }
        Ok(self.hub)
    }

    /// Listener settings for the HTTP server.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            request_timeout: Duration::from_millis(self.server.request_timeout_ms),
        }
    }
}

/// Canvas geometry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoardConfig {
    /// Side length N of the N x N board.
    #[serde(default = "default_dimension")]
    pub dimension: u32,

    /// Bits per cell, `1..=32`.
    ///
    /// The `memory` backend updates cells with a 32-bit compare-and-swap
    /// and so only accepts widths that divide 32 (1, 2, 4, 8, 16, 32).
    /// The `dragonfly` backend accepts any width, such as 24 for RGB.
    #[serde(default = "default_bit_width")]
    pub bit_width: u32,

    /// Key the board is stored under.
    #[serde(default = "default_board_key")]
    pub key: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            bit_width: default_bit_width(),
            key: default_board_key(),
        }
    }
}

/// Store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// Redis-compatible server reached over the network.
    #[default]
    Dragonfly,
    /// In-process board, lost on restart.
    Memory,
}

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Which backend holds the board.
    #[serde(default)]
    pub backend: StoreBackendKind,

    /// Connection URL for the `dragonfly` backend.
    #[serde(default = "default_store_url")]
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            url: default_store_url(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Notification queue sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Undispatched changes kept before the oldest are dropped. Rounded up
    /// to the next power of two.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Frames buffered per WebSocket client before it is disconnected.
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            observer_buffer: default_observer_buffer(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_dimension() -> u32 {
    beli_types::grid::DEFAULT_DIMENSION
}

const fn default_bit_width() -> u32 {
    beli_types::grid::DEFAULT_BIT_WIDTH
}

fn default_board_key() -> String {
    DEFAULT_BOARD_KEY.to_owned()
}

fn default_store_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3333
}

const fn default_request_timeout_ms() -> u64 {
    15_000
}

const fn default_queue_capacity() -> usize {
    1024
}

const fn default_observer_buffer() -> usize {
    beli_server::state::DEFAULT_OBSERVER_BUFFER
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = BeliConfig::parse("").unwrap();
        assert_eq!(config, BeliConfig::default());
        assert_eq!(config.board.dimension, 10);
        assert_eq!(config.board.bit_width, 8);
        assert_eq!(config.board.key, "CURRENT_BOARD");
        assert_eq!(config.store.backend, StoreBackendKind::Dragonfly);
        assert_eq!(config.store.url, "redis://localhost:6379");
        assert_eq!(config.server.port, 3333);
        assert_eq!(config.server.request_timeout_ms, 15_000);
        assert_eq!(config.hub.queue_capacity, 1024);
        assert_eq!(config.hub.observer_buffer, 64);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
board:
  dimension: 64
  bit_width: 4
  key: "TEST_BOARD"
store:
  backend: memory
  url: "redis://cache:6379"
server:
  host: "127.0.0.1"
  port: 8080
  request_timeout_ms: 2000
hub:
  queue_capacity: 16
  observer_buffer: 8
logging:
  level: "debug"
  format: json
"#;
        let config = BeliConfig::parse(yaml).unwrap();
        assert_eq!(config.board.dimension, 64);
        assert_eq!(config.board.bit_width, 4);
        assert_eq!(config.board.key, "TEST_BOARD");
        assert_eq!(config.store.backend, StoreBackendKind::Memory);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.hub.queue_capacity, 16);
        assert_eq!(config.logging.format, LogFormat::Json);

        let server = config.server_config();
        assert_eq!(server.port, 8080);
        assert_eq!(server.request_timeout, Duration::from_secs(2));

        let grid = config.grid().unwrap();
        assert_eq!(grid.cell_count(), 4096);
        assert_eq!(grid.buffer_len(), 2048);
    }

    #[test]
    fn parse_partial_yaml_fills_defaults() {
        let config = BeliConfig::parse("server:\n  port: 4000\n").unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.board, BoardConfig::default());
    }

    #[test]
    fn parse_rejects_unknown_backend() {
        assert!(matches!(
            BeliConfig::parse("store:\n  backend: postgres\n"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = BeliConfig::default();
        config
            .apply_overrides_from(env(&[
                ("PORT", "9000"),
                ("HOST", "127.0.0.1"),
                ("REDIS_URL", "redis://other:6380"),
                ("BOARD_KEY", "OTHER"),
                ("STORE_BACKEND", "Memory"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.url, "redis://other:6380");
        assert_eq!(config.board.key, "OTHER");
        assert_eq!(config.store.backend, StoreBackendKind::Memory);
    }

    #[test]
    fn env_overrides_reject_garbage() {
        let mut config = BeliConfig::default();
        assert!(matches!(
            config.apply_overrides_from(env(&[("PORT", "eighty")])),
            Err(ConfigError::Env { var: "PORT", .. })
        ));
        assert!(matches!(
            config.apply_overrides_from(env(&[("STORE_BACKEND", "sqlite")])),
            Err(ConfigError::Env { var: "STORE_BACKEND", .. })
        ));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let mut config = BeliConfig::default();
        config.board.bit_width = 33;
        assert!(matches!(config.grid(), Err(ConfigError::Board(_))));

        config.board.bit_width = 24;
        assert_eq!(config.grid().unwrap().max_color(), 0x00FF_FFFF);

        config.board.bit_width = 8;
        config.board.dimension = 0;
        assert!(matches!(config.grid(), Err(ConfigError::Board(_))));
    }

    #[test]
    fn hub_sizes_are_bounded() {
        let mut config = BeliConfig::default();
        assert_eq!(config.hub_settings().unwrap(), HubConfig::default());

        for capacity in [0, MAX_QUEUE_CAPACITY.saturating_add(1), usize::MAX] {
            config.hub.queue_capacity = capacity;
            assert!(matches!(config.hub_settings(), Err(ConfigError::Hub(_))));
        }
        config.hub.queue_capacity = MAX_QUEUE_CAPACITY;
        assert!(config.hub_settings().is_ok());

        for buffer in [0, MAX_OBSERVER_BUFFER.saturating_add(1), usize::MAX] {
            config.hub.observer_buffer = buffer;
            assert!(matches!(config.hub_settings(), Err(ConfigError::Hub(_))));
        }
    }

    #[test]
    fn huge_hub_sizes_in_yaml_are_rejected_not_fatal() {
        let config =
            BeliConfig::parse("hub:\n  queue_capacity: 18446744073709551615\n").unwrap();
        assert!(matches!(config.hub_settings(), Err(ConfigError::Hub(_))));
    }
}
