//! Configuration for brickd

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Brick rendering configuration
    #[serde(default)]
    pub bricks: BrickConfig,

    /// Brick state configuration
    #[serde(default)]
    pub state: StateConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Brick rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickConfig {
    /// Page size of relation bricks
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Save reloading info sent by clients into brick states
    #[serde(default = "default_true")]
    pub persist_reloading_info: bool,

    /// Load the demonstration catalog and records at startup
    #[serde(default = "default_true")]
    pub demo_catalog: bool,
}

impl Default for BrickConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            persist_reloading_info: true,
            demo_catalog: true,
        }
    }
}

/// Brick state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Retries of a state upsert losing an insert race
    #[serde(default = "default_max_upsert_retries")]
    pub max_upsert_retries: u32,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_upsert_retries: default_max_upsert_retries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8180)
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_page_size() -> usize {
    10
}

fn default_max_upsert_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `BRICKD_`-prefixed environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // e.g. BRICKD_SERVER__LISTEN_ADDR, BRICKD_STATE__MAX_UPSERT_RETRIES
        builder = builder.add_source(
            config::Environment::with_prefix("BRICKD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
