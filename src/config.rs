use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Ticketing platform configuration
    pub ticketing: TicketingConfig,

    /// Oracle endpoint configuration
    pub oracles: OracleConfig,

    /// Classification context configuration
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Enrichment watchlist configuration
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: TRIAGE)
            .add_source(
                config::Environment::with_prefix("TRIAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingConfig {
    /// Base URL of the ticketing platform instance
    pub base_url: String,

    /// Username (from env var)
    pub username_env: Option<String>,

    /// Password (from env var)
    pub password_env: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_ticketing_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Classification oracle endpoint
    pub classification_url: String,

    /// Enrichment oracle endpoint
    pub enrichment_url: String,

    /// Per-call timeout (seconds); a timeout is treated as an error outcome
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Maximum category taxonomy age before it is flagged stale (hours)
    #[serde(default = "default_category_max_age")]
    pub category_max_age_hours: i64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            category_max_age_hours: default_category_max_age(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Enable the enrichment watchlist
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum watchlist entries processed per scheduler run
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Minimum minutes since an entry was last processed before it is
    /// eligible again
    #[serde(default = "default_quiet_window")]
    pub quiet_window_minutes: i64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            batch_size: default_batch_size(),
            quiet_window_minutes: default_quiet_window(),
        }
    }
}

impl EnrichmentConfig {
    /// Batch size with its floor of 1 applied
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Quiet window with its floor of 5 minutes applied
    pub fn effective_quiet_window_minutes(&self) -> i64 {
        self.quiet_window_minutes.max(5)
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "triage-pipeline".to_string()
}

fn default_ticketing_timeout() -> u64 {
    30
}

fn default_oracle_timeout() -> u64 {
    60
}

fn default_category_max_age() -> i64 {
    13
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    50
}

fn default_quiet_window() -> i64 {
    15
}
