//! Configuration management
//!
//! This module handles loading and parsing configuration for tutorhub.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings, `.env` is honoured)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Bearer token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time chat configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/tutorhub.db".to_string()
}

/// Bearer token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify bearer tokens
    #[serde(default)]
    pub jwt_secret: String,
    /// Lifetime of an issued token in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    72
}

/// Real-time chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Require a valid bearer token before a chat socket is opened
    #[serde(default = "default_true")]
    pub require_auth: bool,
    /// Deliver every broadcast back to the connection that sent it
    #[serde(default = "default_true")]
    pub echo_to_sender: bool,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Close connections that send nothing for this many seconds (0 disables)
    #[serde(default)]
    pub idle_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            echo_to_sender: true,
            outbound_buffer: default_outbound_buffer(),
            idle_timeout_secs: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_outbound_buffer() -> usize {
    64
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - TUTORHUB_SERVER_HOST
    /// - TUTORHUB_SERVER_PORT
    /// - TUTORHUB_SERVER_CORS_ORIGIN
    /// - TUTORHUB_DATABASE_URL
    /// - TUTORHUB_AUTH_JWT_SECRET
    /// - TUTORHUB_AUTH_TOKEN_TTL_HOURS
    /// - TUTORHUB_CHAT_REQUIRE_AUTH
    /// - TUTORHUB_CHAT_ECHO_TO_SENDER
    /// - TUTORHUB_CHAT_OUTBOUND_BUFFER
    /// - TUTORHUB_CHAT_IDLE_TIMEOUT_SECS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Check settings that have no usable default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set (or TUTORHUB_AUTH_JWT_SECRET)".to_string(),
            ));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.chat.outbound_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "chat.outbound_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TUTORHUB_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("TUTORHUB_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("TUTORHUB_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("TUTORHUB_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("TUTORHUB_AUTH_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = env_parse::<i64>("TUTORHUB_AUTH_TOKEN_TTL_HOURS") {
            self.auth.token_ttl_hours = ttl;
        }

        if let Some(flag) = env_parse::<bool>("TUTORHUB_CHAT_REQUIRE_AUTH") {
            self.chat.require_auth = flag;
        }
        if let Some(flag) = env_parse::<bool>("TUTORHUB_CHAT_ECHO_TO_SENDER") {
            self.chat.echo_to_sender = flag;
        }
        if let Some(size) = env_parse::<usize>("TUTORHUB_CHAT_OUTBOUND_BUFFER") {
            self.chat.outbound_buffer = size;
        }
        if let Some(secs) = env_parse::<u64>("TUTORHUB_CHAT_IDLE_TIMEOUT_SECS") {
            self.chat.idle_timeout_secs = secs;
        }
    }
}

/// Read and parse an environment variable, ignoring invalid values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
