//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `TOURS_`, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/tour-service/config.toml
//! 4. System directory: /etc/tour-service/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! port = 3000
//! environment = "production"
//!
//! [middleware]
//! stack = ["request_id", "propagate_request_id", "trace", "body_limit", "catch_panic"]
//!
//! [store]
//! seed_file = "data/tours.json"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Directory name used for XDG and system config lookups
pub const CONFIG_NAMESPACE: &str = "tour-service";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TOURS_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Operating mode; controls how much error detail reaches clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Errors carry diagnostic detail, logs are human readable
    #[default]
    #[serde(alias = "dev")]
    Development,
    /// Unclassified errors are flattened, logs are JSON
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    /// Whether this is the production mode
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Operating mode
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            port: default_port(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
            environment: Environment::default(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One entry of the HTTP middleware stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddlewareKind {
    /// Generate `x-request-id` for requests that lack one
    RequestId,
    /// Copy `x-request-id` onto the response
    PropagateRequestId,
    /// Mark credentials headers as sensitive so they are not logged
    SensitiveHeaders,
    /// Per-request spans and response logging
    Trace,
    /// Cross-origin resource sharing
    Cors,
    /// Response compression
    Compression,
    /// Request timeout (`service.timeout_secs`)
    Timeout,
    /// Request body size limit (`middleware.body_limit_kb`)
    BodyLimit,
    /// Turn handler panics into 500 responses
    CatchPanic,
}

impl fmt::Display for MiddlewareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestId => write!(f, "request_id"),
            Self::PropagateRequestId => write!(f, "propagate_request_id"),
            Self::SensitiveHeaders => write!(f, "sensitive_headers"),
            Self::Trace => write!(f, "trace"),
            Self::Cors => write!(f, "cors"),
            Self::Compression => write!(f, "compression"),
            Self::Timeout => write!(f, "timeout"),
            Self::BodyLimit => write!(f, "body_limit"),
            Self::CatchPanic => write!(f, "catch_panic"),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Layers in request order: the first entry sees the request first
    #[serde(default = "default_stack")]
    pub stack: Vec<MiddlewareKind>,

    /// Request body size limit in KiB
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,

    /// CORS mode (permissive, restrictive)
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            stack: default_stack(),
            body_limit_kb: default_body_limit_kb(),
            cors_mode: default_cors_mode(),
        }
    }
}

impl MiddlewareConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_kb * 1024
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file with an array of tours loaded at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

// Default value functions
fn default_name() -> String {
    CONFIG_NAMESPACE.to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_stack() -> Vec<MiddlewareKind> {
    vec![
        MiddlewareKind::RequestId,
        MiddlewareKind::PropagateRequestId,
        MiddlewareKind::SensitiveHeaders,
        MiddlewareKind::Trace,
        MiddlewareKind::Cors,
        MiddlewareKind::Compression,
        MiddlewareKind::Timeout,
        MiddlewareKind::BodyLimit,
        MiddlewareKind::CatchPanic,
    ]
}

fn default_body_limit_kb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches the system directory, the XDG config directory, and the
    /// current working directory; later files override earlier ones and
    /// `TOURS_` environment variables override every file.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in Self::find_config_paths() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses directory discovery. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Config file candidates, lowest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc")
            .join(CONFIG_NAMESPACE)
            .join("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_NAMESPACE);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("config.toml"));
        paths
    }
}
