//! HTTP server and runtime settings.

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Tracing filter directive (`RUST_LOG` syntax).
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Seconds between runs of the background billing sweep.
    #[serde(default = "defaults::sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Comma-separated CORS origins; unset means no cross-origin access.
    pub cors_origins: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

mod defaults {
    pub fn host() -> String {
        "0.0.0.0".to_string()
    }
    pub fn port() -> u16 {
        8080
    }
    pub fn log_level() -> String {
        "info,anesteasy_billing=debug,sqlx=warn".to_string()
    }
    pub fn request_timeout_secs() -> u64 {
        30
    }
    pub fn sweep_interval_secs() -> u64 {
        300
    }
}

impl ServerConfig {
    /// Bind address. Only valid after [`validate`](Self::validate) passes.
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .as_ref()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            environment: Environment::default(),
            log_level: defaults::log_level(),
            request_timeout_secs: defaults::request_timeout_secs(),
            sweep_interval_secs: defaults::sweep_interval_secs(),
            cors_origins: None,
        }
    }
}
