//! Typed configuration loaded from the environment.
//!
//! Settings come from environment variables (a `.env` file is honored in
//! development via `dotenvy`). Variables use the `ANESTEASY_BILLING` prefix
//! with `__` separating nested sections, e.g.
//! `ANESTEASY_BILLING__DATABASE__URL` maps to `database.url`.
//!
//! Loading and validation are separate steps so boot code can report type
//! errors and semantic errors distinctly:
//!
//! ```no_run
//! use anesteasy_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod gateway;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Supabase JWT verification settings.
    pub auth: AuthConfig,

    /// Pagar.me API and webhook settings.
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Reads and deserializes the environment. Fails on missing required
    /// sections or unparseable values; semantic checks live in
    /// [`validate`](Self::validate).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ANESTEASY_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation across all sections. Auth rules depend on the
    /// environment (production requires a full-strength JWT secret).
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.gateway.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
