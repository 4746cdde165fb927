//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use shopfront_core::ShopfrontError;
use std::path::Path;
use tracing::{debug, info};

/// Loads the process-wide configuration once at startup.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates configuration from `config_dir`.
    ///
    /// Sources, later ones overriding earlier ones:
    /// 1. `{config_dir}/default.toml`
    /// 2. `{config_dir}/{environment}.toml` (`SHOPFRONT_ENVIRONMENT`, default `development`)
    /// 3. `{config_dir}/local.toml`
    /// 4. Environment variables such as `SHOPFRONT__CACHE__BACKEND`
    pub fn load(config_dir: impl AsRef<Path>) -> Result<AppConfig, ShopfrontError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("SHOPFRONT_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        info!(%environment, "Loading configuration");

        let builder = Self::file_sources(config_dir.as_ref(), &environment).add_source(
            Environment::with_prefix("SHOPFRONT")
                .separator("__")
                .try_parsing(true),
        );

        Self::finish(builder)
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<AppConfig, ShopfrontError> {
        Self::load("./config")
    }

    /// Loads and validates a single TOML file, without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<AppConfig, ShopfrontError> {
        let path = path.as_ref();
        let builder = Config::builder().add_source(File::from(path).required(true));
        Self::finish(builder)
    }

    fn file_sources(
        config_dir: &Path,
        environment: &str,
    ) -> config::ConfigBuilder<config::builder::DefaultState> {
        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = config_dir.join(format!("{}.toml", name));
            if path.exists() {
                debug!(path = %path.display(), "Loading config file");
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<AppConfig, ShopfrontError> {
        let app_config: AppConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error_to_shopfront_error)?;

        ConfigValidator::validate(&app_config).map_err(|errors| {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            ShopfrontError::Configuration(message)
        })?;

        info!(
            backend = %app_config.cache.effective_backend(),
            prefix = ?app_config.cache.key_prefix(),
            "Configuration loaded"
        );

        Ok(app_config)
    }
}

fn config_error_to_shopfront_error(err: ConfigError) -> ShopfrontError {
    ShopfrontError::Configuration(err.to_string())
}
