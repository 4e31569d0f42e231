use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";
pub const ENV_PREFIX: &str = "BOURSE_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from a specific TOML file, then environment.
    ///
    /// Nested keys use a double underscore, e.g. `BOURSE_TELEGRAM__BOT_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source cannot be parsed.
    pub fn load_from(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults and environment");
        }
        let config: AppConfig = Self::figment(path).extract()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
