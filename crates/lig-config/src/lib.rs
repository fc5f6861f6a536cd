//! # lig-config
//!
//! Layered configuration loading for Ligature using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LIGATURE_*` prefix, `__` as separator)
//! 2. Project-level `.ligature/config.toml`
//! 3. User-level `~/.config/ligature/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `LIGATURE_ENGINE__CID_PREFIX` -> `engine.cid_prefix`,
//! `LIGATURE_LOG__FILTER` -> `log.filter`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use lig_config::LigConfig;
//!
//! let config = LigConfig::load_with_dotenv().expect("config");
//! println!("id attribute: {}", config.engine.id_attribute);
//! ```

mod engine;
mod error;
mod log;

pub use engine::EngineConfig;
pub use error::ConfigError;
pub use log::LogConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LigConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl LigConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`LigConfig::load_with_dotenv`] if you
    /// need `.env` file loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Load defaults, then one explicit TOML file, then environment variables.
    ///
    /// Used by the CLI `--config` flag; the user and project files are skipped.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LIGATURE_").split("__"));
        Self::extract(figment)
    }

    /// Build the figment provider chain.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".ligature/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("LIGATURE_").split("__"))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ligature").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) looking for a `.env`
    /// file, then falls back to the current directory. Silently does nothing
    /// if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = LigConfig::default();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.log.filter, "warn");
    }

    #[test]
    fn figment_builds_without_files() {
        let config: LigConfig = LigConfig::figment()
            .extract()
            .expect("should extract defaults");
        assert_eq!(config.engine.cid_prefix, "c");
        assert!(config.engine.strict_nested);
    }
}
