//! Application configuration schemas.
//!
//! Configuration is deserialized from a TOML file via the `config` crate,
//! overlaid with environment variables prefixed with `HOOKLINE__`.

pub mod logging;
pub mod plugin;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::plugin::PluginEntry;

use crate::error::PluginError;
use crate::result::PluginResult;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plugins to register, in registration order.
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

impl AppConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// A missing file is not an error; every section falls back to its
    /// defaults.
    pub fn load(path: &str) -> PluginResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("HOOKLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| PluginError::Configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| PluginError::Configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(source: &str) -> PluginResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Returns the enabled plugin entries in declaration order.
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &PluginEntry> {
        self.plugins.iter().filter(|entry| entry.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[[plugins]]
name = "env"

[[plugins]]
name = "router"
required = ["env"]
post = ["analyzer"]

[[plugins]]
name = "analyzer"
enabled = false
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml_str(SAMPLE).expect("parse");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.plugins.len(), 3);

        let router = config.plugins[1].options();
        assert_eq!(router.name.as_deref(), Some("router"));
        assert_eq!(router.required, vec!["env"]);
        assert_eq!(router.post, vec!["analyzer"]);
    }

    #[test]
    fn test_enabled_plugins_skips_disabled() {
        let config = AppConfig::from_toml_str(SAMPLE).expect("parse");
        let names: Vec<&str> = config.enabled_plugins().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["env", "router"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hookline.toml");
        std::fs::write(&path, SAMPLE).expect("write");

        let config = AppConfig::load(path.to_str().expect("utf8 path")).expect("load");
        assert_eq!(config.plugins.len(), 3);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent");

        let config = AppConfig::load(path.to_str().expect("utf8 path")).expect("load");
        assert!(config.plugins.is_empty());
        assert_eq!(config.logging.level, "info");
    }
}
