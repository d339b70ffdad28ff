//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = first free port in the default range).
    /// Override: `JUKEBOX_BIND_PORT`
    pub bind_port: u16,

    /// Volume applied to every new session.
    /// Override: `JUKEBOX_DEFAULT_VOLUME`
    pub default_volume: u16,

    /// YAML catalog the resolver answers queries from.
    /// Override: `JUKEBOX_CATALOG`
    pub catalog: Option<PathBuf>,

    /// Origins allowed to call the HTTP API from a browser.
    pub trusted_origins: Vec<String>,

    pub resolve_timeout_ms: u64,
    pub node_timeout_ms: u64,
    pub join_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = jukebox_core::Config::default();
        Self {
            bind_port: 49500,
            default_volume: core.default_volume,
            catalog: None,
            trusted_origins: core.trusted_origins,
            resolve_timeout_ms: core.resolve_timeout_ms,
            node_timeout_ms: core.node_timeout_ms,
            join_timeout_ms: core.join_timeout_ms,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("JUKEBOX_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("JUKEBOX_DEFAULT_VOLUME") {
            if let Ok(volume) = val.parse() {
                self.default_volume = volume;
            }
        }

        // Note: JUKEBOX_CATALOG is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to jukebox-core's Config type.
    pub fn to_core_config(&self) -> jukebox_core::Config {
        jukebox_core::Config {
            preferred_port: self.bind_port,
            trusted_origins: self.trusted_origins.clone(),
            default_volume: self.default_volume,
            resolve_timeout_ms: self.resolve_timeout_ms,
            node_timeout_ms: self.node_timeout_ms,
            join_timeout_ms: self.join_timeout_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_yaml("default_volume: 80\ncatalog: /srv/catalog.yaml\n");
        let config = ServerConfig::from_file(file.path()).unwrap();

        assert_eq!(config.default_volume, 80);
        assert_eq!(config.catalog, Some(PathBuf::from("/srv/catalog.yaml")));
        assert_eq!(config.bind_port, 49500);
        assert_eq!(config.node_timeout_ms, jukebox_core::Config::default().node_timeout_ms);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_yaml("bind_port: [not, a, port]\n");
        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(ServerConfig::from_file(&path).is_err());
    }

    #[test]
    fn core_config_carries_server_values() {
        let config = ServerConfig {
            bind_port: 0,
            default_volume: 55,
            join_timeout_ms: 2_000,
            ..ServerConfig::default()
        };
        let core = config.to_core_config();

        assert_eq!(core.preferred_port, 0);
        assert_eq!(core.default_volume, 55);
        assert_eq!(core.join_timeout_ms, 2_000);
        assert!(core.validate().is_ok());
    }
}
