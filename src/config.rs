//! Process configuration, read from a JSON file.

use crate::engine::EngineConfig;
use crate::error::{IoContext, Result, VectorDbError};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vector dimension accepted by the HTTP layer.
    pub dim: usize,
    /// Result count used when a search does not ask for one.
    pub top_k: usize,
    /// Directory holding the vector file and the metadata store.
    pub data_path: PathBuf,
    pub sync_writes: bool,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dim: 128,
            top_k: 10,
            data_path: PathBuf::from("./data"),
            sync_writes: true,
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults; a file that
    /// exists but does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).io_context("read config file", path),
        };

        let config: Config = serde_json::from_slice(&bytes).map_err(|e| {
            VectorDbError::SerializationError(format!(
                "failed to parse config {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(VectorDbError::InvalidConfig {
                reason: "dim must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sync_writes: self.sync_writes,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.dim, 128);
        assert_eq!(cfg.top_k, 10);
        assert_eq!(cfg.data_path, PathBuf::from("./data"));
        assert_eq!(cfg.server.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"dim": 3, "server": {"port": 9000}}"#).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.dim, 3);
        assert_eq!(cfg.top_k, 10);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(VectorDbError::SerializationError(_))
        ));
    }

    #[test]
    fn test_zero_dim_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"dim": 0}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, VectorDbError::InvalidConfig { .. }));
        assert!(err.to_string().starts_with("Invalid config"));
    }

    #[test]
    fn test_engine_config() {
        let cfg = Config {
            sync_writes: false,
            ..Config::default()
        };
        assert!(!cfg.engine_config().sync_writes);
    }
}
