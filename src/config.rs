use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClipdexConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub upload_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub endpoint: String,
    /// Vector length every stored and query embedding must have.
    pub dimensions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: usize,
}

impl Default for ClipdexConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_clipdex_dir();
        Self {
            db_path: dir.join("images.db").to_string_lossy().into_owned(),
            upload_dir: dir.join("uploads").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "remote".into(),
            endpoint: "http://127.0.0.1:8008".into(),
            dimensions: 512,
            timeout_secs: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_k: 10 }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 12,
        }
    }
}

/// Returns `~/.clipdex/`, falling back to the working directory when no home
/// directory can be determined.
pub fn default_clipdex_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clipdex")
}

/// Returns the default config file path: `~/.clipdex/config.toml`
pub fn default_config_path() -> PathBuf {
    default_clipdex_dir().join("config.toml")
}

impl ClipdexConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ClipdexConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (CLIPDEX_DB, CLIPDEX_UPLOADS,
    /// CLIPDEX_LOG_LEVEL, CLIPDEX_PORT, CLIPDEX_EMBEDDING_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CLIPDEX_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("CLIPDEX_UPLOADS") {
            self.storage.upload_dir = val;
        }
        if let Ok(val) = std::env::var("CLIPDEX_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("CLIPDEX_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring unparsable CLIPDEX_PORT"),
            }
        }
        if let Ok(val) = std::env::var("CLIPDEX_EMBEDDING_URL") {
            self.embedding.endpoint = val;
        }
    }

    /// Reject settings the core cannot operate with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be greater than zero"
        );
        ensure!(
            self.pagination.default_page_size > 0,
            "pagination.default_page_size must be greater than zero"
        );
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the upload directory, expanding `~` if needed.
    pub fn resolved_upload_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.upload_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ClipdexConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.embedding.dimensions, 512);
        assert_eq!(config.search.default_k, 10);
        assert_eq!(config.pagination.default_page_size, 12);
        assert!(config.storage.db_path.ends_with("images.db"));
        config.validate().unwrap();
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[embedding]
dimensions = 768
"#;
        let config: ClipdexConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.embedding.dimensions, 768);
        // defaults still apply for unset fields
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.embedding.provider, "remote");
    }

    #[test]
    fn zero_dimensions_rejected() {
        let mut config = ClipdexConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = ClipdexConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.pagination.default_page_size, 12);
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/data/x.db"), PathBuf::from("/var/data/x.db"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ClipdexConfig::default();
        std::env::set_var("CLIPDEX_DB", "/tmp/override.db");
        std::env::set_var("CLIPDEX_LOG_LEVEL", "trace");
        std::env::set_var("CLIPDEX_PORT", "8123");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.server.port, 8123);

        // Clean up
        std::env::remove_var("CLIPDEX_DB");
        std::env::remove_var("CLIPDEX_LOG_LEVEL");
        std::env::remove_var("CLIPDEX_PORT");
    }
}
