use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    /// Prefix for shareable URIs. Derived from the request Host header when unset.
    pub public_base_url: Option<String>,
    /// Exposes the soft-delete route.
    pub allow_deactivate: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    Redb,
    Sqlite,
}

impl std::str::FromStr for IndexBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redb" => Ok(IndexBackend::Redb),
            "sqlite" => Ok(IndexBackend::Sqlite),
            other => Err(ConfigError::ValidationError(format!(
                "INDEX_BACKEND must be 'sqlite' or 'redb', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub index_backend: IndexBackend,
    /// Root directory of the content store
    pub content_dir: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_backend: IndexBackend::Sqlite,
            content_dir: "./uploads".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            storage: StorageConfig::default(),
            public_base_url: None,
            allow_deactivate: false,
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or(defaults.node.bind_address);

        let data_dir = std::env::var("DATA_DIR").unwrap_or(defaults.node.data_dir);

        let index_backend = match std::env::var("INDEX_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.storage.index_backend,
        };

        let content_dir = std::env::var("CONTENT_DIR").unwrap_or(defaults.storage.content_dir);

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let allow_deactivate = std::env::var("ALLOW_DEACTIVATE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_size);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                index_backend,
                content_dir,
            },
            public_base_url,
            allow_deactivate,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.storage.content_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "CONTENT_DIR cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_index_backend() {
        assert_eq!("sqlite".parse::<IndexBackend>().unwrap(), IndexBackend::Sqlite);
        assert_eq!(" REDB ".parse::<IndexBackend>().unwrap(), IndexBackend::Redb);
        assert!("mysql".parse::<IndexBackend>().is_err());
    }

    #[test]
    fn rejects_zero_upload_size() {
        let config = Config {
            max_upload_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
