use super::schema::HarvestConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Missing fetch-service credential: set service.api_key or ${env}")]
    MissingCredential { env: String },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./harvest.yaml
    /// 2. ~/.harvest/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<HarvestConfig, ConfigError> {
        let local_config = PathBuf::from("./harvest.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".harvest").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(HarvestConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<HarvestConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: HarvestConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
