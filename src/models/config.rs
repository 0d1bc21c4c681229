//! Configuration model loaded from external sources.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::processing::bucket::{BucketPolicy, TimeBucketer};
use crate::processing::embedding::parse_embedding_model;
use crate::processing::ingest::IngestSettings;
use crate::{BATCH_SIZE, MIN_CHARS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize)]
/// Worker settings shared across handlers.
pub struct ServerConfig {
    pub database_url: String,
    pub zmq_address: String,
    pub input_csv: PathBuf,
    pub embedding_model: String,
    pub batch_size: usize,
    pub min_chars: usize,
    pub bucket_policy: BucketPolicy,
}

impl ServerConfig {
    /// Load defaults, then `config/default.yaml`, then the file named by
    /// `APP_CONFIG`, then `APP_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("database_url", "app.db")?
            .set_default("zmq_address", "tcp://127.0.0.1:5555")?
            .set_default("input_csv", "data/cube_data.csv")?
            .set_default("embedding_model", "multilingual-e5-large")?
            .set_default("batch_size", BATCH_SIZE as u64)?
            .set_default("min_chars", MIN_CHARS as u64)?
            .set_default("bucket_policy", "ten_day")?
            .add_source(File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var("APP_CONFIG") {
            builder = builder.add_source(File::with_name(&path));
        }

        let config: ServerConfig = builder
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".into()));
        }
        if self.min_chars == 0 {
            return Err(ConfigError::Invalid("min_chars must be positive".into()));
        }
        parse_embedding_model(&self.embedding_model)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            batch_size: self.batch_size,
            min_chars: self.min_chars,
            bucketer: TimeBucketer::new(self.bucket_policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            database_url: "app.db".into(),
            zmq_address: "tcp://127.0.0.1:5555".into(),
            input_csv: "data/cube_data.csv".into(),
            embedding_model: "multilingual-e5-large".into(),
            batch_size: 200,
            min_chars: 500,
            bucket_policy: BucketPolicy::TenDay,
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = ServerConfig {
            batch_size: 0,
            ..config()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let config = ServerConfig {
            embedding_model: "bert-from-scratch".into(),
            ..config()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn settings_follow_config() {
        let settings = ServerConfig {
            batch_size: 50,
            bucket_policy: BucketPolicy::Week,
            ..config()
        }
        .ingest_settings();

        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.min_chars, 500);
        assert_eq!(settings.bucketer.policy(), BucketPolicy::Week);
    }
}
