//! # Agency Config Repository
//!
//! Agency-wide settings stored in `agency_config.yaml` at the root of the data
//! directory.
//!
//! ## YAML Format
//!
//! ```yaml
//! data_format_version: "1.0"
//! penalty_block_hours: 3
//! nearing_return_days: 3
//! created_at: "2025-01-21T19:30:00Z"
//! updated_at: "2025-01-21T19:35:00Z"
//! ```

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use super::connection::StoreConnection;
use crate::storage::traits::ConfigStorage;

const CONFIG_FILE: &str = "agency_config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyConfig {
    /// Data format version for future migrations
    pub data_format_version: String,
    /// Late returns are charged one daily rate per started block of this many hours
    #[serde(default = "default_penalty_block_hours")]
    pub penalty_block_hours: i64,
    /// Window used by the "nearing return" catalog filter
    #[serde(default = "default_nearing_return_days")]
    pub nearing_return_days: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn default_penalty_block_hours() -> i64 {
    3
}

fn default_nearing_return_days() -> i64 {
    3
}

impl Default for AgencyConfig {
    fn default() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            data_format_version: "1.0".to_string(),
            penalty_block_hours: default_penalty_block_hours(),
            nearing_return_days: default_nearing_return_days(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigRepository {
    connection: StoreConnection,
}

impl ConfigRepository {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }

    fn config_path(&self) -> PathBuf {
        self.connection.base_directory().join(CONFIG_FILE)
    }

    fn save_config(&self, config: &AgencyConfig) -> Result<()> {
        let config_path = self.config_path();
        let yaml_content = serde_yaml::to_string(config)?;

        // Use atomic write pattern: write to temp file, then rename
        let temp_path = config_path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &config_path)?;

        debug!("Saved agency config to {:?}", config_path);
        Ok(())
    }

    fn validate(config: &AgencyConfig) -> Result<()> {
        if config.penalty_block_hours < 1 {
            return Err(anyhow::anyhow!("penalty_block_hours must be at least 1"));
        }
        if config.nearing_return_days < 0 {
            return Err(anyhow::anyhow!("nearing_return_days cannot be negative"));
        }
        Ok(())
    }
}

impl ConfigStorage for ConfigRepository {
    fn get_config(&self) -> Result<AgencyConfig> {
        let config_path = self.config_path();

        if config_path.exists() {
            let yaml_content = fs::read_to_string(&config_path)?;
            let config: AgencyConfig = serde_yaml::from_str(&yaml_content)?;
            Self::validate(&config)?;
            debug!("Loaded agency config from {:?}", config_path);
            Ok(config)
        } else {
            let config = AgencyConfig::default();
            self.save_config(&config)?;
            info!("Created default agency config at {:?}", config_path);
            Ok(config)
        }
    }

    fn update_config(&self, config: &AgencyConfig) -> Result<()> {
        Self::validate(config)?;

        let mut updated_config = config.clone();
        updated_config.updated_at = Utc::now().to_rfc3339();

        self.save_config(&updated_config)?;
        info!("Updated agency config");
        Ok(())
    }
}
