//! Persisted high-water marks for generated IDs (`sequences.yaml`).
//!
//! ```yaml
//! staff_id: 12
//! ```

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use super::connection::StoreConnection;
use crate::storage::traits::IdSequence;

const SEQUENCES_FILE: &str = "sequences.yaml";

/// One named counter inside `sequences.yaml`
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    connection: StoreConnection,
    name: String,
}

impl SequenceRepository {
    pub fn new(connection: StoreConnection, name: &str) -> Self {
        Self {
            connection,
            name: name.to_string(),
        }
    }

    fn sequences_path(&self) -> PathBuf {
        self.connection.base_directory().join(SEQUENCES_FILE)
    }

    fn load_marks(&self) -> Result<BTreeMap<String, u64>> {
        let path = self.sequences_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let yaml_content = fs::read_to_string(&path)?;
        if yaml_content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&yaml_content)?)
    }

    fn save_marks(&self, marks: &BTreeMap<String, u64>) -> Result<()> {
        let path = self.sequences_path();
        let yaml_content = serde_yaml::to_string(marks)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

impl IdSequence for SequenceRepository {
    fn next_id(&self) -> Result<u64> {
        let mut marks = self.load_marks()?;
        let next = marks.get(&self.name).copied().unwrap_or(0) + 1;
        marks.insert(self.name.clone(), next);
        self.save_marks(&marks)?;

        debug!("Reserved {} = {}", self.name, next);
        Ok(next)
    }

    fn current(&self) -> Result<u64> {
        Ok(self.load_marks()?.get(&self.name).copied().unwrap_or(0))
    }
}
