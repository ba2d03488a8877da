//! Whole-collection load/save for YAML files.
//!
//! Current files hold a single YAML sequence. Older files were written one
//! record at a time as a stream of YAML documents; those are read document by
//! document until the end of the stream and rewritten in the current layout
//! on the next save.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Load every record of the collection stored at `path`.
/// A missing or empty file is an empty collection.
pub fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("Collection file {:?} does not exist, returning empty collection", path);
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read collection file {:?}", path))?;

    let records = parse_collection(&content)
        .with_context(|| format!("Failed to parse collection file {:?}", path))?;

    debug!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Replace the collection stored at `path` with `records`
pub fn save_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let staged = stage_collection(path, records)?;
    staged.commit()?;

    debug!("Saved {} records to {:?}", records.len(), path);
    Ok(())
}

/// A collection written to its temp file but not yet swapped into place
#[derive(Debug)]
pub struct StagedCollection {
    path: PathBuf,
    temp_path: PathBuf,
}

impl StagedCollection {
    /// Rename the temp file over the collection file
    pub fn commit(&self) -> Result<()> {
        fs::rename(&self.temp_path, &self.path)
            .with_context(|| format!("Failed to replace collection file {:?}", self.path))
    }

    /// Remove the temp file without touching the collection file
    pub fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.temp_path) {
            debug!("Could not remove temp file {:?}: {}", self.temp_path, e);
        }
    }
}

/// Serialize `records` into the temp file next to `path`
pub fn stage_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<StagedCollection> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created data directory: {:?}", parent);
        }
    }

    let yaml_content = serde_yaml::to_string(records)?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, yaml_content)
        .with_context(|| format!("Failed to write temp file {:?}", temp_path))?;

    Ok(StagedCollection {
        path: path.to_path_buf(),
        temp_path,
    })
}

/// Replace several collection files together. Every file is staged before
/// any is replaced; if a replacement fails, the files already replaced get
/// their previous content back.
pub fn save_collections_together(staged: Vec<Result<StagedCollection>>) -> Result<()> {
    let mut ready = Vec::with_capacity(staged.len());
    let mut first_error = None;
    for result in staged {
        match result {
            Ok(collection) => ready.push(collection),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_error {
        ready.iter().for_each(StagedCollection::discard);
        return Err(e);
    }

    let previous: Vec<Option<Vec<u8>>> = ready
        .iter()
        .map(|collection| {
            if collection.path.is_file() {
                fs::read(&collection.path).ok()
            } else {
                None
            }
        })
        .collect();

    for (index, collection) in ready.iter().enumerate() {
        if let Err(e) = collection.commit() {
            ready[index..].iter().for_each(StagedCollection::discard);
            for (done, old_content) in ready[..index].iter().zip(&previous) {
                restore_previous(&done.path, old_content.as_deref());
            }
            return Err(e);
        }
    }
    Ok(())
}

fn restore_previous(path: &Path, old_content: Option<&[u8]>) {
    let restored = match old_content {
        Some(content) => fs::write(path, content),
        None => fs::remove_file(path),
    };
    match restored {
        Ok(()) => warn!("Restored {:?} after a failed multi-file save", path),
        Err(e) => error!("Could not restore {:?} after a failed multi-file save: {}", path, e),
    }
}

/// Parse either layout: one sequence document, or one document per record
pub fn parse_collection<T: DeserializeOwned>(content: &str) -> Result<Vec<T>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut documents = serde_yaml::Deserializer::from_str(content);
    let first = match documents.next() {
        Some(document) => serde_yaml::Value::deserialize(document)?,
        None => return Ok(Vec::new()),
    };

    match first {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Sequence(_) => {
            if documents.next().is_some() {
                warn!("Ignoring extra YAML documents after the collection sequence");
            }
            Ok(serde_yaml::from_value(first)?)
        }
        record => {
            let mut records = vec![serde_yaml::from_value(record)?];
            for document in documents {
                let value = serde_yaml::Value::deserialize(document)?;
                if value.is_null() {
                    continue;
                }
                records.push(serde_yaml::from_value(value)?);
            }
            info!("Read {} records from legacy one-document-per-record layout", records.len());
            Ok(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        key: String,
        amount: f64,
    }

    fn record(key: &str, amount: f64) -> Record {
        Record {
            key: key.to_string(),
            amount,
        }
    }

    #[test]
    fn test_missing_and_empty_files_are_empty_collections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.yaml");

        let records: Vec<Record> = load_collection(&path).unwrap();
        assert!(records.is_empty());

        fs::write(&path, "").unwrap();
        let records: Vec<Record> = load_collection(&path).unwrap();
        assert!(records.is_empty());

        fs::write(&path, "[]\n").unwrap();
        let records: Vec<Record> = load_collection(&path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.yaml");
        let records = vec![record("a", 1.5), record("b", 2.0)];

        save_collection(&path, &records).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded: Vec<Record> = load_collection(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.yaml");

        save_collection(&path, &[record("a", 1.0), record("b", 2.0)]).unwrap();
        save_collection(&path, &[record("c", 3.0)]).unwrap();

        let loaded: Vec<Record> = load_collection(&path).unwrap();
        assert_eq!(loaded, vec![record("c", 3.0)]);
    }

    #[test]
    fn test_legacy_document_stream() {
        let legacy = "---\nkey: a\namount: 1.0\n---\nkey: b\namount: 2.5\n---\nkey: c\namount: 4.0\n";

        let records: Vec<Record> = parse_collection(legacy).unwrap();
        assert_eq!(records, vec![record("a", 1.0), record("b", 2.5), record("c", 4.0)]);
    }

    #[test]
    fn test_legacy_file_is_rewritten_in_current_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.yaml");
        fs::write(&path, "key: a\namount: 1.0\n---\nkey: b\namount: 2.0\n").unwrap();

        let records: Vec<Record> = load_collection(&path).unwrap();
        save_collection(&path, &records).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("- "));
        let reloaded: Vec<Record> = load_collection(&path).unwrap();
        assert_eq!(reloaded, records);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let result: Result<Vec<Record>> = parse_collection("- key: a\n  amount: not-a-number\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_replacement_restores_earlier_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.yaml");
        let second = temp_dir.path().join("second.yaml");
        let blocked = temp_dir.path().join("blocked.yaml");
        save_collection(&first, &[record("old", 1.0)]).unwrap();
        // A directory in place of the file makes the final rename fail
        fs::create_dir(&blocked).unwrap();

        let result = save_collections_together(vec![
            stage_collection(&first, &[record("new", 2.0)]),
            stage_collection(&second, &[record("new", 2.0)]),
            stage_collection(&blocked, &[record("new", 2.0)]),
        ]);
        assert!(result.is_err());

        let loaded: Vec<Record> = load_collection(&first).unwrap();
        assert_eq!(loaded, vec![record("old", 1.0)]);
        assert!(!second.exists());
        assert!(!first.with_extension("tmp").exists());
        assert!(!blocked.with_extension("tmp").exists());
    }

    #[test]
    fn test_collections_saved_together() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.yaml");
        let second = temp_dir.path().join("second.yaml");

        save_collections_together(vec![
            stage_collection(&first, &[record("a", 1.0)]),
            stage_collection(&second, &[record("b", 2.0)]),
        ])
        .unwrap();

        let loaded: Vec<Record> = load_collection(&second).unwrap();
        assert_eq!(loaded, vec![record("b", 2.0)]);
    }
}
