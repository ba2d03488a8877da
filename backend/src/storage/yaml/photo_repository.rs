use anyhow::{Context, Result};
use fs_extra::file::{copy as copy_file, CopyOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::connection::StoreConnection;
use crate::storage::traits::{PhotoOwner, PhotoStorage};

const PHOTO_DIRECTORY: &str = "photos";

/// Keeps photos under `photos/<owner kind>/`, renamed after the owning identity
#[derive(Debug, Clone)]
pub struct PhotoRepository {
    connection: StoreConnection,
    directory_name: String,
}

impl PhotoRepository {
    pub fn new(connection: StoreConnection) -> Self {
        Self {
            connection,
            directory_name: PHOTO_DIRECTORY.to_string(),
        }
    }

    /// Hex of the key bytes: safe on every platform and one-to-one
    fn file_stem(identity_key: &str) -> String {
        hex::encode(identity_key.as_bytes())
    }
}

impl PhotoStorage for PhotoRepository {
    fn store_photo(&self, original: &Path, owner: PhotoOwner, identity_key: &str) -> Result<PathBuf> {
        if !original.is_file() {
            warn!("Photo source does not exist: {:?}", original);
            return Err(anyhow::anyhow!("Photo source does not exist: {}", original.display()));
        }

        let photo_dir = self
            .connection
            .photo_directory(&self.directory_name)
            .join(owner.directory_name());
        if !photo_dir.exists() {
            fs::create_dir_all(&photo_dir)?;
            info!("Created photo directory: {:?}", photo_dir);
        }

        let mut file_name = Self::file_stem(identity_key);
        if let Some(extension) = original.extension().and_then(|e| e.to_str()) {
            file_name.push('.');
            file_name.push_str(&extension.to_ascii_lowercase());
        }
        let destination = photo_dir.join(file_name);

        let mut options = CopyOptions::new();
        options.overwrite = true;
        copy_file(original, &destination, &options)
            .with_context(|| format!("Failed to copy photo {:?} to {:?}", original, destination))?;

        info!("Stored {:?} photo for {} at {:?}", owner, identity_key, destination);
        Ok(destination)
    }
}
