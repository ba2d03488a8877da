use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{
    ClientRepository, ConfigRepository, PhotoRepository, RentalRepository, SequenceRepository,
    StaffRepository, VehicleRepository,
};
use crate::storage::traits::Connection;

const DEFAULT_DIRECTORY_NAME: &str = "Rental Agency";
const REDIRECT_FILE_NAME: &str = ".rental_redirect";

/// StoreConnection manages the data directory and the file path of every collection
#[derive(Debug, Clone)]
pub struct StoreConnection {
    base_directory: PathBuf,
}

impl StoreConnection {
    /// Create a new connection rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a connection in the default data directory
    /// (`<documents>/Rental Agency`), following a redirect file if present
    pub fn new_default() -> Result<Self> {
        let documents_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow::anyhow!("Could not determine documents directory"))?;

        let default_data_dir = documents_dir.join(DEFAULT_DIRECTORY_NAME);
        let redirect_file = default_data_dir.join(REDIRECT_FILE_NAME);

        let actual_data_dir = if redirect_file.exists() {
            match fs::read_to_string(&redirect_file) {
                Ok(redirected_path) => {
                    let redirected_path = redirected_path.trim();
                    let path = PathBuf::from(redirected_path);

                    if path.exists() {
                        info!("Found redirect file, using data directory: {}", path.display());
                        path
                    } else {
                        warn!(
                            "Redirect file points to non-existent directory: {}. Using default.",
                            redirected_path
                        );
                        default_data_dir
                    }
                }
                Err(e) => {
                    error!("Failed to read redirect file: {}. Using default directory.", e);
                    default_data_dir
                }
            }
        } else {
            info!("Using default data directory: {}", default_data_dir.display());
            default_data_dir
        };

        Self::new(actual_data_dir)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of the YAML file backing a named collection
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_directory.join(format!("{}.yaml", collection))
    }

    pub fn photo_directory(&self, directory_name: &str) -> PathBuf {
        self.base_directory.join(directory_name)
    }
}

impl Connection for StoreConnection {
    type VehicleRepository = VehicleRepository;
    type ClientRepository = ClientRepository;
    type StaffRepository = StaffRepository;
    type RentalRepository = RentalRepository;
    type PhotoRepository = PhotoRepository;
    type StaffIdSequence = SequenceRepository;
    type ConfigRepository = ConfigRepository;

    fn create_vehicle_repository(&self) -> Self::VehicleRepository {
        VehicleRepository::new(self.clone())
    }

    fn create_client_repository(&self) -> Self::ClientRepository {
        ClientRepository::new(self.clone())
    }

    fn create_staff_repository(&self) -> Self::StaffRepository {
        StaffRepository::new(self.clone())
    }

    fn create_rental_repository(&self) -> Self::RentalRepository {
        RentalRepository::new(self.clone())
    }

    fn create_photo_repository(&self) -> Self::PhotoRepository {
        PhotoRepository::new(self.clone())
    }

    fn create_staff_id_sequence(&self) -> Self::StaffIdSequence {
        SequenceRepository::new(self.clone(), "staff_id")
    }

    fn create_config_repository(&self) -> Self::ConfigRepository {
        ConfigRepository::new(self.clone())
    }
}
