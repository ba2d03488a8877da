//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.
//!
//! Every collection is loaded and saved as a whole. A save either replaces the
//! entire collection or fails; there is no partial-write or multi-collection
//! transaction guarantee, so the domain layer is responsible for keeping
//! collections consistent with each other.

use anyhow::Result;
use std::path::{Path, PathBuf};

use shared::{Client, Rental, Staff, Vehicle};

use super::yaml::AgencyConfig;

/// Vehicle catalog persistence. Implementations may split the catalog into
/// per-variant collections, but load returns every variant.
pub trait VehicleStorage: Send + Sync {
    /// Load all vehicles (empty when nothing has been saved yet)
    fn load_vehicles(&self) -> Result<Vec<Vehicle>>;

    /// Replace the stored catalog with `vehicles`
    fn save_vehicles(&self, vehicles: &[Vehicle]) -> Result<()>;
}

/// Client record persistence
pub trait ClientStorage: Send + Sync {
    fn load_clients(&self) -> Result<Vec<Client>>;

    fn save_clients(&self, clients: &[Client]) -> Result<()>;
}

/// Staff record persistence
pub trait StaffStorage: Send + Sync {
    fn load_staff(&self) -> Result<Vec<Staff>>;

    fn save_staff(&self, staff: &[Staff]) -> Result<()>;
}

/// Rental ledger persistence. The ledger is always written as one unit.
pub trait RentalStorage: Send + Sync {
    fn load_rentals(&self) -> Result<Vec<Rental>>;

    fn save_rentals(&self, rentals: &[Rental]) -> Result<()>;

    /// First rental for `plate` that has not been returned yet
    fn find_active_rental(&self, plate: &str) -> Result<Option<Rental>> {
        Ok(self
            .load_rentals()?
            .into_iter()
            .find(|rental| rental.vehicle.plate == plate && rental.is_active()))
    }
}

/// Storage for profile and vehicle photos
/// Kind of record a photo belongs to. Each kind keeps its own key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhotoOwner {
    Vehicle,
    Client,
    Staff,
}

impl PhotoOwner {
    pub fn directory_name(self) -> &'static str {
        match self {
            PhotoOwner::Vehicle => "vehicles",
            PhotoOwner::Client => "clients",
            PhotoOwner::Staff => "staff",
        }
    }
}

pub trait PhotoStorage: Send + Sync {
    /// Copy the asset at `original` so it is keyed by `owner` and
    /// `identity_key`. Distinct keys never share a destination.
    /// Fails if the source file does not exist.
    fn store_photo(&self, original: &Path, owner: PhotoOwner, identity_key: &str) -> Result<PathBuf>;
}

/// Monotonic ID generator used for staff accounts
pub trait IdSequence: Send + Sync {
    /// Reserve and return the next ID
    fn next_id(&self) -> Result<u64>;

    /// Highest ID handed out so far (0 when none)
    fn current(&self) -> Result<u64>;
}

/// Agency-wide settings
pub trait ConfigStorage: Send + Sync {
    /// Get the configuration, creating the default on first use
    fn get_config(&self) -> Result<AgencyConfig>;

    fn update_config(&self, config: &AgencyConfig) -> Result<()>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type and provides factory
/// methods for creating repositories, so the domain layer can work with any
/// storage backend without knowing the implementation details.
pub trait Connection: Send + Sync + Clone {
    type VehicleRepository: VehicleStorage;
    type ClientRepository: ClientStorage;
    type StaffRepository: StaffStorage;
    type RentalRepository: RentalStorage;
    type PhotoRepository: PhotoStorage;
    type StaffIdSequence: IdSequence + 'static;
    type ConfigRepository: ConfigStorage;

    fn create_vehicle_repository(&self) -> Self::VehicleRepository;

    fn create_client_repository(&self) -> Self::ClientRepository;

    fn create_staff_repository(&self) -> Self::StaffRepository;

    fn create_rental_repository(&self) -> Self::RentalRepository;

    fn create_photo_repository(&self) -> Self::PhotoRepository;

    fn create_staff_id_sequence(&self) -> Self::StaffIdSequence;

    fn create_config_repository(&self) -> Self::ConfigRepository;
}
