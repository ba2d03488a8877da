//! # YAML Storage Module
//!
//! File-based storage for the rental agency. Each collection lives in its own
//! YAML file at the root of the data directory.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── agency_config.yaml
//! ├── sequences.yaml
//! ├── cars.yaml
//! ├── motorcycles.yaml
//! ├── trucks.yaml
//! ├── clients.yaml
//! ├── staff.yaml
//! ├── rentals.yaml
//! └── photos/
//!     └── {identity_key}.{ext}
//! ```
//!
//! ## Features
//!
//! - One YAML sequence per collection, replaced as a whole on every save
//! - Atomic file writes with temp files
//! - Legacy files holding one YAML document per record are still readable

pub mod collection_file;
pub mod config_repository;
pub mod connection;
pub mod people_repository;
pub mod photo_repository;
pub mod rental_repository;
pub mod sequence_repository;
pub mod vehicle_repository;

pub use config_repository::{AgencyConfig, ConfigRepository};
pub use connection::StoreConnection;
pub use people_repository::{ClientRepository, StaffRepository};
pub use photo_repository::PhotoRepository;
pub use rental_repository::RentalRepository;
pub use sequence_repository::SequenceRepository;
pub use vehicle_repository::VehicleRepository;
