//! Business logic for the rental agency.
//!
//! Each service owns an in-memory view of one part of the data and writes it
//! through the storage traits. The ledger coordinates the catalog and the
//! client directory when rentals start and finish; callers lend it both.

pub mod billing;
pub mod client_directory;
pub mod clock;
pub mod commands;
pub mod credentials;
pub mod error;
pub mod export_service;
pub mod rental_ledger;
pub mod vehicle_catalog;

pub use billing::{BillingPolicy, RentalBill};
pub use client_directory::ClientDirectory;
pub use clock::{Clock, SystemClock};
pub use commands::accounts::{RegisterClientCommand, RegisterStaffCommand};
pub use commands::rentals::StartRentalCommand;
pub use credentials::{CredentialHasher, Sha256Hasher};
pub use error::{RentalError, RentalResult};
pub use export_service::{ExportService, RentalExport};
pub use rental_ledger::RentalLedger;
pub use vehicle_catalog::VehicleCatalog;
