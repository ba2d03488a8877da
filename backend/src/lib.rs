//! # Rental Agency Backend
//!
//! Core of a vehicle rental agency: the vehicle catalog, client and staff
//! accounts, and the rental ledger that bills rentals and late returns.
//! Everything is synchronous and persisted as YAML files in one data
//! directory.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use shared::{Rental, Vehicle};

pub mod domain;
pub mod storage;

pub use domain::{RentalError, RentalResult};
pub use storage::{AgencyConfig, StoreConnection};

use domain::{
    BillingPolicy, ClientDirectory, Clock, CredentialHasher, ExportService, RentalLedger,
    Sha256Hasher, StartRentalCommand, SystemClock, VehicleCatalog,
};
use storage::{ConfigStorage, Connection};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` level. Safe to call more than once.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Main backend struct that wires every service to one storage connection
pub struct RentalAgency<C: Connection> {
    pub config: AgencyConfig,
    pub catalog: VehicleCatalog<C>,
    pub directory: ClientDirectory<C>,
    pub ledger: RentalLedger<C>,
    pub export_service: ExportService,
    clock: Arc<dyn Clock>,
}

impl RentalAgency<StoreConnection> {
    /// Open (or create) the agency data directory at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> RentalResult<Self> {
        let connection = StoreConnection::new(path)
            .map_err(|e| RentalError::persistence("data directory", e))?;
        Self::with_connection(connection, Arc::new(SystemClock), Arc::new(Sha256Hasher))
    }

    /// Open the data directory under the user's documents folder
    pub fn open_default() -> RentalResult<Self> {
        let connection = StoreConnection::new_default()
            .map_err(|e| RentalError::persistence("data directory", e))?;
        Self::with_connection(connection, Arc::new(SystemClock), Arc::new(Sha256Hasher))
    }
}

impl<C: Connection> RentalAgency<C> {
    pub fn with_connection(
        connection: C,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> RentalResult<Self> {
        let connection = Arc::new(connection);
        let config = connection
            .create_config_repository()
            .get_config()
            .map_err(|e| RentalError::persistence("config", e))?;

        let catalog = VehicleCatalog::new(connection.clone(), clock.clone(), config.nearing_return_days)?;
        let directory = ClientDirectory::new(connection.clone(), hasher)?;
        let ledger = RentalLedger::new(connection, clock.clone(), BillingPolicy::from(&config))?;

        info!(
            "Rental agency ready: {} vehicles, {} clients",
            catalog.len(),
            directory.list_clients().len()
        );

        Ok(Self {
            config,
            catalog,
            directory,
            ledger,
            export_service: ExportService::new(),
            clock,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Price of renting the vehicle with `plate` for `days` days
    pub fn quote(&self, plate: &str, days: i64) -> RentalResult<f64> {
        let vehicle: &Vehicle = self
            .catalog
            .find(plate)
            .ok_or_else(|| RentalError::not_found("vehicle", plate))?;
        self.ledger.quote(vehicle, days)
    }

    pub fn start_rental(&mut self, command: StartRentalCommand) -> RentalResult<Rental> {
        self.ledger
            .start_rental(&mut self.catalog, &mut self.directory, command)
    }

    pub fn finish_rental(&mut self, rental: &Rental) -> RentalResult<Rental> {
        self.ledger.finish_rental(&mut self.directory, rental)
    }

    pub fn find_active_rental(&mut self, plate: &str) -> RentalResult<Option<Rental>> {
        self.ledger.find_active_rental(plate)
    }

    /// CSV of the whole ledger, named after today's date
    pub fn export_rentals_csv(&mut self) -> RentalResult<domain::RentalExport> {
        let now = self.clock.now();
        self.export_service.export_ledger_csv(&mut self.ledger, now)
    }
}
