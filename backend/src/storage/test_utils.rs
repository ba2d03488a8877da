//! Test utilities module for automatic cleanup and consistent test infrastructure
//!
//! This module provides RAII-based cleanup that guarantees test data is removed
//! even if tests panic or fail, sample records, and a connection that can be
//! told to fail saves for chosen collections.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use shared::{Address, Client, Rental, Staff, TrailerType, Vehicle, VehicleKind};

use crate::domain::clock::Clock;

use super::traits::{
    ClientStorage, Connection, IdSequence, RentalStorage, StaffStorage, VehicleStorage,
};
use super::yaml::{ConfigRepository, PhotoRepository, SequenceRepository, StoreConnection};

/// Test environment that provides a temporary directory and connection
/// that will be automatically cleaned up when the environment is dropped,
/// even if tests panic or fail.
pub struct TestEnvironment {
    pub connection: StoreConnection,
    /// Base directory path for manual inspection if needed
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir, // Keep alive to prevent cleanup
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        init_test_logging();
        let temp_dir = TempDir::new()?;
        let connection = StoreConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }

    /// Connection over the same directory whose saves can be made to fail
    pub fn faulty_connection(&self) -> FaultyConnection {
        FaultyConnection::new(self.connection.clone())
    }
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn sample_car(plate: &str, brand: &str, daily_rate: f64) -> Vehicle {
    Vehicle {
        plate: plate.to_string(),
        brand: brand.to_string(),
        model: "Model".to_string(),
        year: 2020,
        color: "Red".to_string(),
        daily_rate,
        rental_count: 0,
        photo_path: None,
        kind: VehicleKind::Car {
            doors: 4,
            spoiler: false,
        },
    }
}

pub fn sample_motorcycle(plate: &str) -> Vehicle {
    Vehicle {
        plate: plate.to_string(),
        brand: "Honda".to_string(),
        model: "CB500".to_string(),
        year: 2019,
        color: "Black".to_string(),
        daily_rate: 45.0,
        rental_count: 0,
        photo_path: None,
        kind: VehicleKind::Motorcycle {
            engine_cc: 471,
            cargo_rack: true,
            tire_radius: 17.0,
        },
    }
}

pub fn sample_truck(plate: &str) -> Vehicle {
    Vehicle {
        plate: plate.to_string(),
        brand: "Volvo".to_string(),
        model: "FH16".to_string(),
        year: 2021,
        color: "White".to_string(),
        daily_rate: 300.0,
        rental_count: 0,
        photo_path: None,
        kind: VehicleKind::Truck {
            max_load_kg: 18000.0,
            height_m: 4.0,
            width_m: 2.55,
            length_m: 13.6,
            trailer: TrailerType::Box,
        },
    }
}

pub fn sample_client(tax_id: &str, email: &str, balance: f64) -> Client {
    Client {
        tax_id: tax_id.to_string(),
        name: format!("Client {}", tax_id),
        email: email.to_string(),
        phone: "555-0100".to_string(),
        address: Address::default(),
        photo_path: None,
        balance,
        password_hash: "not-a-real-hash".to_string(),
    }
}

pub fn sample_staff(id: u64, email: &str) -> Staff {
    Staff {
        id,
        name: format!("Staff {}", id),
        email: email.to_string(),
        phone: "555-0199".to_string(),
        address: Address::default(),
        photo_path: None,
        password_hash: "not-a-real-hash".to_string(),
    }
}

pub fn sample_rental(vehicle: &Vehicle, client: &Client, start: DateTime<Utc>, days: i64) -> Rental {
    Rental {
        id: Rental::generate_id(&vehicle.plate, &start),
        vehicle: vehicle.clone(),
        client: client.summary(),
        start,
        planned_return: start + Duration::days(days),
        actual_return: None,
        total: vehicle.daily_rate * days as f64,
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory ID sequence with a chosen starting point
#[derive(Debug, Default)]
pub struct InMemorySequence {
    last: AtomicU64,
}

impl InMemorySequence {
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }
}

impl IdSequence for InMemorySequence {
    fn next_id(&self) -> Result<u64> {
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn current(&self) -> Result<u64> {
        Ok(self.last.load(Ordering::SeqCst))
    }
}

/// Shared switchboard deciding which collection saves fail.
/// Each entry is the number of saves still allowed to succeed.
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    remaining: Arc<Mutex<HashMap<&'static str, usize>>>,
}

impl FaultSwitch {
    /// Every save of `collection` fails from now on
    pub fn fail_saves(&self, collection: &'static str) {
        self.fail_saves_after(collection, 0);
    }

    /// Let `successes` saves of `collection` through, then fail the rest
    pub fn fail_saves_after(&self, collection: &'static str, successes: usize) {
        self.remaining.lock().unwrap().insert(collection, successes);
    }

    pub fn heal(&self, collection: &'static str) {
        self.remaining.lock().unwrap().remove(collection);
    }

    fn check(&self, collection: &'static str) -> Result<()> {
        let mut remaining = self.remaining.lock().unwrap();
        match remaining.get_mut(collection) {
            Some(0) => Err(anyhow::anyhow!("injected save failure for {}", collection)),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Repository wrapper that consults a [`FaultSwitch`] before every save
#[derive(Debug, Clone)]
pub struct Faulty<R> {
    inner: R,
    faults: FaultSwitch,
}

impl<R: VehicleStorage> VehicleStorage for Faulty<R> {
    fn load_vehicles(&self) -> Result<Vec<Vehicle>> {
        self.inner.load_vehicles()
    }

    fn save_vehicles(&self, vehicles: &[Vehicle]) -> Result<()> {
        self.faults.check("vehicles")?;
        self.inner.save_vehicles(vehicles)
    }
}

impl<R: ClientStorage> ClientStorage for Faulty<R> {
    fn load_clients(&self) -> Result<Vec<Client>> {
        self.inner.load_clients()
    }

    fn save_clients(&self, clients: &[Client]) -> Result<()> {
        self.faults.check("clients")?;
        self.inner.save_clients(clients)
    }
}

impl<R: StaffStorage> StaffStorage for Faulty<R> {
    fn load_staff(&self) -> Result<Vec<Staff>> {
        self.inner.load_staff()
    }

    fn save_staff(&self, staff: &[Staff]) -> Result<()> {
        self.faults.check("staff")?;
        self.inner.save_staff(staff)
    }
}

impl<R: RentalStorage> RentalStorage for Faulty<R> {
    fn load_rentals(&self) -> Result<Vec<Rental>> {
        self.inner.load_rentals()
    }

    fn save_rentals(&self, rentals: &[Rental]) -> Result<()> {
        self.faults.check("rentals")?;
        self.inner.save_rentals(rentals)
    }
}

/// A [`StoreConnection`] whose repositories fail saves on demand
#[derive(Debug, Clone)]
pub struct FaultyConnection {
    inner: StoreConnection,
    pub faults: FaultSwitch,
}

impl FaultyConnection {
    pub fn new(inner: StoreConnection) -> Self {
        Self {
            inner,
            faults: FaultSwitch::default(),
        }
    }

    fn wrap<R>(&self, inner: R) -> Faulty<R> {
        Faulty {
            inner,
            faults: self.faults.clone(),
        }
    }
}

impl Connection for FaultyConnection {
    type VehicleRepository = Faulty<<StoreConnection as Connection>::VehicleRepository>;
    type ClientRepository = Faulty<<StoreConnection as Connection>::ClientRepository>;
    type StaffRepository = Faulty<<StoreConnection as Connection>::StaffRepository>;
    type RentalRepository = Faulty<<StoreConnection as Connection>::RentalRepository>;
    type PhotoRepository = PhotoRepository;
    type StaffIdSequence = SequenceRepository;
    type ConfigRepository = ConfigRepository;

    fn create_vehicle_repository(&self) -> Self::VehicleRepository {
        self.wrap(self.inner.create_vehicle_repository())
    }

    fn create_client_repository(&self) -> Self::ClientRepository {
        self.wrap(self.inner.create_client_repository())
    }

    fn create_staff_repository(&self) -> Self::StaffRepository {
        self.wrap(self.inner.create_staff_repository())
    }

    fn create_rental_repository(&self) -> Self::RentalRepository {
        self.wrap(self.inner.create_rental_repository())
    }

    fn create_photo_repository(&self) -> Self::PhotoRepository {
        self.inner.create_photo_repository()
    }

    fn create_staff_id_sequence(&self) -> Self::StaffIdSequence {
        self.inner.create_staff_id_sequence()
    }

    fn create_config_repository(&self) -> Self::ConfigRepository {
        self.inner.create_config_repository()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(5));
        assert_eq!(clock.now(), start + Duration::hours(5));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
