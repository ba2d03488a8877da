//! The rental ledger file (`rentals.yaml`), always written as one unit.

use anyhow::Result;
use tracing::info;

use shared::Rental;

use super::collection_file::{load_collection, save_collection};
use super::connection::StoreConnection;
use crate::storage::traits::RentalStorage;

pub const RENTALS_COLLECTION: &str = "rentals";

#[derive(Debug, Clone)]
pub struct RentalRepository {
    connection: StoreConnection,
}

impl RentalRepository {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }
}

impl RentalStorage for RentalRepository {
    fn load_rentals(&self) -> Result<Vec<Rental>> {
        load_collection(&self.connection.collection_path(RENTALS_COLLECTION))
    }

    fn save_rentals(&self, rentals: &[Rental]) -> Result<()> {
        save_collection(&self.connection.collection_path(RENTALS_COLLECTION), rentals)?;
        info!("Saved rental ledger with {} records", rentals.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{sample_car, sample_client, sample_rental, TestEnvironment};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_ledger_round_trip_keeps_keys_and_timestamps() {
        let env = TestEnvironment::new().unwrap();
        let repo = RentalRepository::new(env.connection.clone());

        let base = Utc.with_ymd_and_hms(2025, 5, 10, 8, 30, 15).unwrap() + Duration::milliseconds(123);
        let mut rentals = Vec::new();
        for i in 0..5 {
            let vehicle = sample_car(&format!("CAR-{}", i), "Fiat", 50.0 + i as f64);
            let client = sample_client(&format!("TAX-{}", i), &format!("c{}@example.com", i), 1000.0);
            let start = base + Duration::hours(i);
            let mut rental = sample_rental(&vehicle, &client, start, 3);
            if i % 2 == 0 {
                rental.actual_return = Some(start + Duration::days(3) + Duration::minutes(17));
            }
            rentals.push(rental);
        }

        repo.save_rentals(&rentals).unwrap();
        let mut loaded = repo.load_rentals().unwrap();
        assert_eq!(loaded.len(), rentals.len());

        loaded.sort_by(|a, b| a.vehicle.plate.cmp(&b.vehicle.plate));
        for (original, reloaded) in rentals.iter().zip(loaded.iter()) {
            assert_eq!(original.vehicle.plate, reloaded.vehicle.plate);
            assert_eq!(original.client.tax_id, reloaded.client.tax_id);
            assert_eq!(original.start, reloaded.start);
            assert_eq!(original.planned_return, reloaded.planned_return);
            assert_eq!(original.actual_return, reloaded.actual_return);
        }
    }

    #[test]
    fn test_find_active_rental() {
        let env = TestEnvironment::new().unwrap();
        let repo = RentalRepository::new(env.connection.clone());

        let vehicle = sample_car("CAR-1", "Fiat", 50.0);
        let client = sample_client("TAX-1", "a@example.com", 100.0);
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

        let mut returned = sample_rental(&vehicle, &client, start, 1);
        returned.actual_return = Some(start + Duration::days(1));
        let active = sample_rental(&vehicle, &client, start + Duration::days(2), 2);
        repo.save_rentals(&[returned, active.clone()]).unwrap();

        assert_eq!(repo.find_active_rental("CAR-1").unwrap(), Some(active));
        assert_eq!(repo.find_active_rental("CAR-2").unwrap(), None);
    }
}
