//! # YAML Vehicle Repository
//!
//! The catalog is split into one file per vehicle variant (`cars.yaml`,
//! `motorcycles.yaml`, `trucks.yaml`). Loading concatenates the three files in
//! that order; saving partitions the catalog by type tag.

use anyhow::Result;
use tracing::{info, warn};

use shared::{Vehicle, VehicleType};

use super::collection_file::{load_collection, save_collections_together, stage_collection};
use super::connection::StoreConnection;
use crate::storage::traits::VehicleStorage;

/// Collection name holding vehicles of the given type
pub fn collection_for(vehicle_type: VehicleType) -> &'static str {
    match vehicle_type {
        VehicleType::Car => "cars",
        VehicleType::Motorcycle => "motorcycles",
        VehicleType::Truck => "trucks",
    }
}

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    connection: StoreConnection,
}

impl VehicleRepository {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }

    fn load_variant(&self, vehicle_type: VehicleType) -> Result<Vec<Vehicle>> {
        let path = self.connection.collection_path(collection_for(vehicle_type));
        let mut vehicles: Vec<Vehicle> = load_collection(&path)?;

        let before = vehicles.len();
        vehicles.retain(|vehicle| vehicle.vehicle_type() == vehicle_type);
        if vehicles.len() < before {
            warn!(
                "Skipped {} records in {:?} that are not of type {}",
                before - vehicles.len(),
                path,
                vehicle_type
            );
        }

        Ok(vehicles)
    }
}

impl VehicleStorage for VehicleRepository {
    fn load_vehicles(&self) -> Result<Vec<Vehicle>> {
        let mut vehicles = Vec::new();
        for vehicle_type in VehicleType::ALL {
            vehicles.extend(self.load_variant(vehicle_type)?);
        }
        Ok(vehicles)
    }

    /// All three variant files are replaced, or none of them is
    fn save_vehicles(&self, vehicles: &[Vehicle]) -> Result<()> {
        let staged = VehicleType::ALL
            .iter()
            .map(|&vehicle_type| {
                let variant: Vec<&Vehicle> = vehicles
                    .iter()
                    .filter(|vehicle| vehicle.vehicle_type() == vehicle_type)
                    .collect();
                let path = self.connection.collection_path(collection_for(vehicle_type));
                stage_collection(&path, &variant)
            })
            .collect();
        save_collections_together(staged)?;

        info!("Saved vehicle catalog with {} vehicles", vehicles.len());
        Ok(())
    }
}
