//! Vehicle catalog service.
//!
//! Owns the in-memory list of every rentable vehicle and persists it through
//! [`VehicleStorage`] after each mutation. Availability questions are answered
//! from the rental ledger in storage, never from a cached copy.

use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::{Availability, Rental, Vehicle, VehicleFilter};

use crate::domain::clock::Clock;
use crate::domain::error::{RentalError, RentalResult};
use crate::storage::{Connection, PhotoOwner, PhotoStorage, RentalStorage, VehicleStorage};

const VEHICLES: &str = "vehicles";
const RENTALS: &str = "rentals";

pub struct VehicleCatalog<C: Connection> {
    vehicle_repository: C::VehicleRepository,
    rental_repository: C::RentalRepository,
    photo_repository: C::PhotoRepository,
    clock: Arc<dyn Clock>,
    nearing_return_days: i64,
    vehicles: Vec<Vehicle>,
}

impl<C: Connection> VehicleCatalog<C> {
    pub fn new(connection: Arc<C>, clock: Arc<dyn Clock>, nearing_return_days: i64) -> RentalResult<Self> {
        let vehicle_repository = connection.create_vehicle_repository();
        let vehicles = vehicle_repository
            .load_vehicles()
            .map_err(|e| RentalError::persistence(VEHICLES, e))?;
        info!("Vehicle catalog loaded with {} vehicles", vehicles.len());

        Ok(Self {
            vehicle_repository,
            rental_repository: connection.create_rental_repository(),
            photo_repository: connection.create_photo_repository(),
            clock,
            nearing_return_days: nearing_return_days.max(0),
            vehicles,
        })
    }

    /// Drop the in-memory list and read it again from storage
    pub fn reload(&mut self) -> RentalResult<()> {
        self.vehicles = self
            .vehicle_repository
            .load_vehicles()
            .map_err(|e| RentalError::persistence(VEHICLES, e))?;
        Ok(())
    }

    pub fn list(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn find(&self, plate: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.plate == plate)
    }

    fn position(&self, plate: &str) -> RentalResult<usize> {
        self.vehicles
            .iter()
            .position(|v| v.plate == plate)
            .ok_or_else(|| RentalError::not_found("vehicle", plate))
    }

    /// Save the current list, putting `snapshot` back if the write fails
    fn commit(&mut self, snapshot: Vec<Vehicle>) -> RentalResult<()> {
        if let Err(e) = self.vehicle_repository.save_vehicles(&self.vehicles) {
            warn!("Saving vehicle catalog failed, restoring previous state: {:#}", e);
            self.vehicles = snapshot;
            return Err(RentalError::persistence(VEHICLES, e));
        }
        Ok(())
    }

    pub fn register(&mut self, mut vehicle: Vehicle) -> RentalResult<()> {
        if vehicle.plate.trim().is_empty() {
            return Err(RentalError::InvalidInput("plate must not be empty".to_string()));
        }
        if !vehicle.daily_rate.is_finite() || vehicle.daily_rate <= 0.0 {
            return Err(RentalError::InvalidInput(format!(
                "daily rate must be positive, got {}",
                vehicle.daily_rate
            )));
        }
        if self.find(&vehicle.plate).is_some() {
            warn!("Rejected duplicate plate {}", vehicle.plate);
            return Err(RentalError::DuplicatePlate {
                plate: vehicle.plate,
            });
        }

        vehicle.rental_count = 0;
        let snapshot = self.vehicles.clone();
        let plate = vehicle.plate.clone();
        self.vehicles.push(vehicle);
        self.commit(snapshot)?;

        info!("Registered vehicle {} ({} in catalog)", plate, self.vehicles.len());
        Ok(())
    }

    /// Replace the stored attributes of the vehicle with the same plate.
    /// The rental counter always comes from the stored record.
    pub fn update(&mut self, mut vehicle: Vehicle) -> RentalResult<()> {
        let index = self.position(&vehicle.plate)?;
        if !vehicle.daily_rate.is_finite() || vehicle.daily_rate <= 0.0 {
            return Err(RentalError::InvalidInput(format!(
                "daily rate must be positive, got {}",
                vehicle.daily_rate
            )));
        }

        vehicle.rental_count = self.vehicles[index].rental_count;
        let snapshot = self.vehicles.clone();
        let plate = vehicle.plate.clone();
        self.vehicles[index] = vehicle;
        self.commit(snapshot)?;

        info!("Updated vehicle {}", plate);
        Ok(())
    }

    pub fn delete(&mut self, plate: &str) -> RentalResult<Vehicle> {
        let index = self.position(plate)?;
        if self.is_rented(plate)? {
            warn!("Refusing to delete vehicle {} while it is rented", plate);
            return Err(RentalError::VehicleUnavailable {
                plate: plate.to_string(),
            });
        }

        let snapshot = self.vehicles.clone();
        let removed = self.vehicles.remove(index);
        self.commit(snapshot)?;

        info!("Deleted vehicle {}", plate);
        Ok(removed)
    }

    /// Copy a photo into the data directory and attach it to the vehicle
    pub fn attach_photo(&mut self, plate: &str, source: &Path) -> RentalResult<String> {
        let index = self.position(plate)?;
        let stored = self
            .photo_repository
            .store_photo(source, PhotoOwner::Vehicle, plate)
            .map_err(|e| RentalError::persistence("photos", e))?;
        let stored = stored.to_string_lossy().into_owned();

        let snapshot = self.vehicles.clone();
        self.vehicles[index].photo_path = Some(stored.clone());
        self.commit(snapshot)?;

        debug!("Attached photo {} to vehicle {}", stored, plate);
        Ok(stored)
    }

    /// True when the ledger in storage holds an active rental for `plate`
    pub fn is_rented(&self, plate: &str) -> RentalResult<bool> {
        let active = self
            .rental_repository
            .find_active_rental(plate)
            .map_err(|e| RentalError::persistence(RENTALS, e))?;
        Ok(active.is_some())
    }

    pub fn filter(&self, filter: &VehicleFilter) -> RentalResult<Vec<Vehicle>> {
        let availability = filter.availability.unwrap_or_default();
        let active_rentals: Vec<Rental> = if availability == Availability::All {
            Vec::new()
        } else {
            self.rental_repository
                .load_rentals()
                .map_err(|e| RentalError::persistence(RENTALS, e))?
                .into_iter()
                .filter(Rental::is_active)
                .collect()
        };

        let now = self.clock.now();
        let window_end = Duration::try_days(self.nearing_return_days)
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let name = filter.name.as_ref().map(|n| n.to_lowercase());
        let color = filter.color.as_ref().map(|c| c.to_lowercase());

        let matches: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|v| {
                name.as_ref()
                    .map_or(true, |n| v.display_name().to_lowercase().contains(n.as_str()))
            })
            .filter(|v| filter.max_price.map_or(true, |max| v.daily_rate <= max))
            .filter(|v| color.as_ref().map_or(true, |c| v.color.to_lowercase() == *c))
            .filter(|v| filter.year_min.map_or(true, |min| v.year >= min))
            .filter(|v| filter.year_max.map_or(true, |max| v.year <= max))
            .filter(|v| filter.vehicle_type.map_or(true, |t| v.vehicle_type() == t))
            .filter(|v| {
                let active = active_rentals.iter().find(|r| r.vehicle.plate == v.plate);
                match availability {
                    Availability::All => true,
                    Availability::Available => active.is_none(),
                    Availability::NearingReturn => active.map_or(false, |r| {
                        r.planned_return >= now && r.planned_return <= window_end
                    }),
                }
            })
            .cloned()
            .collect();

        debug!("Filter matched {} of {} vehicles", matches.len(), self.vehicles.len());
        Ok(matches)
    }

    /// Bump the rental counter after a rental was approved
    pub fn record_rental(&mut self, plate: &str) -> RentalResult<u32> {
        let index = self.position(plate)?;
        let snapshot = self.vehicles.clone();
        self.vehicles[index].rental_count += 1;
        let count = self.vehicles[index].rental_count;
        self.commit(snapshot)?;

        debug!("Vehicle {} has now been rented {} times", plate, count);
        Ok(count)
    }

    /// Vehicles ordered by how often they were rented, most popular first
    pub fn most_rented(&self, limit: usize) -> Vec<Vehicle> {
        let mut ranked = self.vehicles.clone();
        ranked.sort_by(|a, b| b.rental_count.cmp(&a.rental_count));
        ranked.truncate(limit);
        ranked
    }
}
