//! Rental ledger service.
//!
//! The ledger is the list of every rental the agency has approved, active or
//! returned. Starting a rental touches three collections (rentals, clients,
//! vehicles) that storage cannot write atomically, so both start and finish run
//! as a sequence of steps where each later failure undoes the earlier ones:
//!
//! start:  append rental -> debit client -> bump vehicle counter
//! finish: charge penalty -> mark rental returned
//!
//! If an undo step itself fails the ledger logs the inconsistency at error
//! level and still reports the original failure to the caller.

use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info, warn};

use shared::{Rental, Vehicle};

use crate::domain::billing::BillingPolicy;
use crate::domain::client_directory::ClientDirectory;
use crate::domain::clock::Clock;
use crate::domain::commands::rentals::StartRentalCommand;
use crate::domain::error::{RentalError, RentalResult};
use crate::domain::vehicle_catalog::VehicleCatalog;
use crate::storage::{Connection, RentalStorage};

const RENTALS: &str = "rentals";

pub struct RentalLedger<C: Connection> {
    rental_repository: C::RentalRepository,
    clock: Arc<dyn Clock>,
    policy: BillingPolicy,
    rentals: Vec<Rental>,
}

impl<C: Connection> RentalLedger<C> {
    pub fn new(connection: Arc<C>, clock: Arc<dyn Clock>, policy: BillingPolicy) -> RentalResult<Self> {
        let rental_repository = connection.create_rental_repository();
        let rentals = rental_repository
            .load_rentals()
            .map_err(|e| RentalError::persistence(RENTALS, e))?;
        info!(
            "Rental ledger loaded with {} records ({} active)",
            rentals.len(),
            rentals.iter().filter(|r| r.is_active()).count()
        );

        Ok(Self {
            rental_repository,
            clock,
            policy,
            rentals,
        })
    }

    pub fn policy(&self) -> BillingPolicy {
        self.policy
    }

    /// Storage is the source of truth; every query starts here
    fn reload(&mut self) -> RentalResult<()> {
        self.rentals = self
            .rental_repository
            .load_rentals()
            .map_err(|e| RentalError::persistence(RENTALS, e))?;
        Ok(())
    }

    /// Up-front price of renting `vehicle` for `days` days
    pub fn quote(&self, vehicle: &Vehicle, days: i64) -> RentalResult<f64> {
        if days < 1 {
            return Err(RentalError::InvalidInput(format!(
                "a rental lasts at least one day, got {}",
                days
            )));
        }
        Ok(self.policy.quote(vehicle.daily_rate, days))
    }

    pub fn start_rental(
        &mut self,
        catalog: &mut VehicleCatalog<C>,
        directory: &mut ClientDirectory<C>,
        command: StartRentalCommand,
    ) -> RentalResult<Rental> {
        if command.days < 1 {
            return Err(RentalError::InvalidInput(format!(
                "a rental lasts at least one day, got {}",
                command.days
            )));
        }
        if !command.expected_total.is_finite() || command.expected_total < 0.0 {
            return Err(RentalError::InvalidInput(format!(
                "rental total must be a non-negative amount, got {}",
                command.expected_total
            )));
        }

        let vehicle = catalog
            .find(&command.plate)
            .cloned()
            .ok_or_else(|| RentalError::not_found("vehicle", command.plate.as_str()))?;
        let client = directory
            .find_client(&command.tax_id)
            .cloned()
            .ok_or_else(|| RentalError::not_found("client", command.tax_id.as_str()))?;

        if catalog.is_rented(&vehicle.plate)? {
            warn!("Vehicle {} is already rented", vehicle.plate);
            return Err(RentalError::VehicleUnavailable {
                plate: vehicle.plate,
            });
        }

        let total = command.expected_total;
        if client.balance < total {
            return Err(RentalError::InsufficientBalance {
                balance: client.balance,
                required: total,
            });
        }

        let quoted = self.policy.quote(vehicle.daily_rate, command.days);
        if (quoted - total).abs() > 0.005 {
            warn!(
                "Charging {:.2} for vehicle {} although the quote for {} days is {:.2}",
                total, vehicle.plate, command.days, quoted
            );
        }

        self.reload()?;
        let start = self.clock.now();
        let planned_return = Duration::try_days(command.days)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or_else(|| {
                RentalError::InvalidInput(format!("{} days is too long a rental", command.days))
            })?;

        let rental = Rental {
            id: Rental::generate_id(&vehicle.plate, &start),
            vehicle: vehicle.clone(),
            client: client.summary(),
            start,
            planned_return,
            actual_return: None,
            total,
        };

        self.rentals.push(rental.clone());
        if let Err(e) = self.rental_repository.save_rentals(&self.rentals) {
            self.rentals.pop();
            return Err(RentalError::persistence(RENTALS, e));
        }

        if let Err(e) = directory.debit(&client.tax_id, total) {
            warn!("Debit for rental {} failed, removing it: {}", rental.id, e);
            self.discard(&rental);
            return Err(e);
        }

        if let Err(e) = catalog.record_rental(&vehicle.plate) {
            warn!("Counter update for rental {} failed, undoing it: {}", rental.id, e);
            if let Err(refund) = directory.credit(&client.tax_id, total) {
                error!(
                    "Could not refund {:.2} to client {} after failed rental {}: {}",
                    total, client.tax_id, rental.id, refund
                );
            }
            self.discard(&rental);
            return Err(e);
        }

        info!(
            "Started rental {} for client {} ({} days, {:.2})",
            rental.id, client.tax_id, command.days, total
        );
        Ok(rental)
    }

    /// Drop a half-started rental from memory and storage
    fn discard(&mut self, rental: &Rental) {
        self.rentals.retain(|r| !r.matches(rental));
        if let Err(e) = self.rental_repository.save_rentals(&self.rentals) {
            error!(
                "Rental {} could not be removed from the ledger and is orphaned: {:#}",
                rental.id, e
            );
        }
    }

    /// Close an active rental: bill it, charge any late penalty and record
    /// the return time. Returns the updated record.
    pub fn finish_rental(
        &mut self,
        directory: &mut ClientDirectory<C>,
        rental: &Rental,
    ) -> RentalResult<Rental> {
        if !rental.is_active() {
            return Err(RentalError::InvalidRentalState {
                rental_id: rental.id.clone(),
            });
        }

        self.reload()?;
        let index = self
            .rentals
            .iter()
            .position(|r| r.matches(rental))
            .ok_or_else(|| RentalError::not_found("rental", rental.id.as_str()))?;
        let stored = self.rentals[index].clone();
        if !stored.is_active() {
            return Err(RentalError::InvalidRentalState {
                rental_id: stored.id,
            });
        }

        let returned_at = self.clock.now().max(stored.start);
        let bill = self.policy.bill(
            stored.vehicle.daily_rate,
            stored.start,
            stored.planned_return,
            returned_at,
        );

        if bill.penalty > 0.0 {
            info!(
                "Rental {} is {} hours late, charging a penalty of {:.2}",
                stored.id, bill.late_hours, bill.penalty
            );
            directory.charge(&stored.client.tax_id, bill.penalty)?;
        }

        self.rentals[index].actual_return = Some(returned_at);
        self.rentals[index].total = bill.total;
        if let Err(e) = self.rental_repository.save_rentals(&self.rentals) {
            self.rentals[index] = stored.clone();
            if bill.penalty > 0.0 {
                if let Err(refund) = directory.credit(&stored.client.tax_id, bill.penalty) {
                    error!(
                        "Could not refund penalty {:.2} to client {} for rental {}: {}",
                        bill.penalty, stored.client.tax_id, stored.id, refund
                    );
                }
            }
            return Err(RentalError::persistence(RENTALS, e));
        }

        let finished = self.rentals[index].clone();
        info!(
            "Finished rental {}: {} days, penalty {:.2}, total {:.2}",
            finished.id, bill.billable_days, bill.penalty, finished.total
        );
        Ok(finished)
    }

    /// First unreturned rental of the vehicle, read from storage
    pub fn find_active_rental(&mut self, plate: &str) -> RentalResult<Option<Rental>> {
        self.reload()?;
        Ok(self
            .rentals
            .iter()
            .find(|r| r.vehicle.plate == plate && r.is_active())
            .cloned())
    }

    pub fn all_rentals(&mut self) -> RentalResult<Vec<Rental>> {
        self.reload()?;
        Ok(self.rentals.clone())
    }

    pub fn active_rentals(&mut self) -> RentalResult<Vec<Rental>> {
        self.select(|r| r.is_active())
    }

    pub fn rentals_for_client(&mut self, tax_id: &str) -> RentalResult<Vec<Rental>> {
        self.select(|r| r.client.tax_id == tax_id)
    }

    /// Active rentals whose planned return has already passed
    pub fn overdue_rentals(&mut self) -> RentalResult<Vec<Rental>> {
        let now = self.clock.now();
        self.select(|r| r.is_active() && r.planned_return < now)
    }

    pub fn history_for_vehicle(&mut self, plate: &str) -> RentalResult<Vec<Rental>> {
        let mut history = self.select(|r| r.vehicle.plate == plate)?;
        history.sort_by_key(|r| r.start);
        Ok(history)
    }

    fn select(&mut self, predicate: impl Fn(&Rental) -> bool) -> RentalResult<Vec<Rental>> {
        self.reload()?;
        Ok(self.rentals.iter().filter(|r| predicate(r)).cloned().collect())
    }
}
