//! Client and staff accounts.
//!
//! Handles login, registration with uniqueness checks, profile edits and the
//! balance helpers the rental ledger uses to charge and refund clients. Every
//! mutation is written through to storage immediately; if the write fails the
//! in-memory records are put back the way they were.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::{Client, Identity, Staff};

use crate::domain::commands::accounts::{RegisterClientCommand, RegisterStaffCommand};
use crate::domain::credentials::CredentialHasher;
use crate::domain::error::{RentalError, RentalResult};
use crate::storage::{ClientStorage, Connection, IdSequence, PhotoOwner, PhotoStorage, StaffStorage};

const CLIENTS: &str = "clients";
const STAFF: &str = "staff";

pub struct ClientDirectory<C: Connection> {
    client_repository: C::ClientRepository,
    staff_repository: C::StaffRepository,
    photo_repository: C::PhotoRepository,
    staff_ids: Box<dyn IdSequence>,
    hasher: Arc<dyn CredentialHasher>,
    clients: Vec<Client>,
    staff: Vec<Staff>,
}

impl<C: Connection> ClientDirectory<C> {
    /// Directory whose staff IDs come from the connection's persisted sequence
    pub fn new(connection: Arc<C>, hasher: Arc<dyn CredentialHasher>) -> RentalResult<Self> {
        let staff_ids = Box::new(connection.create_staff_id_sequence());
        Self::with_id_sequence(connection, hasher, staff_ids)
    }

    pub fn with_id_sequence(
        connection: Arc<C>,
        hasher: Arc<dyn CredentialHasher>,
        staff_ids: Box<dyn IdSequence>,
    ) -> RentalResult<Self> {
        let client_repository = connection.create_client_repository();
        let staff_repository = connection.create_staff_repository();

        let clients = client_repository
            .load_clients()
            .map_err(|e| RentalError::persistence(CLIENTS, e))?;
        let staff = staff_repository
            .load_staff()
            .map_err(|e| RentalError::persistence(STAFF, e))?;
        info!(
            "Client directory loaded with {} clients and {} staff",
            clients.len(),
            staff.len()
        );

        Ok(Self {
            client_repository,
            staff_repository,
            photo_repository: connection.create_photo_repository(),
            staff_ids,
            hasher,
            clients,
            staff,
        })
    }

    /// Check the password against clients first, then staff
    pub fn authenticate(&self, email: &str, password: &str) -> RentalResult<Identity> {
        let hash = self.hasher.hash(password);

        if let Some(client) = self
            .clients
            .iter()
            .find(|c| c.email == email && c.password_hash == hash)
        {
            info!("Client {} logged in", client.tax_id);
            return Ok(Identity::Client(client.clone()));
        }

        if let Some(member) = self
            .staff
            .iter()
            .find(|s| s.email == email && s.password_hash == hash)
        {
            info!("Staff member {} logged in", member.id);
            return Ok(Identity::Staff(member.clone()));
        }

        warn!("Failed login attempt for {}", email);
        Err(RentalError::InvalidCredentials)
    }

    fn email_taken(&self, email: &str) -> bool {
        self.clients.iter().any(|c| c.email == email) || self.staff.iter().any(|s| s.email == email)
    }

    fn store_photo(
        &self,
        photo: Option<&Path>,
        owner: PhotoOwner,
        identity_key: &str,
    ) -> RentalResult<Option<String>> {
        match photo {
            Some(source) => {
                let stored = self
                    .photo_repository
                    .store_photo(source, owner, identity_key)
                    .map_err(|e| RentalError::persistence("photos", e))?;
                Ok(Some(stored.to_string_lossy().into_owned()))
            }
            None => Ok(None),
        }
    }

    pub fn register(&mut self, command: RegisterClientCommand) -> RentalResult<Client> {
        if command.tax_id.trim().is_empty() || command.email.trim().is_empty() {
            return Err(RentalError::InvalidInput(
                "tax ID and email are required".to_string(),
            ));
        }
        if !command.initial_balance.is_finite() {
            return Err(RentalError::InvalidInput(
                "initial balance must be a finite amount".to_string(),
            ));
        }
        if self.email_taken(&command.email) {
            return Err(RentalError::AlreadyExists {
                field: "email",
                value: command.email,
            });
        }
        if self.find_client(&command.tax_id).is_some() {
            return Err(RentalError::AlreadyExists {
                field: "tax ID",
                value: command.tax_id,
            });
        }

        let photo_path = self.store_photo(command.photo.as_deref(), PhotoOwner::Client, &command.tax_id)?;
        let client = Client {
            password_hash: self.hasher.hash(&command.password),
            tax_id: command.tax_id,
            name: command.name,
            email: command.email,
            phone: command.phone,
            address: command.address,
            photo_path,
            balance: command.initial_balance,
        };

        self.clients.push(client.clone());
        if let Err(e) = self.client_repository.save_clients(&self.clients) {
            self.clients.pop();
            return Err(RentalError::persistence(CLIENTS, e));
        }

        info!("Registered client {} ({} clients)", client.tax_id, self.clients.len());
        Ok(client)
    }

    pub fn register_staff(&mut self, command: RegisterStaffCommand) -> RentalResult<Staff> {
        if command.email.trim().is_empty() {
            return Err(RentalError::InvalidInput("email is required".to_string()));
        }
        if self.email_taken(&command.email) {
            return Err(RentalError::AlreadyExists {
                field: "email",
                value: command.email,
            });
        }

        let id = self
            .staff_ids
            .next_id()
            .map_err(|e| RentalError::persistence("sequences", e))?;
        let photo_path = self.store_photo(command.photo.as_deref(), PhotoOwner::Staff, &id.to_string())?;
        let member = Staff {
            id,
            password_hash: self.hasher.hash(&command.password),
            name: command.name,
            email: command.email,
            phone: command.phone,
            address: command.address,
            photo_path,
        };

        self.staff.push(member.clone());
        if let Err(e) = self.staff_repository.save_staff(&self.staff) {
            self.staff.pop();
            return Err(RentalError::persistence(STAFF, e));
        }

        info!("Registered staff member {}", id);
        Ok(member)
    }

    /// Replace the client with the same tax ID
    pub fn update(&mut self, client: Client) -> RentalResult<()> {
        let index = self
            .clients
            .iter()
            .position(|c| c.tax_id == client.tax_id)
            .ok_or_else(|| RentalError::not_found("client", client.tax_id.as_str()))?;
        if self
            .clients
            .iter()
            .any(|c| c.tax_id != client.tax_id && c.email == client.email)
            || self.staff.iter().any(|s| s.email == client.email)
        {
            return Err(RentalError::AlreadyExists {
                field: "email",
                value: client.email,
            });
        }

        let snapshot = self.clients.clone();
        let tax_id = client.tax_id.clone();
        self.clients.remove(index);
        self.clients.push(client);
        self.commit_clients(snapshot)?;

        info!("Updated client {}", tax_id);
        Ok(())
    }

    pub fn update_staff(&mut self, member: Staff) -> RentalResult<()> {
        let index = self
            .staff
            .iter()
            .position(|s| s.id == member.id)
            .ok_or_else(|| RentalError::not_found("staff", member.id.to_string()))?;

        let snapshot = self.staff.clone();
        let id = member.id;
        self.staff.remove(index);
        self.staff.push(member);
        if let Err(e) = self.staff_repository.save_staff(&self.staff) {
            self.staff = snapshot;
            return Err(RentalError::persistence(STAFF, e));
        }

        info!("Updated staff member {}", id);
        Ok(())
    }

    fn commit_clients(&mut self, snapshot: Vec<Client>) -> RentalResult<()> {
        if let Err(e) = self.client_repository.save_clients(&self.clients) {
            warn!("Saving clients failed, restoring previous state: {:#}", e);
            self.clients = snapshot;
            return Err(RentalError::persistence(CLIENTS, e));
        }
        Ok(())
    }

    fn check_amount(amount: f64) -> RentalResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(RentalError::InvalidInput(format!(
                "amount must be a non-negative number, got {}",
                amount
            )));
        }
        Ok(())
    }

    fn apply_balance_change(&mut self, tax_id: &str, delta: f64) -> RentalResult<f64> {
        let index = self
            .clients
            .iter()
            .position(|c| c.tax_id == tax_id)
            .ok_or_else(|| RentalError::not_found("client", tax_id))?;

        let snapshot = self.clients.clone();
        self.clients[index].balance += delta;
        let balance = self.clients[index].balance;
        self.commit_clients(snapshot)?;

        debug!("Balance of client {} changed by {:.2} to {:.2}", tax_id, delta, balance);
        Ok(balance)
    }

    /// Take `amount` from the client; fails if the balance does not cover it
    pub fn debit(&mut self, tax_id: &str, amount: f64) -> RentalResult<f64> {
        Self::check_amount(amount)?;
        let balance = self.balance(tax_id)?;
        if balance < amount {
            return Err(RentalError::InsufficientBalance {
                balance,
                required: amount,
            });
        }
        self.apply_balance_change(tax_id, -amount)
    }

    /// Take `amount` from the client even if that leaves the balance negative.
    /// Used for late-return penalties.
    pub fn charge(&mut self, tax_id: &str, amount: f64) -> RentalResult<f64> {
        Self::check_amount(amount)?;
        let balance = self.apply_balance_change(tax_id, -amount)?;
        if balance < 0.0 {
            warn!("Client {} balance is now negative ({:.2})", tax_id, balance);
        }
        Ok(balance)
    }

    pub fn credit(&mut self, tax_id: &str, amount: f64) -> RentalResult<f64> {
        Self::check_amount(amount)?;
        self.apply_balance_change(tax_id, amount)
    }

    pub fn balance(&self, tax_id: &str) -> RentalResult<f64> {
        self.find_client(tax_id)
            .map(|c| c.balance)
            .ok_or_else(|| RentalError::not_found("client", tax_id))
    }

    pub fn find_client(&self, tax_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.tax_id == tax_id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<Identity> {
        if let Some(client) = self.clients.iter().find(|c| c.email == email) {
            return Some(Identity::Client(client.clone()));
        }
        self.staff
            .iter()
            .find(|s| s.email == email)
            .map(|s| Identity::Staff(s.clone()))
    }

    pub fn list_clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn list_staff(&self) -> &[Staff] {
        &self.staff
    }
}
