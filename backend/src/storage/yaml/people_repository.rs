//! Client and staff record files (`clients.yaml`, `staff.yaml`).

use anyhow::Result;
use tracing::info;

use shared::{Client, Staff};

use super::collection_file::{load_collection, save_collection};
use super::connection::StoreConnection;
use crate::storage::traits::{ClientStorage, StaffStorage};

pub const CLIENTS_COLLECTION: &str = "clients";
pub const STAFF_COLLECTION: &str = "staff";

#[derive(Debug, Clone)]
pub struct ClientRepository {
    connection: StoreConnection,
}

impl ClientRepository {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }
}

impl ClientStorage for ClientRepository {
    fn load_clients(&self) -> Result<Vec<Client>> {
        load_collection(&self.connection.collection_path(CLIENTS_COLLECTION))
    }

    fn save_clients(&self, clients: &[Client]) -> Result<()> {
        save_collection(&self.connection.collection_path(CLIENTS_COLLECTION), clients)?;
        info!("Saved {} clients", clients.len());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StaffRepository {
    connection: StoreConnection,
}

impl StaffRepository {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }
}

impl StaffStorage for StaffRepository {
    fn load_staff(&self) -> Result<Vec<Staff>> {
        load_collection(&self.connection.collection_path(STAFF_COLLECTION))
    }

    fn save_staff(&self, staff: &[Staff]) -> Result<()> {
        save_collection(&self.connection.collection_path(STAFF_COLLECTION), staff)?;
        info!("Saved {} staff members", staff.len());
        Ok(())
    }
}
