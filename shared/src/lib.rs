use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rentable vehicle. The plate is the primary key across every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Registration plate (case-sensitive, unique in the catalog)
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    /// Price charged per billable day
    pub daily_rate: f64,
    /// Number of times this vehicle has been rented
    #[serde(default)]
    pub rental_count: u32,
    #[serde(default)]
    pub photo_path: Option<String>,
    /// Variant-specific attributes
    pub kind: VehicleKind,
}

impl Vehicle {
    /// Name shown in listings and matched by the catalog's name filter
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.kind.vehicle_type()
    }
}

/// Variant-specific vehicle data, tagged by `type` on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VehicleKind {
    Car {
        doors: u8,
        spoiler: bool,
    },
    Motorcycle {
        /// Engine displacement in cubic centimetres
        engine_cc: u32,
        cargo_rack: bool,
        /// Tire radius in inches
        tire_radius: f64,
    },
    Truck {
        max_load_kg: f64,
        height_m: f64,
        width_m: f64,
        length_m: f64,
        trailer: TrailerType,
    },
}

impl VehicleKind {
    pub fn vehicle_type(&self) -> VehicleType {
        match self {
            VehicleKind::Car { .. } => VehicleType::Car,
            VehicleKind::Motorcycle { .. } => VehicleType::Motorcycle,
            VehicleKind::Truck { .. } => VehicleType::Truck,
        }
    }
}

/// Explicit type tag used for filtering and per-variant storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    Motorcycle,
    Truck,
}

impl VehicleType {
    pub const ALL: [VehicleType; 3] = [VehicleType::Car, VehicleType::Motorcycle, VehicleType::Truck];
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleType::Car => write!(f, "Car"),
            VehicleType::Motorcycle => write!(f, "Motorcycle"),
            VehicleType::Truck => write!(f, "Truck"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailerType {
    None,
    Flatbed,
    Box,
    Refrigerated,
    Tanker,
}

/// Postal address attached to clients and staff
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// A customer of the agency, keyed by tax ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub tax_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub photo_path: Option<String>,
    /// Available funds; penalties may push this below zero
    pub balance: f64,
    /// Hex-encoded one-way hash of the password
    pub password_hash: String,
}

impl Client {
    pub fn summary(&self) -> ClientSummary {
        ClientSummary {
            tax_id: self.tax_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// An employee account. IDs come from the staff ID sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub photo_path: Option<String>,
    pub password_hash: String,
}

/// The identity returned by a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Identity {
    Client(Client),
    Staff(Staff),
}

/// Client fields copied into a rental record at the time it was approved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub tax_id: String,
    pub name: String,
    pub email: String,
}

/// One rental transaction. Active while `actual_return` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    /// Format: "rental::<plate>::<start_epoch_millis>"
    pub id: String,
    /// Snapshot of the vehicle when the rental started
    pub vehicle: Vehicle,
    pub client: ClientSummary,
    pub start: DateTime<Utc>,
    pub planned_return: DateTime<Utc>,
    #[serde(default)]
    pub actual_return: Option<DateTime<Utc>>,
    /// Amount charged so far (prepaid total, then the final bill on return)
    pub total: f64,
}

impl Rental {
    pub fn generate_id(plate: &str, start: &DateTime<Utc>) -> String {
        format!("rental::{}::{}", plate, start.timestamp_millis())
    }

    pub fn is_active(&self) -> bool {
        self.actual_return.is_none()
    }

    /// Ledger records are matched by plate and original start time
    pub fn matches(&self, other: &Rental) -> bool {
        self.vehicle.plate == other.vehicle.plate && self.start == other.start
    }
}

/// Availability criterion for catalog filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    /// No active rental
    Available,
    /// Active rental due back within the configured window
    NearingReturn,
    #[default]
    All,
}

/// Catalog search criteria. Every field is optional and they combine with AND.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleFilter {
    /// Case-insensitive substring of "brand model"
    pub name: Option<String>,
    /// Maximum daily rate (inclusive)
    pub max_price: Option<f64>,
    pub color: Option<String>,
    pub availability: Option<Availability>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub vehicle_type: Option<VehicleType>,
}
