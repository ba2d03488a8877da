use thiserror::Error;

pub type RentalResult<T> = std::result::Result<T, RentalError>;

/// Failures surfaced by the catalog, directory and ledger services.
///
/// Validation variants are returned before anything is mutated.
/// `PersistenceFailure` is returned after an in-memory change was attempted;
/// the service that returns it has already restored its own memory and run any
/// compensating writes it could.
#[derive(Debug, Error)]
pub enum RentalError {
    #[error("a vehicle with plate {plate} is already registered")]
    DuplicatePlate { plate: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("vehicle {plate} has an active rental")]
    VehicleUnavailable { plate: String },

    #[error("insufficient balance: {balance:.2} available, {required:.2} required")]
    InsufficientBalance { balance: f64, required: f64 },

    #[error("rental {rental_id} is not active")]
    InvalidRentalState { rental_id: String },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with {field} {value} already exists")]
    AlreadyExists { field: &'static str, value: String },

    #[error("failed to persist {collection}: {cause:#}")]
    PersistenceFailure {
        collection: &'static str,
        cause: anyhow::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RentalError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        RentalError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn persistence(collection: &'static str, cause: anyhow::Error) -> Self {
        RentalError::PersistenceFailure { collection, cause }
    }
}
