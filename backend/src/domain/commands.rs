//! Domain-level command types.
//! Callers build these from whatever surface they expose; the services only
//! ever see these structs.

pub mod rentals {
    /// Input for approving a new rental.
    #[derive(Debug, Clone)]
    pub struct StartRentalCommand {
        pub tax_id: String,
        pub plate: String,
        /// Number of days the client asked for (at least one)
        pub days: i64,
        /// Amount charged up front, normally the quote shown to the client
        pub expected_total: f64,
    }
}

pub mod accounts {
    use shared::Address;
    use std::path::PathBuf;

    /// Input for registering a new client.
    #[derive(Debug, Clone)]
    pub struct RegisterClientCommand {
        pub tax_id: String,
        pub name: String,
        pub email: String,
        /// Plain-text password; only its hash is stored
        pub password: String,
        pub phone: String,
        pub address: Address,
        pub photo: Option<PathBuf>,
        pub initial_balance: f64,
    }

    /// Input for registering a new staff member.
    #[derive(Debug, Clone)]
    pub struct RegisterStaffCommand {
        pub name: String,
        pub email: String,
        pub password: String,
        pub phone: String,
        pub address: Address,
        pub photo: Option<PathBuf>,
    }
}
