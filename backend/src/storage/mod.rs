//! # Storage Module
//!
//! Handles all data persistence for the rental agency.
//!
//! The domain layer only sees the traits in [`traits`]: each entity collection
//! has an opaque load/save pair, plus small seams for photos, ID sequences and
//! agency settings. The YAML implementation in [`yaml`] keeps every collection
//! in its own file inside a single data directory.
//!
//! Nothing here offers atomicity across collections. Keeping vehicles, clients
//! and the rental ledger consistent with each other is the job of the domain
//! services.

pub mod traits;
pub mod yaml;

#[cfg(test)]
pub mod test_utils;

pub use traits::*;
pub use yaml::{AgencyConfig, StoreConnection};
