//! Shared identifier types used across the transport order crates.

pub mod types;

pub use types::{DealId, OrderId, VehicleId};
