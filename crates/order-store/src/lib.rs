//! Transactional persistence of transport orders.
//!
//! Provides the [`OrderStore`] trait with a PostgreSQL implementation for
//! production and an in-memory implementation for tests.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryTransaction};
pub use order::{INITIAL_STATUS, NewOrder, OrderPatch, OrderRecord, PatchValue};
pub use postgres::{PostgresOrderStore, PostgresTransaction};
pub use store::{OrderStore, OrderTransaction};
