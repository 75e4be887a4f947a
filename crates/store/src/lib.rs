//! Storage layer for the order fulfillment engine.
//!
//! The [`Store`] trait draws the unit-of-work boundaries: its compound
//! `commit_*` methods either apply every mutation they name or none of
//! them. Two implementations are provided: [`InMemoryStore`] for tests and
//! the demo server, and [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CheckoutCommit, StockAdjustment, StockDebit, Store};
