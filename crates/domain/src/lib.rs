//! Pure domain model for the order fulfillment engine.
//!
//! This crate contains no IO: the order status state machine, the order
//! aggregate with frozen line prices, stock units with version tokens,
//! carts, catalog snapshots, actors, and the audit entry records. Storage
//! and orchestration live in the `store` and `fulfillment` crates.

pub mod actor;
pub mod audit;
pub mod cart;
pub mod catalog;
pub mod money;
pub mod order;
pub mod status;
pub mod stock;

pub use actor::{Actor, Role};
pub use audit::{InventoryAction, InventoryAuditEntry, OrderAuditEntry};
pub use cart::{Cart, CartLine};
pub use catalog::{CatalogItem, ItemRef};
pub use money::Money;
pub use order::{Order, OrderError, OrderLine, PayMethod, Recipient};
pub use status::OrderStatus;
pub use stock::{StockUnit, Version};
