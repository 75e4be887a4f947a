//! Checkout and order workflow services.
//!
//! The [`CheckoutCoordinator`] turns a cart into an order atomically,
//! retrying on stock contention. The [`OrderWorkflowService`] drives the
//! post-purchase status machine with role checks and an audit trail, and
//! the [`StockService`] exposes the privileged manual stock adjustments.

pub mod catalog;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod workflow;

pub use catalog::{Catalog, InMemoryCatalog};
pub use checkout::{CheckoutCoordinator, CheckoutRequest};
pub use error::{CheckoutError, InventoryError, WorkflowError};
pub use inventory::StockService;
pub use workflow::OrderWorkflowService;
