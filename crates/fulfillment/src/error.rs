use common::{CartId, OrderId};
use domain::{ItemRef, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The referenced cart does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The cart (or the selected subset of it) has no lines.
    #[error("Nothing to check out")]
    EmptyCart,

    /// An item in the cart is missing from the catalog, inactive, or
    /// outside its availability window.
    #[error("Item unavailable: {item}")]
    ItemUnavailable { item: ItemRef },

    /// A stock unit cannot cover the requested quantity.
    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: u32,
    },

    /// Every attempt lost the race against concurrent checkouts.
    #[error("Checkout contended: gave up after {attempts} attempts")]
    Contended { attempts: u32 },

    /// The catalog collaborator failed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The order aggregate rejected its inputs.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A storage error occurred.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur in the order workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The referenced order does not exist (or has been retired).
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested status change violates the transition table.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The operation is reserved for staff.
    #[error("Only staff can perform this operation")]
    StaffOnly,

    /// The order belongs to a different customer.
    #[error("Order belongs to another customer")]
    NotYourOrder,

    /// Another writer moved the order's status first.
    #[error("Order {order_id} changed concurrently; it is now {actual}")]
    Conflict {
        order_id: OrderId,
        actual: domain::OrderStatus,
    },

    /// A storage error occurred.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => WorkflowError::OrderNotFound(id),
            StoreError::StatusConflict {
                order_id, actual, ..
            } => WorkflowError::Conflict { order_id, actual },
            other => WorkflowError::Store(other),
        }
    }
}

/// Errors that can occur during manual stock maintenance.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Stock adjustments are reserved for staff.
    #[error("Only staff can adjust stock")]
    StaffOnly,

    /// A storage error occurred (including refused adjustments that would
    /// take the quantity below zero).
    #[error(transparent)]
    Store(#[from] StoreError),
}
