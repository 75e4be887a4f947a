use common::{CartId, OrderId, StockUnitId};
use domain::{OrderStatus, Version};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced cart does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The referenced order does not exist (or has been retired).
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The referenced stock unit does not exist.
    #[error("Stock unit not found: {0}")]
    StockUnitNotFound(StockUnitId),

    /// A debit or adjustment would take the quantity below zero.
    #[error(
        "Insufficient stock for unit {stock_unit_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        stock_unit_id: StockUnitId,
        requested: u32,
        available: u32,
    },

    /// The stock unit's version token no longer matches the one observed
    /// at read time. The caller must reread and retry; nothing was applied.
    #[error(
        "Version conflict for stock unit {stock_unit_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        stock_unit_id: StockUnitId,
        expected: Version,
        actual: Version,
    },

    /// The order's stored status no longer matches the status the
    /// transition was validated against.
    #[error("Stale order {order_id}: expected status {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
