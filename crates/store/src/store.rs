use async_trait::async_trait;
use common::{ActorId, CartId, CustomerId, OrderId, StockUnitId};
use domain::{
    Cart, InventoryAction, InventoryAuditEntry, Order, OrderAuditEntry, StockUnit, Version,
};

use crate::Result;

/// One conditional debit inside a checkout: the quantity read from the
/// cart and the version token observed when the stock unit was read.
#[derive(Debug, Clone)]
pub struct StockDebit {
    pub stock_unit_id: StockUnitId,
    pub quantity: u32,
    pub expected_version: Version,
}

/// Everything the checkout unit of work applies: the debits, the new
/// order, and the cart to clear. The store appends one inventory audit
/// entry per debit, tagged with the order id.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub order: Order,
    pub cart_id: CartId,
    pub debits: Vec<StockDebit>,
    /// The customer, recorded as the actor on the inventory audit entries.
    pub actor_id: Option<ActorId>,
}

/// A privileged manual stock change (restock, correction, write-off).
/// Bypasses the version check but never the audit trail, and never takes
/// the quantity below zero.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub stock_unit_id: StockUnitId,
    pub delta: i64,
    pub action: InventoryAction,
    pub reason: Option<String>,
    pub actor_id: Option<ActorId>,
}

/// Core trait for storage implementations.
///
/// The `commit_*` methods are the unit-of-work boundaries of the system:
/// each applies all of its mutations atomically or none of them. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    // -- Carts (written by the external cart collaborator) --

    /// Inserts or replaces a cart.
    async fn put_cart(&self, cart: Cart) -> Result<()>;

    /// Loads a cart with its lines.
    async fn cart(&self, id: CartId) -> Result<Option<Cart>>;

    // -- Stock ledger --

    /// Creates a stock unit. Happens when a variant or combo is created;
    /// units are never deleted while historical orders reference them.
    async fn insert_stock_unit(&self, unit: StockUnit) -> Result<()>;

    /// Reads a stock unit's current quantity and version token.
    async fn stock_unit(&self, id: StockUnitId) -> Result<Option<StockUnit>>;

    /// Applies a manual adjustment and its audit entry as one unit.
    ///
    /// Fails with `StockUnitNotFound` or, if the delta would drive the
    /// quantity negative, `InsufficientStock`. Returns the written entry.
    async fn commit_adjustment(&self, adjustment: StockAdjustment) -> Result<InventoryAuditEntry>;

    // -- Checkout unit of work --

    /// Applies a whole checkout atomically: every debit (conditional on
    /// its expected version), the order insert, one inventory audit entry
    /// per debit, and the cart deletion.
    ///
    /// Fails with `InsufficientStock` when any unit cannot cover its
    /// debit, or `VersionConflict` when any version token has moved; in
    /// either case nothing is applied — no stock changes, no order exists,
    /// the cart is untouched.
    async fn commit_checkout(&self, commit: CheckoutCommit) -> Result<()>;

    // -- Orders --

    /// Loads an order by id. Retired orders are not returned.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// All of a customer's orders, newest first. Excludes retired orders.
    async fn orders_by_customer(&self, customer: CustomerId) -> Result<Vec<Order>>;

    /// All orders awaiting a cancellation decision, newest first.
    async fn cancel_requests(&self) -> Result<Vec<Order>>;

    /// A customer's own pending cancellation requests, newest first.
    async fn cancel_requests_for_customer(&self, customer: CustomerId) -> Result<Vec<Order>>;

    /// Persists an already-validated status transition together with its
    /// audit entry as one unit.
    ///
    /// The stored order must still hold `entry.old_status`; if another
    /// writer moved it first, fails with `StatusConflict` and writes
    /// nothing.
    async fn commit_transition(&self, order: &Order, entry: &OrderAuditEntry) -> Result<()>;

    /// Logically retires an order. Nothing hard-deletes.
    async fn retire_order(&self, id: OrderId) -> Result<()>;

    // -- Audit queries (read-only) --

    /// All status transitions recorded for an order, oldest first.
    async fn order_audit(&self, id: OrderId) -> Result<Vec<OrderAuditEntry>>;

    /// All stock mutations recorded for a unit, newest first.
    async fn inventory_audit(&self, id: StockUnitId) -> Result<Vec<InventoryAuditEntry>>;
}
