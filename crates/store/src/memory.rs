use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, CustomerId, OrderId, StockUnitId};
use domain::{
    Cart, InventoryAction, InventoryAuditEntry, Order, OrderAuditEntry, OrderStatus, StockUnit,
};
use tokio::sync::RwLock;

use crate::{
    CheckoutCommit, Result, StockAdjustment, StoreError,
    store::{StockDebit, Store},
};

/// Reason recorded on inventory audit entries written by checkout.
const CHECKOUT_REASON: &str = "sold at checkout";

#[derive(Default)]
struct State {
    carts: HashMap<CartId, Cart>,
    stock: HashMap<StockUnitId, StockUnit>,
    orders: HashMap<OrderId, Order>,
    inventory_log: Vec<InventoryAuditEntry>,
    order_log: Vec<OrderAuditEntry>,
}

impl State {
    /// Checks one debit against current stock without applying it.
    fn check_debit(&self, debit: &StockDebit) -> Result<()> {
        let unit = self
            .stock
            .get(&debit.stock_unit_id)
            .ok_or(StoreError::StockUnitNotFound(debit.stock_unit_id))?;

        if unit.version != debit.expected_version {
            return Err(StoreError::VersionConflict {
                stock_unit_id: unit.id,
                expected: debit.expected_version,
                actual: unit.version,
            });
        }
        if !unit.can_cover(debit.quantity) {
            return Err(StoreError::InsufficientStock {
                stock_unit_id: unit.id,
                requested: debit.quantity,
                available: unit.available,
            });
        }
        Ok(())
    }
}

/// In-memory store implementation for tests and the demo server.
///
/// All state lives behind a single lock, so each `commit_*` method is
/// trivially atomic: it validates everything first and only then mutates.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted orders (including retired ones).
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns the number of inventory audit entries.
    pub async fn inventory_entry_count(&self) -> usize {
        self.inner.read().await.inventory_log.len()
    }

    /// Returns the number of order audit entries.
    pub async fn order_entry_count(&self) -> usize {
        self.inner.read().await.order_log.len()
    }

    /// Clears all state.
    pub async fn clear(&self) {
        let mut state = self.inner.write().await;
        *state = State::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put_cart(&self, cart: Cart) -> Result<()> {
        self.inner.write().await.carts.insert(cart.id, cart);
        Ok(())
    }

    async fn cart(&self, id: CartId) -> Result<Option<Cart>> {
        Ok(self.inner.read().await.carts.get(&id).cloned())
    }

    async fn insert_stock_unit(&self, unit: StockUnit) -> Result<()> {
        self.inner.write().await.stock.insert(unit.id, unit);
        Ok(())
    }

    async fn stock_unit(&self, id: StockUnitId) -> Result<Option<StockUnit>> {
        Ok(self.inner.read().await.stock.get(&id).cloned())
    }

    async fn commit_adjustment(&self, adjustment: StockAdjustment) -> Result<InventoryAuditEntry> {
        let mut state = self.inner.write().await;

        let unit = state
            .stock
            .get_mut(&adjustment.stock_unit_id)
            .ok_or(StoreError::StockUnitNotFound(adjustment.stock_unit_id))?;

        let before = unit.available;
        let after = before as i64 + adjustment.delta;
        if after < 0 {
            return Err(StoreError::InsufficientStock {
                stock_unit_id: unit.id,
                requested: adjustment.delta.unsigned_abs() as u32,
                available: before,
            });
        }

        unit.available = after as u32;
        unit.version = unit.version.next();

        let entry = InventoryAuditEntry::record(
            adjustment.stock_unit_id,
            adjustment.action,
            adjustment.delta,
            before,
            after as u32,
            adjustment.reason,
            None,
            adjustment.actor_id,
        );
        state.inventory_log.push(entry.clone());
        Ok(entry)
    }

    async fn commit_checkout(&self, commit: CheckoutCommit) -> Result<()> {
        let mut state = self.inner.write().await;

        // Validate everything before touching anything.
        if !state.carts.contains_key(&commit.cart_id) {
            return Err(StoreError::CartNotFound(commit.cart_id));
        }
        for debit in &commit.debits {
            state.check_debit(debit)?;
        }

        let order_id = commit.order.id();
        for debit in &commit.debits {
            // Unwraps cannot fire: every debit was just validated.
            let unit = state.stock.get_mut(&debit.stock_unit_id).unwrap();
            let before = unit.available;
            unit.available -= debit.quantity;
            unit.version = unit.version.next();

            let entry = InventoryAuditEntry::record(
                debit.stock_unit_id,
                InventoryAction::Export,
                -(debit.quantity as i64),
                before,
                before - debit.quantity,
                Some(CHECKOUT_REASON.to_string()),
                Some(order_id),
                commit.actor_id,
            );
            state.inventory_log.push(entry);
        }

        state.orders.insert(order_id, commit.order);
        state.carts.remove(&commit.cart_id);
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .get(&id)
            .filter(|o| !o.is_retired())
            .cloned())
    }

    async fn orders_by_customer(&self, customer: CustomerId) -> Result<Vec<Order>> {
        let state = self.inner.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.customer_id() == customer && !o.is_retired())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn cancel_requests(&self) -> Result<Vec<Order>> {
        let state = self.inner.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.status() == OrderStatus::CancelRequested && !o.is_retired())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn cancel_requests_for_customer(&self, customer: CustomerId) -> Result<Vec<Order>> {
        Ok(self
            .cancel_requests()
            .await?
            .into_iter()
            .filter(|o| o.customer_id() == customer)
            .collect())
    }

    async fn commit_transition(&self, order: &Order, entry: &OrderAuditEntry) -> Result<()> {
        let mut state = self.inner.write().await;

        let stored = state
            .orders
            .get(&order.id())
            .filter(|o| !o.is_retired())
            .ok_or(StoreError::OrderNotFound(order.id()))?;
        if stored.status() != entry.old_status {
            return Err(StoreError::StatusConflict {
                order_id: order.id(),
                expected: entry.old_status,
                actual: stored.status(),
            });
        }

        state.orders.insert(order.id(), order.clone());
        state.order_log.push(entry.clone());
        Ok(())
    }

    async fn retire_order(&self, id: OrderId) -> Result<()> {
        let mut state = self.inner.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.retire();
        Ok(())
    }

    async fn order_audit(&self, id: OrderId) -> Result<Vec<OrderAuditEntry>> {
        let state = self.inner.read().await;
        let mut entries: Vec<_> = state
            .order_log
            .iter()
            .filter(|e| e.order_id == id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.changed_at);
        Ok(entries)
    }

    async fn inventory_audit(&self, id: StockUnitId) -> Result<Vec<InventoryAuditEntry>> {
        let state = self.inner.read().await;
        let mut entries: Vec<_> = state
            .inventory_log
            .iter()
            .filter(|e| e.stock_unit_id == id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::VariantId;
    use domain::{CartLine, ItemRef, Money, OrderLine, PayMethod, Recipient, Role, Version};

    fn recipient() -> Recipient {
        Recipient {
            name: "Test".to_string(),
            phone_number: "0".to_string(),
            address: "-".to_string(),
            note: None,
        }
    }

    fn order_for(customer: CustomerId) -> Order {
        Order::place(
            customer,
            PayMethod::Cash,
            recipient(),
            vec![OrderLine::new(
                ItemRef::Variant(VariantId::new()),
                "Widget",
                Money::from_cents(1000),
                2,
            )],
            Utc::now(),
        )
        .unwrap()
    }

    async fn seeded_store() -> (InMemoryStore, Cart, StockUnit) {
        let store = InMemoryStore::new();
        let unit = StockUnit::new(StockUnitId::new(), 10);
        store.insert_stock_unit(unit.clone()).await.unwrap();

        let mut cart = Cart::new(CustomerId::new());
        cart.lines
            .push(CartLine::new(ItemRef::Variant(VariantId::new()), 2));
        store.put_cart(cart.clone()).await.unwrap();
        (store, cart, unit)
    }

    #[tokio::test]
    async fn checkout_debits_stock_and_clears_cart() {
        let (store, cart, unit) = seeded_store().await;
        let order = order_for(cart.customer_id);
        let order_id = order.id();

        store
            .commit_checkout(CheckoutCommit {
                order,
                cart_id: cart.id,
                debits: vec![StockDebit {
                    stock_unit_id: unit.id,
                    quantity: 2,
                    expected_version: unit.version,
                }],
                actor_id: None,
            })
            .await
            .unwrap();

        let after = store.stock_unit(unit.id).await.unwrap().unwrap();
        assert_eq!(after.available, 8);
        assert_eq!(after.version, unit.version.next());
        assert!(store.cart(cart.id).await.unwrap().is_none());
        assert!(store.order(order_id).await.unwrap().is_some());

        let entries = store.inventory_audit(unit.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].order_id, Some(order_id));
        assert_eq!(entries[0].quantity_before, 10);
        assert_eq!(entries[0].quantity_after, 8);
    }

    #[tokio::test]
    async fn failed_debit_aborts_the_whole_checkout() {
        let (store, cart, unit) = seeded_store().await;
        let other = StockUnit::new(StockUnitId::new(), 1);
        store.insert_stock_unit(other.clone()).await.unwrap();
        let order = order_for(cart.customer_id);
        let order_id = order.id();

        // Second debit cannot be covered; the first must not apply either.
        let err = store
            .commit_checkout(CheckoutCommit {
                order,
                cart_id: cart.id,
                debits: vec![
                    StockDebit {
                        stock_unit_id: unit.id,
                        quantity: 2,
                        expected_version: unit.version,
                    },
                    StockDebit {
                        stock_unit_id: other.id,
                        quantity: 5,
                        expected_version: other.version,
                    },
                ],
                actor_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InsufficientStock { .. }));
        let unit_after = store.stock_unit(unit.id).await.unwrap().unwrap();
        assert_eq!(unit_after.available, 10);
        assert_eq!(unit_after.version, unit.version);
        assert!(store.cart(cart.id).await.unwrap().is_some());
        assert!(store.order(order_id).await.unwrap().is_none());
        assert_eq!(store.inventory_entry_count().await, 0);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (store, cart, unit) = seeded_store().await;

        let err = store
            .commit_checkout(CheckoutCommit {
                order: order_for(cart.customer_id),
                cart_id: cart.id,
                debits: vec![StockDebit {
                    stock_unit_id: unit.id,
                    quantity: 1,
                    expected_version: Version::new(99),
                }],
                actor_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::VersionConflict { .. }));
        assert_eq!(
            store.stock_unit(unit.id).await.unwrap().unwrap().available,
            10
        );
    }

    #[tokio::test]
    async fn adjustment_refuses_to_go_negative() {
        let (store, _, unit) = seeded_store().await;

        let err = store
            .commit_adjustment(StockAdjustment {
                stock_unit_id: unit.id,
                delta: -11,
                action: InventoryAction::Damaged,
                reason: None,
                actor_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InsufficientStock { .. }));
        assert_eq!(store.inventory_entry_count().await, 0);
    }

    #[tokio::test]
    async fn adjustment_writes_before_and_after() {
        let (store, _, unit) = seeded_store().await;

        let entry = store
            .commit_adjustment(StockAdjustment {
                stock_unit_id: unit.id,
                delta: 5,
                action: InventoryAction::Import,
                reason: Some("restock".to_string()),
                actor_id: None,
            })
            .await
            .unwrap();

        assert_eq!(entry.quantity_before, 10);
        assert_eq!(entry.quantity_after, 15);
        let after = store.stock_unit(unit.id).await.unwrap().unwrap();
        assert_eq!(after.available, 15);
        assert_eq!(after.version, unit.version.next());
    }

    #[tokio::test]
    async fn transition_commit_rejects_stale_status() {
        let (store, cart, unit) = seeded_store().await;
        let order = order_for(cart.customer_id);
        store
            .commit_checkout(CheckoutCommit {
                order: order.clone(),
                cart_id: cart.id,
                debits: vec![StockDebit {
                    stock_unit_id: unit.id,
                    quantity: 1,
                    expected_version: unit.version,
                }],
                actor_id: None,
            })
            .await
            .unwrap();

        let mut confirmed = order.clone();
        confirmed
            .transition(OrderStatus::Confirmed, Utc::now())
            .unwrap();
        let entry = OrderAuditEntry::record(
            order.id(),
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            None,
            Role::Staff,
            None,
        );
        store.commit_transition(&confirmed, &entry).await.unwrap();

        // Replaying the same transition must not write a second entry.
        let err = store
            .commit_transition(&confirmed, &entry)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
        assert_eq!(store.order_entry_count().await, 1);
    }

    #[tokio::test]
    async fn retired_orders_disappear_from_queries() {
        let (store, cart, unit) = seeded_store().await;
        let customer = cart.customer_id;
        let order = order_for(customer);
        let order_id = order.id();
        store
            .commit_checkout(CheckoutCommit {
                order,
                cart_id: cart.id,
                debits: vec![StockDebit {
                    stock_unit_id: unit.id,
                    quantity: 1,
                    expected_version: unit.version,
                }],
                actor_id: None,
            })
            .await
            .unwrap();

        store.retire_order(order_id).await.unwrap();
        assert!(store.order(order_id).await.unwrap().is_none());
        assert!(store.orders_by_customer(customer).await.unwrap().is_empty());
        // Still on disk, never hard-deleted.
        assert_eq!(store.order_count().await, 1);
    }
}
