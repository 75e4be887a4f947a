//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and serialize on it.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, StockUnitId, VariantId};
use domain::{
    Cart, CartLine, InventoryAction, ItemRef, Money, Order, OrderAuditEntry, OrderLine,
    OrderStatus, PayMethod, Recipient, Role, StockUnit, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{CheckoutCommit, PostgresStore, StockAdjustment, StockDebit, Store, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Apply the schema using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/0001_init.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE inventory_audit, order_audit, orders, carts, stock_units")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn recipient() -> Recipient {
    Recipient {
        name: "An Nguyen".to_string(),
        phone_number: "0900000000".to_string(),
        address: "1 Main St".to_string(),
        note: None,
    }
}

fn place_order(customer: CustomerId) -> Order {
    let lines = vec![OrderLine::new(
        ItemRef::Variant(VariantId::new()),
        "Variant A",
        Money::from_dollars(10),
        2,
    )];
    Order::place(customer, PayMethod::Cash, recipient(), lines, Utc::now()).unwrap()
}

/// A cart, stock unit and matching checkout commit, ready to apply.
async fn seed_checkout(store: &PostgresStore, stock: u32, debit: u32) -> (CheckoutCommit, Order) {
    let customer = CustomerId::new();
    let cart = Cart {
        lines: vec![CartLine::new(ItemRef::Variant(VariantId::new()), debit)],
        ..Cart::new(customer)
    };
    store.put_cart(cart.clone()).await.unwrap();

    let unit = StockUnit::new(StockUnitId::new(), stock);
    store.insert_stock_unit(unit.clone()).await.unwrap();

    let order = place_order(customer);
    let commit = CheckoutCommit {
        order: order.clone(),
        cart_id: cart.id,
        debits: vec![StockDebit {
            stock_unit_id: unit.id,
            quantity: debit,
            expected_version: unit.version,
        }],
        actor_id: None,
    };
    (commit, order)
}

#[tokio::test]
#[serial]
async fn checkout_debits_stock_and_stores_the_order() {
    let store = get_test_store().await;
    let (commit, order) = seed_checkout(&store, 10, 2).await;
    let unit_id = commit.debits[0].stock_unit_id;
    let cart_id = commit.cart_id;

    store.commit_checkout(commit).await.unwrap();

    let unit = store.stock_unit(unit_id).await.unwrap().unwrap();
    assert_eq!(unit.available, 8);
    assert_eq!(unit.version, Version::new(1));

    let stored = store.order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored, order);

    // Cart is gone, and the debit is on the audit trail
    assert!(store.cart(cart_id).await.unwrap().is_none());
    let log = store.inventory_audit(unit_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, InventoryAction::Export);
    assert_eq!(log[0].delta, -2);
    assert_eq!(log[0].quantity_before, 10);
    assert_eq!(log[0].quantity_after, 8);
    assert_eq!(log[0].order_id, Some(order.id()));
}

#[tokio::test]
#[serial]
async fn checkout_with_insufficient_stock_applies_nothing() {
    let store = get_test_store().await;
    let (commit, order) = seed_checkout(&store, 1, 2).await;
    let unit_id = commit.debits[0].stock_unit_id;
    let cart_id = commit.cart_id;

    let err = store.commit_checkout(commit).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        }
    ));

    let unit = store.stock_unit(unit_id).await.unwrap().unwrap();
    assert_eq!(unit.available, 1);
    assert_eq!(unit.version, Version::initial());
    assert!(store.order(order.id()).await.unwrap().is_none());
    assert!(store.cart(cart_id).await.unwrap().is_some());
    assert!(store.inventory_audit(unit_id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn checkout_debits_in_stock_unit_id_order() {
    let store = get_test_store().await;
    let customer = CustomerId::new();
    let cart = Cart {
        lines: vec![
            CartLine::new(ItemRef::Variant(VariantId::new()), 1),
            CartLine::new(ItemRef::Variant(VariantId::new()), 1),
        ],
        ..Cart::new(customer)
    };
    store.put_cart(cart.clone()).await.unwrap();

    let mut units = [
        StockUnit::new(StockUnitId::new(), 5),
        StockUnit::new(StockUnitId::new(), 5),
    ];
    units.sort_by_key(|unit| unit.id.as_uuid());
    for unit in &units {
        store.insert_stock_unit(unit.clone()).await.unwrap();
    }

    // Hand the store the debits highest id first
    store
        .commit_checkout(CheckoutCommit {
            order: place_order(customer),
            cart_id: cart.id,
            debits: vec![
                StockDebit {
                    stock_unit_id: units[1].id,
                    quantity: 1,
                    expected_version: units[1].version,
                },
                StockDebit {
                    stock_unit_id: units[0].id,
                    quantity: 1,
                    expected_version: units[0].version,
                },
            ],
            actor_id: None,
        })
        .await
        .unwrap();

    // The lowest id was still debited first, keeping the row lock order
    // identical across concurrent checkouts
    let first = &store.inventory_audit(units[0].id).await.unwrap()[0];
    let second = &store.inventory_audit(units[1].id).await.unwrap()[0];
    assert!(first.recorded_at < second.recorded_at);
}

#[tokio::test]
#[serial]
async fn stale_version_token_is_a_conflict() {
    let store = get_test_store().await;
    let (mut commit, _) = seed_checkout(&store, 10, 2).await;
    commit.debits[0].expected_version = Version::new(7);

    let err = store.commit_checkout(commit).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));
}

#[tokio::test]
#[serial]
async fn adjustment_moves_stock_and_logs() {
    let store = get_test_store().await;
    let unit = StockUnit::new(StockUnitId::new(), 5);
    store.insert_stock_unit(unit.clone()).await.unwrap();

    let entry = store
        .commit_adjustment(StockAdjustment {
            stock_unit_id: unit.id,
            delta: 20,
            action: InventoryAction::Import,
            reason: Some("restock".to_string()),
            actor_id: None,
        })
        .await
        .unwrap();

    assert_eq!(entry.quantity_before, 5);
    assert_eq!(entry.quantity_after, 25);

    let stored = store.stock_unit(unit.id).await.unwrap().unwrap();
    assert_eq!(stored.available, 25);
    assert_eq!(stored.version, Version::new(1));
}

#[tokio::test]
#[serial]
async fn adjustment_below_zero_is_refused() {
    let store = get_test_store().await;
    let unit = StockUnit::new(StockUnitId::new(), 3);
    store.insert_stock_unit(unit.clone()).await.unwrap();

    let err = store
        .commit_adjustment(StockAdjustment {
            stock_unit_id: unit.id,
            delta: -5,
            action: InventoryAction::Damaged,
            reason: None,
            actor_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock { .. }));

    let stored = store.stock_unit(unit.id).await.unwrap().unwrap();
    assert_eq!(stored.available, 3);
    assert!(store.inventory_audit(unit.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn transition_persists_status_and_audit() {
    let store = get_test_store().await;
    let (commit, mut order) = seed_checkout(&store, 10, 2).await;
    store.commit_checkout(commit).await.unwrap();

    let old = order.transition(OrderStatus::Confirmed, Utc::now()).unwrap();
    let entry = OrderAuditEntry::record(
        order.id(),
        old,
        order.status(),
        None,
        Role::Staff,
        Some("order confirmed".to_string()),
    );
    store.commit_transition(&order, &entry).await.unwrap();

    let stored = store.order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Confirmed);
    assert!(stored.confirmed_at().is_some());

    let log = store.order_audit(order.id()).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].old_status, OrderStatus::Pending);
    assert_eq!(log[0].new_status, OrderStatus::Confirmed);
}

#[tokio::test]
#[serial]
async fn replayed_transition_is_a_status_conflict() {
    let store = get_test_store().await;
    let (commit, order) = seed_checkout(&store, 10, 2).await;
    store.commit_checkout(commit).await.unwrap();

    let mut first = order.clone();
    first.transition(OrderStatus::Confirmed, Utc::now()).unwrap();
    let entry = OrderAuditEntry::record(
        order.id(),
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        None,
        Role::Staff,
        None,
    );
    store.commit_transition(&first, &entry).await.unwrap();

    // Same transition again, validated against the stale Pending status
    let mut second = order.clone();
    second.transition(OrderStatus::Confirmed, Utc::now()).unwrap();
    let replay = OrderAuditEntry::record(
        order.id(),
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        None,
        Role::Staff,
        None,
    );
    let err = store.commit_transition(&second, &replay).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::StatusConflict {
            expected: OrderStatus::Pending,
            actual: OrderStatus::Confirmed,
            ..
        }
    ));

    // No duplicate audit entry was written
    assert_eq!(store.order_audit(order.id()).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn retired_orders_disappear_from_queries() {
    let store = get_test_store().await;
    let (commit, order) = seed_checkout(&store, 10, 2).await;
    let customer = order.customer_id();
    store.commit_checkout(commit).await.unwrap();

    store.retire_order(order.id()).await.unwrap();

    assert!(store.order(order.id()).await.unwrap().is_none());
    assert!(store.orders_by_customer(customer).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn cancel_requests_lists_only_that_status() {
    let store = get_test_store().await;

    let (commit_a, mut order_a) = seed_checkout(&store, 10, 2).await;
    store.commit_checkout(commit_a).await.unwrap();
    let (commit_b, order_b) = seed_checkout(&store, 10, 2).await;
    store.commit_checkout(commit_b).await.unwrap();

    let old = order_a
        .transition(OrderStatus::CancelRequested, Utc::now())
        .unwrap();
    order_a.set_cancel_reason(Some("changed my mind".to_string()));
    let entry = OrderAuditEntry::record(
        order_a.id(),
        old,
        order_a.status(),
        None,
        Role::Customer,
        order_a.cancel_reason().map(str::to_string),
    );
    store.commit_transition(&order_a, &entry).await.unwrap();

    let requests = store.cancel_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id(), order_a.id());

    let mine = store
        .cancel_requests_for_customer(order_a.customer_id())
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    let theirs = store
        .cancel_requests_for_customer(order_b.customer_id())
        .await
        .unwrap();
    assert!(theirs.is_empty());
}

#[tokio::test]
#[serial]
async fn orders_by_customer_is_newest_first() {
    let store = get_test_store().await;
    let customer = CustomerId::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let cart = Cart {
            lines: vec![CartLine::new(ItemRef::Variant(VariantId::new()), 1)],
            ..Cart::new(customer)
        };
        store.put_cart(cart.clone()).await.unwrap();
        let unit = StockUnit::new(StockUnitId::new(), 5);
        store.insert_stock_unit(unit.clone()).await.unwrap();

        let order = place_order(customer);
        ids.push(order.id());
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
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let orders = store.orders_by_customer(customer).await.unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0].id(), ids[2]);
    assert_eq!(orders[2].id(), ids[0]);
}
