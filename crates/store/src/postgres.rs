use async_trait::async_trait;
use common::{ActorId, CartId, CustomerId, OrderId, StockUnitId};
use domain::{
    Cart, InventoryAction, InventoryAuditEntry, Order, OrderAuditEntry, OrderStatus, Role,
    StockUnit, Version,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CheckoutCommit, Result, StockAdjustment, StoreError,
    store::{StockDebit, Store},
};

/// Reason recorded on inventory audit entries written by checkout.
const CHECKOUT_REASON: &str = "sold at checkout";

/// PostgreSQL-backed store implementation.
///
/// Unit-of-work boundaries map to database transactions; the stock CAS is
/// a conditional `UPDATE ... WHERE version = $n AND available >= $m`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let doc: serde_json::Value = row.try_get("doc")?;
        Ok(serde_json::from_value(doc)?)
    }

    fn parse_text<T>(value: &str) -> Result<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        value.parse().map_err(|msg: String| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(msg)))
        })
    }

    fn row_to_order_audit(row: &PgRow) -> Result<OrderAuditEntry> {
        let old_status: String = row.try_get("old_status")?;
        let new_status: String = row.try_get("new_status")?;
        let actor_role: String = row.try_get("actor_role")?;
        Ok(OrderAuditEntry {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            old_status: Self::parse_text::<OrderStatus>(&old_status)?,
            new_status: Self::parse_text::<OrderStatus>(&new_status)?,
            actor_id: row
                .try_get::<Option<Uuid>, _>("actor_id")?
                .map(ActorId::from_uuid),
            actor_role: Self::parse_text::<Role>(&actor_role)?,
            reason: row.try_get("reason")?,
            changed_at: row.try_get("changed_at")?,
        })
    }

    fn row_to_inventory_audit(row: &PgRow) -> Result<InventoryAuditEntry> {
        let action: String = row.try_get("action")?;
        Ok(InventoryAuditEntry {
            id: row.try_get("id")?,
            stock_unit_id: StockUnitId::from_uuid(row.try_get::<Uuid, _>("stock_unit_id")?),
            action: Self::parse_text::<InventoryAction>(&action)?,
            delta: row.try_get("delta")?,
            quantity_before: row.try_get::<i64, _>("quantity_before")? as u32,
            quantity_after: row.try_get::<i64, _>("quantity_after")? as u32,
            reason: row.try_get("reason")?,
            order_id: row
                .try_get::<Option<Uuid>, _>("order_id")?
                .map(OrderId::from_uuid),
            actor_id: row
                .try_get::<Option<Uuid>, _>("actor_id")?
                .map(ActorId::from_uuid),
            recorded_at: row.try_get("recorded_at")?,
        })
    }

    async fn insert_inventory_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entry: &InventoryAuditEntry,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_audit
                (id, stock_unit_id, action, delta, quantity_before, quantity_after,
                 reason, order_id, actor_id, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.stock_unit_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.delta)
        .bind(entry.quantity_before as i64)
        .bind(entry.quantity_after as i64)
        .bind(&entry.reason)
        .bind(entry.order_id.map(|id| id.as_uuid()))
        .bind(entry.actor_id.map(|id| id.as_uuid()))
        .bind(entry.recorded_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Applies one conditional debit inside `tx`. Returns the quantity
    /// before the debit on success.
    async fn apply_debit(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        debit: &StockDebit,
    ) -> Result<u32> {
        let row = sqlx::query(
            r#"
            UPDATE stock_units
            SET available = available - $2, version = version + 1
            WHERE id = $1 AND version = $3 AND available >= $2
            RETURNING available
            "#,
        )
        .bind(debit.stock_unit_id.as_uuid())
        .bind(debit.quantity as i64)
        .bind(debit.expected_version.as_i64())
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(row) = row {
            let after: i64 = row.try_get("available")?;
            return Ok(after as u32 + debit.quantity);
        }

        // The conditional update matched nothing; find out why.
        let current = sqlx::query("SELECT available, version FROM stock_units WHERE id = $1")
            .bind(debit.stock_unit_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Err(match current {
            None => StoreError::StockUnitNotFound(debit.stock_unit_id),
            Some(row) => {
                let available: i64 = row.try_get("available")?;
                let version = Version::new(row.try_get("version")?);
                if version != debit.expected_version {
                    StoreError::VersionConflict {
                        stock_unit_id: debit.stock_unit_id,
                        expected: debit.expected_version,
                        actual: version,
                    }
                } else {
                    StoreError::InsufficientStock {
                        stock_unit_id: debit.stock_unit_id,
                        requested: debit.quantity,
                        available: available as u32,
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn put_cart(&self, cart: Cart) -> Result<()> {
        let lines = serde_json::to_value(&cart.lines)?;
        sqlx::query(
            r#"
            INSERT INTO carts (id, customer_id, lines)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET customer_id = EXCLUDED.customer_id, lines = EXCLUDED.lines
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.customer_id.as_uuid())
        .bind(lines)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cart(&self, id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT customer_id, lines FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let lines: serde_json::Value = row.try_get("lines")?;
                Ok(Some(Cart {
                    id,
                    customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
                    lines: serde_json::from_value(lines)?,
                }))
            }
        }
    }

    async fn insert_stock_unit(&self, unit: StockUnit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_units (id, available, version)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(unit.id.as_uuid())
        .bind(unit.available as i64)
        .bind(unit.version.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stock_unit(&self, id: StockUnitId) -> Result<Option<StockUnit>> {
        let row = sqlx::query("SELECT available, version FROM stock_units WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(StockUnit {
                id,
                available: row.try_get::<i64, _>("available")? as u32,
                version: Version::new(row.try_get("version")?),
            })),
        }
    }

    async fn commit_adjustment(&self, adjustment: StockAdjustment) -> Result<InventoryAuditEntry> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE stock_units
            SET available = available + $2, version = version + 1
            WHERE id = $1 AND available + $2 >= 0
            RETURNING available
            "#,
        )
        .bind(adjustment.stock_unit_id.as_uuid())
        .bind(adjustment.delta)
        .fetch_optional(&mut *tx)
        .await?;

        let after: i64 = match row {
            Some(row) => row.try_get("available")?,
            None => {
                let current = sqlx::query("SELECT available FROM stock_units WHERE id = $1")
                    .bind(adjustment.stock_unit_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
                return Err(match current {
                    None => StoreError::StockUnitNotFound(adjustment.stock_unit_id),
                    Some(row) => StoreError::InsufficientStock {
                        stock_unit_id: adjustment.stock_unit_id,
                        requested: adjustment.delta.unsigned_abs() as u32,
                        available: row.try_get::<i64, _>("available")? as u32,
                    },
                });
            }
        };

        let before = after - adjustment.delta;
        let entry = InventoryAuditEntry::record(
            adjustment.stock_unit_id,
            adjustment.action,
            adjustment.delta,
            before as u32,
            after as u32,
            adjustment.reason,
            None,
            adjustment.actor_id,
        );
        Self::insert_inventory_entry(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(entry)
    }

    async fn commit_checkout(&self, commit: CheckoutCommit) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let order_id = commit.order.id();

        // Debit in a fixed id order so concurrent checkouts lock stock rows
        // in the same sequence and cannot deadlock each other.
        let mut debits: Vec<&StockDebit> = commit.debits.iter().collect();
        debits.sort_by_key(|debit| debit.stock_unit_id.as_uuid());

        for debit in debits {
            let before = Self::apply_debit(&mut tx, debit).await?;
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
            Self::insert_inventory_entry(&mut tx, &entry).await?;
        }

        let doc = serde_json::to_value(&commit.order)?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, created_at, retired, doc)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(commit.order.customer_id().as_uuid())
        .bind(commit.order.status().as_str())
        .bind(commit.order.created_at())
        .bind(doc)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(commit.cart_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::CartNotFound(commit.cart_id));
        }

        tx.commit().await?;
        tracing::debug!(%order_id, debits = commit.debits.len(), "checkout committed");
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1 AND NOT retired")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_order(&row)).transpose()
    }

    async fn orders_by_customer(&self, customer: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM orders
            WHERE customer_id = $1 AND NOT retired
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn cancel_requests(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM orders
            WHERE status = $1 AND NOT retired
            ORDER BY created_at DESC
            "#,
        )
        .bind(OrderStatus::CancelRequested.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn cancel_requests_for_customer(&self, customer: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM orders
            WHERE customer_id = $1 AND status = $2 AND NOT retired
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer.as_uuid())
        .bind(OrderStatus::CancelRequested.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn commit_transition(&self, order: &Order, entry: &OrderAuditEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let doc = serde_json::to_value(order)?;
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, doc = $3
            WHERE id = $1 AND status = $4 AND NOT retired
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(doc)
        .bind(entry.old_status.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let current = sqlx::query("SELECT status, retired FROM orders WHERE id = $1")
                .bind(order.id().as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match current {
                None => StoreError::OrderNotFound(order.id()),
                Some(row) if row.try_get::<bool, _>("retired")? => {
                    StoreError::OrderNotFound(order.id())
                }
                Some(row) => {
                    let status: String = row.try_get("status")?;
                    StoreError::StatusConflict {
                        order_id: order.id(),
                        expected: entry.old_status,
                        actual: Self::parse_text::<OrderStatus>(&status)?,
                    }
                }
            });
        }

        sqlx::query(
            r#"
            INSERT INTO order_audit
                (id, order_id, old_status, new_status, actor_id, actor_role, reason, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.order_id.as_uuid())
        .bind(entry.old_status.as_str())
        .bind(entry.new_status.as_str())
        .bind(entry.actor_id.map(|id| id.as_uuid()))
        .bind(entry.actor_role.as_str())
        .bind(&entry.reason)
        .bind(entry.changed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn retire_order(&self, id: OrderId) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET retired = TRUE, doc = jsonb_set(doc, '{retired}', 'true')
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn order_audit(&self, id: OrderId) -> Result<Vec<OrderAuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, old_status, new_status, actor_id, actor_role, reason, changed_at
            FROM order_audit
            WHERE order_id = $1
            ORDER BY changed_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_order_audit).collect()
    }

    async fn inventory_audit(&self, id: StockUnitId) -> Result<Vec<InventoryAuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, stock_unit_id, action, delta, quantity_before, quantity_after,
                   reason, order_id, actor_id, recorded_at
            FROM inventory_audit
            WHERE stock_unit_id = $1
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_inventory_audit).collect()
    }
}
